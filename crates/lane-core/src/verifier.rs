//! Gate 1: was this exact content approved?
//!
//! Answers only "approved" or not. Reads the approval log once per call,
//! writes nothing, caches nothing.

use thiserror::Error;

use crate::approval;
use crate::ident::{self, ActionId, ContentHash, FormatError};
use crate::log::LogHandle;
use crate::stage::Denial;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyDenial {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("approval log unavailable: {0}")]
    LogUnavailable(String),

    #[error("approval log line {line} is corrupt: {reason}")]
    CorruptLog { line: usize, reason: String },

    #[error("identifier has no approval record")]
    NotFound,

    #[error("identifier has {count} approval records")]
    DuplicateApproval { count: usize },

    #[error("hash does not match the approved content")]
    HashMismatch,
}

impl Denial for VerifyDenial {
    fn code(&self) -> &'static str {
        match self {
            VerifyDenial::Format(_) => "invalid_format",
            VerifyDenial::LogUnavailable(_) => "approval_log_unavailable",
            VerifyDenial::CorruptLog { .. } => "approval_log_corrupt",
            VerifyDenial::NotFound => "not_found",
            VerifyDenial::DuplicateApproval { .. } => "duplicate_approval",
            VerifyDenial::HashMismatch => "hash_mismatch",
        }
    }
}

/// Proof that `(id, hash)` matched an approval record. Only the verifier
/// constructs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approved {
    id: ActionId,
    hash: ContentHash,
}

impl Approved {
    pub fn id(&self) -> &ActionId {
        &self.id
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }
}

pub struct Verifier<'a> {
    approvals: &'a dyn LogHandle,
}

impl<'a> Verifier<'a> {
    pub fn new(approvals: &'a dyn LogHandle) -> Self {
        Self { approvals }
    }

    /// Validate the raw inputs, then verify.
    pub fn verify(&self, id: &str, hash: &str) -> Result<Approved, VerifyDenial> {
        let (id, hash) = ident::parse_request(id, hash)?;
        self.verify_parsed(id, hash)
    }

    pub fn verify_parsed(&self, id: ActionId, hash: ContentHash) -> Result<Approved, VerifyDenial> {
        let lines = self
            .approvals
            .scan()
            .map_err(|e| VerifyDenial::LogUnavailable(e.to_string()))?;
        let records = approval::parse_lines(&lines).map_err(|c| VerifyDenial::CorruptLog {
            line: c.line,
            reason: c.reason,
        })?;

        let mut matches = records.iter().filter(|r| r.id == id.as_str());
        let Some(record) = matches.next() else {
            return Err(VerifyDenial::NotFound);
        };
        let extra = matches.count();
        if extra > 0 {
            return Err(VerifyDenial::DuplicateApproval { count: extra + 1 });
        }

        if record.hash.as_bytes() != hash.as_str().as_bytes() {
            return Err(VerifyDenial::HashMismatch);
        }

        tracing::debug!(id = %id, "approval verified");
        Ok(Approved { id, hash })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
