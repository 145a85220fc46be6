//! Gate 2: approved, and never executed before.
//!
//! This gate is the single authority on replay. It re-validates input format,
//! re-runs the verifier, then checks the execution log for any record with
//! the same identifier. It only reads; callers that go on to execute must
//! hold the execution log's lock across this check and their append.

use thiserror::Error;

use crate::ident::{self, ActionId, FormatError};
use crate::ledger;
use crate::log::LogHandle;
use crate::stage::Denial;
use crate::verifier::{Approved, Verifier, VerifyDenial};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EligibilityDenial {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    NotApproved(VerifyDenial),

    #[error("execution log unavailable: {0}")]
    LogUnavailable(String),

    #[error("execution log line {line} is corrupt: {reason}")]
    CorruptLog { line: usize, reason: String },

    #[error("action has already been executed")]
    Replay,
}

impl EligibilityDenial {
    /// Which of the ordered preconditions failed: 1 format, 2 approval, 3 replay.
    pub fn precondition(&self) -> u8 {
        match self {
            EligibilityDenial::Format(_) => 1,
            EligibilityDenial::NotApproved(_) => 2,
            EligibilityDenial::LogUnavailable(_)
            | EligibilityDenial::CorruptLog { .. }
            | EligibilityDenial::Replay => 3,
        }
    }
}

impl Denial for EligibilityDenial {
    fn code(&self) -> &'static str {
        match self {
            EligibilityDenial::Format(_) => "invalid_format",
            EligibilityDenial::NotApproved(inner) => inner.code(),
            EligibilityDenial::LogUnavailable(_) => "execution_log_unavailable",
            EligibilityDenial::CorruptLog { .. } => "execution_log_corrupt",
            EligibilityDenial::Replay => "replay",
        }
    }
}

/// Proof that an action passed all three preconditions at check time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligible {
    approved: Approved,
}

impl Eligible {
    pub fn id(&self) -> &ActionId {
        self.approved.id()
    }
}

pub struct EligibilityController<'a> {
    verifier: Verifier<'a>,
    executions: &'a dyn LogHandle,
}

impl<'a> EligibilityController<'a> {
    pub fn new(approvals: &'a dyn LogHandle, executions: &'a dyn LogHandle) -> Self {
        Self {
            verifier: Verifier::new(approvals),
            executions,
        }
    }

    pub fn check(&self, id: &str, hash: &str) -> Result<Eligible, EligibilityDenial> {
        let (id, hash) = ident::parse_request(id, hash)?;

        let approved = self
            .verifier
            .verify_parsed(id, hash)
            .map_err(EligibilityDenial::NotApproved)?;

        let lines = self
            .executions
            .scan()
            .map_err(|e| EligibilityDenial::LogUnavailable(e.to_string()))?;
        let records = ledger::parse_lines(&lines).map_err(|c| EligibilityDenial::CorruptLog {
            line: c.line,
            reason: c.reason,
        })?;
        if ledger::contains(&records, approved.id()) {
            return Err(EligibilityDenial::Replay);
        }

        tracing::debug!(id = %approved.id(), "action eligible");
        Ok(Eligible { approved })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
