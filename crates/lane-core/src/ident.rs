//! Canonical identifier and content-hash types.
//!
//! Both are accepted only in their exact canonical spelling. Nothing here
//! trims, lowercases, or otherwise repairs input: a near miss is a format
//! failure.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Validation patterns
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();
static HASH_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
    })
}

fn hash_re() -> &'static Regex {
    HASH_RE.get_or_init(|| Regex::new(r"^[0-9a-f]{64}$").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("identifier must be a lowercase canonical UUID")]
    Identifier,
    #[error("hash must be 64 lowercase hex characters")]
    Hash,
}

// ---------------------------------------------------------------------------
// ActionId
// ---------------------------------------------------------------------------

/// Identifier of one approved action, e.g. `b2831d73-2708-4f50-944b-7b54f11bfbb4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        // Length check first so the regex never sees oversized input.
        if raw.len() != 36 || !id_re().is_match(raw) {
            return Err(FormatError::Identifier);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ContentHash
// ---------------------------------------------------------------------------

/// Digest of the approved content. Compared byte-for-byte, never decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        if raw.len() != 64 || !hash_re().is_match(raw) {
            return Err(FormatError::Hash);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a digest this crate computed itself.
    pub(crate) fn from_digest(hex: String) -> Self {
        debug_assert!(hash_re().is_match(&hex));
        Self(hex)
    }
}

/// Parse both inputs of a request, identifier first.
pub fn parse_request(id: &str, hash: &str) -> Result<(ActionId, ContentHash), FormatError> {
    let id = ActionId::parse(id)?;
    let hash = ContentHash::parse(hash)?;
    Ok((id, hash))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
