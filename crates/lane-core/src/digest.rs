use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::Result;
use crate::ident::ContentHash;

/// SHA-256 of `content` in the lowercase hex form approval records carry.
pub fn content_hash(content: &[u8]) -> ContentHash {
    ContentHash::from_digest(format!("{:x}", Sha256::digest(content)))
}

pub fn file_hash(path: &Path) -> Result<ContentHash> {
    let content = std::fs::read(path)?;
    Ok(content_hash(&content))
}
