pub mod check;
pub mod config;
pub mod digest;
pub mod execute;
pub mod history;
pub mod init;
pub mod verify;

use anyhow::Context;
use lane_core::config::{Config, LanePaths};
use lane_core::{ident, paths, Stage};
use std::path::{Path, PathBuf};

use crate::output::{self, Verdict};

/// Per-invocation path overrides from flags or environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub approval_log: Option<PathBuf>,
    pub execution_log: Option<PathBuf>,
    pub registry: Option<PathBuf>,
}

/// Config file locations with any overrides applied.
pub fn lane_paths(root: &Path, overrides: &Overrides) -> anyhow::Result<LanePaths> {
    let config = Config::load(root).context("failed to load config")?;
    let mut resolved = config.resolve(root);
    if let Some(p) = &overrides.approval_log {
        resolved.approval_log = paths::resolve(root, p);
    }
    if let Some(p) = &overrides.execution_log {
        resolved.execution_log = paths::resolve(root, p);
    }
    if let Some(p) = &overrides.registry {
        resolved.registry = paths::resolve(root, p);
    }
    Ok(resolved)
}

/// Deny a malformed request before any config or log is read.
pub fn reject_malformed(stage: Stage, id: &str, hash: &str, json: bool) -> Option<Verdict> {
    let err = ident::parse_request(id, hash).err()?;
    tracing::warn!(code = "invalid_format", %stage, "request rejected");
    Some(output::deny(stage, "invalid_format", &err.to_string(), None, json))
}
