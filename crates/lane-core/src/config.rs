use crate::error::{LaneError, Result};
use crate::io;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// `.lane/config.yaml`. Paths are relative to the project root unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_approval_log")]
    pub approval_log: PathBuf,
    #[serde(default = "default_execution_log")]
    pub execution_log: PathBuf,
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
}

fn default_approval_log() -> PathBuf {
    PathBuf::from(paths::APPROVAL_LOG)
}

fn default_execution_log() -> PathBuf {
    PathBuf::from(paths::EXECUTION_LOG)
}

fn default_registry() -> PathBuf {
    PathBuf::from(paths::REGISTRY_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            approval_log: default_approval_log(),
            execution_log: default_execution_log(),
            registry: default_registry(),
        }
    }
}

/// Absolute locations of everything the lane reads or writes.
#[derive(Debug, Clone, PartialEq)]
pub struct LanePaths {
    pub root: PathBuf,
    pub approval_log: PathBuf,
    pub execution_log: PathBuf,
    pub registry: PathBuf,
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(LaneError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    pub fn resolve(&self, root: &Path) -> LanePaths {
        LanePaths {
            root: root.to_path_buf(),
            approval_log: paths::resolve(root, &self.approval_log),
            execution_log: paths::resolve(root, &self.execution_log),
            registry: paths::resolve(root, &self.registry),
        }
    }
}

impl LanePaths {
    /// Missing files are errors; the execution log in particular is never
    /// treated as implicitly empty.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        for (label, path) in [
            ("approval log", &self.approval_log),
            ("execution log", &self.execution_log),
            ("registry", &self.registry),
        ] {
            if !path.is_file() {
                warnings.push(ConfigWarning::error(format!(
                    "{label} not found at {}",
                    path.display()
                )));
            }
        }
        if self.approval_log == self.execution_log {
            warnings.push(ConfigWarning::error(
                "approval log and execution log must be different files",
            ));
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
