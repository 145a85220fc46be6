use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const LANE_DIR: &str = ".lane";

pub const CONFIG_FILE: &str = ".lane/config.yaml";
pub const APPROVAL_LOG: &str = ".lane/approvals.jsonl";
pub const EXECUTION_LOG: &str = ".lane/executions.jsonl";
pub const REGISTRY_FILE: &str = ".lane/registry.yaml";

/// Suffix of the sidecar file that carries the execution log's exclusive lock.
pub const LOCK_SUFFIX: &str = ".lock";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn lane_dir(root: &Path) -> PathBuf {
    root.join(LANE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Join `path` onto `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// `executions.jsonl` -> `executions.jsonl.lock`, in the same directory.
pub fn lock_path(log: &Path) -> PathBuf {
    let mut name = log.as_os_str().to_os_string();
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
