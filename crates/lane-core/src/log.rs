//! Line-oriented, append-only log handles.
//!
//! The approval log and the execution log are both reached only through
//! [`LogHandle`]: a full scan, an all-or-nothing append, and an exclusive lock
//! that serializes check-then-append sequences across processes.
//! [`FileLog`] is the production handle; [`MemoryLog`] backs tests and can
//! inject failures.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use fs2::FileExt;

use crate::error::{LaneError, Result};
use crate::io;
use crate::paths;

pub trait LogHandle {
    /// Every complete line in the log, in file order.
    fn scan(&self) -> Result<Vec<String>>;

    /// Append one line. Either the whole line lands or nothing does.
    fn append(&self, line: &str) -> Result<()>;

    /// Block until this process holds the log's exclusive lock.
    fn lock(&self) -> Result<LogLock>;

    /// Human-readable location, for diagnostics.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// LogLock
// ---------------------------------------------------------------------------

/// Exclusive hold on a log. Released on drop.
#[derive(Debug)]
pub struct LogLock {
    file: Option<File>,
}

impl LogLock {
    /// A lock that serializes nothing. Only meaningful for in-process logs.
    pub fn in_process() -> Self {
        Self { file: None }
    }
}

impl Drop for LogLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            // Closing the descriptor releases the flock as well.
            let _ = FileExt::unlock(&file);
        }
    }
}

// ---------------------------------------------------------------------------
// FileLog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileLog {
    path: PathBuf,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LogHandle for FileLog {
    fn scan(&self) -> Result<Vec<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LaneError::LogNotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if content.is_empty() {
            return Ok(Vec::new());
        }
        let Some(body) = content.strip_suffix('\n') else {
            return Err(LaneError::TornRecord(self.path.display().to_string()));
        };
        Ok(body.split('\n').map(str::to_string).collect())
    }

    fn append(&self, line: &str) -> Result<()> {
        io::append_line_durable(&self.path, line)
    }

    fn lock(&self) -> Result<LogLock> {
        let lock_path = paths::lock_path(&self.path);
        let fail = |reason: String| LaneError::LockFailed {
            path: lock_path.display().to_string(),
            reason,
        };
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| fail(e.to_string()))?;
        FileExt::lock_exclusive(&file).map_err(|e| fail(e.to_string()))?;
        tracing::debug!(path = %lock_path.display(), "acquired execution log lock");
        Ok(LogLock { file: Some(file) })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ---------------------------------------------------------------------------
// MemoryLog
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    lines: Vec<String>,
    fail_scan: bool,
    fail_append: bool,
}

/// In-memory log with optional fault injection.
#[derive(Debug, Default)]
pub struct MemoryLog {
    state: Mutex<MemoryState>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let log = Self::new();
        log.lock_state().lines = lines.into_iter().map(Into::into).collect();
        log
    }

    /// Every subsequent append fails without modifying the log.
    pub fn fail_appends(self) -> Self {
        self.lock_state().fail_append = true;
        self
    }

    /// Every subsequent scan fails as if the log were unreadable.
    pub fn fail_scans(self) -> Self {
        self.lock_state().fail_scan = true;
        self
    }

    pub fn lines(&self) -> Vec<String> {
        self.lock_state().lines.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned guard still holds consistent data: every mutation is a
        // single push or flag store.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl LogHandle for MemoryLog {
    fn scan(&self) -> Result<Vec<String>> {
        let state = self.lock_state();
        if state.fail_scan {
            return Err(LaneError::Injected("scan".into()));
        }
        Ok(state.lines.clone())
    }

    fn append(&self, line: &str) -> Result<()> {
        let mut state = self.lock_state();
        if state.fail_append {
            return Err(LaneError::Injected("append".into()));
        }
        state.lines.push(line.to_string());
        Ok(())
    }

    fn lock(&self) -> Result<LogLock> {
        Ok(LogLock::in_process())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log_in(dir: &TempDir, content: &str) -> FileLog {
        let path = dir.path().join("log.jsonl");
        std::fs::write(&path, content).unwrap();
        FileLog::new(path)
    }

    #[test]
    fn scan_empty_file() {
        let dir = TempDir::new().unwrap();
        assert!(log_in(&dir, "").scan().unwrap().is_empty());
    }

    #[test]
    fn scan_returns_lines_in_order() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "a\nb\n\nc\n");
        assert_eq!(log.scan().unwrap(), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn scan_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let log = FileLog::new(dir.path().join("absent.jsonl"));
        assert!(matches!(log.scan(), Err(LaneError::LogNotFound(_))));
    }

    #[test]
    fn scan_rejects_torn_tail() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "{\"id\":\"a\"}\n{\"id\":");
        assert!(matches!(log.scan(), Err(LaneError::TornRecord(_))));
    }

    #[test]
    fn append_then_scan() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "first\n");
        log.append("second").unwrap();
        assert_eq!(log.scan().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn lock_creates_sidecar_and_releases_on_drop() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, "");
        {
            let _guard = log.lock().unwrap();
            assert!(dir.path().join("log.jsonl.lock").exists());
        }
        // Re-acquiring after drop must not block.
        let _again = log.lock().unwrap();
    }

    #[test]
    fn memory_append_failure_leaves_log_untouched() {
        let log = MemoryLog::with_lines(["x"]).fail_appends();
        assert!(log.append("y").is_err());
        assert_eq!(log.lines(), vec!["x"]);
    }

    #[test]
    fn memory_scan_failure() {
        let log = MemoryLog::new().fail_scans();
        assert!(matches!(log.scan(), Err(LaneError::Injected(_))));
    }
}
