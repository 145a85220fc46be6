use crate::error::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting state files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Append `line` plus a newline to an existing file and fsync it.
///
/// The file is never created here. If the write or the fsync fails, the file
/// is truncated back to its length before the call, so a reader never sees a
/// partial record.
pub fn append_line_durable(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    append_or_rollback(&mut file, path, line)
}

/// What a durable append needs from the file underneath it.
trait AppendTarget: Write {
    fn len(&self) -> std::io::Result<u64>;
    fn sync(&self) -> std::io::Result<()>;
    fn truncate(&self, len: u64) -> std::io::Result<()>;
}

impl AppendTarget for File {
    fn len(&self) -> std::io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&self) -> std::io::Result<()> {
        self.sync_all()
    }

    fn truncate(&self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

fn append_or_rollback<T: AppendTarget>(target: &mut T, path: &Path, line: &str) -> Result<()> {
    let before = target.len()?;

    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');

    let written = target.write_all(&buf).and_then(|()| target.sync());
    if let Err(e) = written {
        // Rollback is best effort; the original error is what the caller sees.
        if let Err(trunc) = target.truncate(before).and_then(|()| target.sync()) {
            tracing::error!(path = %path.display(), error = %trunc, "rollback of partial append failed");
        }
        return Err(e.into());
    }
    Ok(())
}

/// Add `entry` to `root/.gitignore` if it isn't already present.
///
/// Checks for an exact line match. Appends with a leading newline separator
/// if the file doesn't already end with one.
pub fn ensure_gitignore_entry(root: &Path, entry: &str) -> Result<()> {
    let gitignore = root.join(".gitignore");
    let existing = if gitignore.exists() {
        std::fs::read_to_string(&gitignore)?
    } else {
        String::new()
    };
    if existing.lines().any(|l| l == entry) {
        return Ok(());
    }
    let sep = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&gitignore)?;
    writeln!(f, "{sep}{entry}")?;
    Ok(())
}
