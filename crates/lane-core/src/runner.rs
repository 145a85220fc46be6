//! Subprocess invocation for registry tools.
//!
//! A tool runs exactly once, synchronously, with stdin closed. Its stdout and
//! stderr are captured separately and never interleaved. There is no
//! timeout: the runner waits for normal termination and never signals the
//! child.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Everything needed to start one tool process.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub trait ToolRunner {
    /// Run the invocation to completion. `Err` means the process never started.
    fn run(&self, invocation: &Invocation) -> std::io::Result<ToolOutput>;
}

/// Locate a tool executable. Paths resolve against `workdir` and bare names
/// are looked up on `PATH`; either way the file must be executable.
pub fn locate_executable(executable: &str, workdir: &Path) -> Option<PathBuf> {
    if executable.is_empty() {
        return None;
    }
    if executable.contains(std::path::MAIN_SEPARATOR) || executable.contains('/') {
        return which::which_in(executable, None::<&str>, workdir).ok();
    }
    which::which(executable).ok()
}

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ToolOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn()?;

        // Read stdout/stderr in dedicated threads to avoid pipe-buffer deadlocks
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let stdout_thread = std::thread::spawn(move || read_all(stdout_handle));
        let stderr_thread = std::thread::spawn(move || read_all(stderr_handle));

        // Once spawned, the process counts as run even if waiting fails.
        let exit_code = match child.wait() {
            Ok(status) => exit_code(status),
            Err(e) => {
                tracing::error!(error = %e, "waiting for tool process failed");
                -1
            }
        };

        let stdout = stdout_thread.join().unwrap_or_default();
        let stderr = stderr_thread.join().unwrap_or_default();

        Ok(ToolOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

fn read_all<R: Read>(handle: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut r) = handle {
        let _ = r.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Exit code, or `128 + signal` for a signal-terminated process on unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
