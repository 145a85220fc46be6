//! Gate 3: run the one tool an eligible action maps to, exactly once, and
//! record that it ran.
//!
//! ```text
//! lock -> eligibility -> registry lookup -> parameter validation
//!      -> process execution -> audit append -> report
//! ```
//!
//! The execution log's lock is held from the eligibility check until the
//! audit append finishes, so two invocations for the same identifier cannot
//! both observe "not yet executed". Nothing before process execution writes
//! anything; nothing after it retries anything.

use std::path::PathBuf;

use thiserror::Error;

use crate::eligibility::{EligibilityController, EligibilityDenial, Eligible};
use crate::ledger::{ExecutionRecord, ToolOutcome};
use crate::log::LogHandle;
use crate::registry::{RegistrySource, ResolveError};
use crate::runner::{self, Invocation, ToolRunner};
use crate::schema::{self, ParamViolation};
use crate::stage::Denial;

/// Environment variable carrying the identifier into the tool process.
pub const ACTION_ID_ENV: &str = "LANE_ACTION_ID";

/// Exit code recorded when the tool process could not be started.
pub const SPAWN_FAILED_EXIT_CODE: i32 = -1;

// ---------------------------------------------------------------------------
// ExecutionDenial
// ---------------------------------------------------------------------------

/// Reasons the executor refused before any process was started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionDenial {
    #[error("could not serialize access to the execution log: {0}")]
    LockUnavailable(String),

    #[error(transparent)]
    NotEligible(#[from] EligibilityDenial),

    #[error("tool registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("no tool is defined for this action")]
    NoToolDefined,

    #[error("action maps to {count} tool candidates")]
    AmbiguousToolMapping { count: usize },

    #[error("action is bound to undeclared tool '{name}'")]
    UnknownTool { name: String },

    #[error("executable for tool '{tool}' not found: {executable}")]
    ExecutableNotFound { tool: String, executable: String },

    #[error("{}", join_violations(.0))]
    InvalidParameters(Vec<ParamViolation>),
}

fn join_violations(violations: &[ParamViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ResolveError> for ExecutionDenial {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NoToolDefined => ExecutionDenial::NoToolDefined,
            ResolveError::Ambiguous { count } => ExecutionDenial::AmbiguousToolMapping { count },
            ResolveError::UnknownTool { name } => ExecutionDenial::UnknownTool { name },
        }
    }
}

impl Denial for ExecutionDenial {
    fn code(&self) -> &'static str {
        match self {
            ExecutionDenial::LockUnavailable(_) => "lock_unavailable",
            ExecutionDenial::NotEligible(inner) => inner.code(),
            ExecutionDenial::RegistryUnavailable(_) => "registry_unavailable",
            ExecutionDenial::NoToolDefined => "no_tool_defined",
            ExecutionDenial::AmbiguousToolMapping { .. } => "ambiguous_tool_mapping",
            ExecutionDenial::UnknownTool { .. } => "unknown_tool",
            ExecutionDenial::ExecutableNotFound { .. } => "executable_not_found",
            ExecutionDenial::InvalidParameters(_) => "invalid_parameters",
        }
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// The result of a tool that was actually started (or whose start was
/// attempted after every gate passed).
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub record: ExecutionRecord,
    pub stdout: String,
    pub stderr: String,
    /// Set when the execution record could not be durably appended.
    pub audit_error: Option<String>,
}

impl Execution {
    /// True only for a zero exit code whose record is on disk.
    pub fn succeeded(&self) -> bool {
        self.record.outcome == ToolOutcome::Success && self.audit_error.is_none()
    }

    pub fn code(&self) -> &'static str {
        if self.audit_error.is_some() {
            "audit_write_failed"
        } else if self.record.outcome == ToolOutcome::Success {
            "success"
        } else {
            "tool_failed"
        }
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor<'a> {
    approvals: &'a dyn LogHandle,
    executions: &'a dyn LogHandle,
    registry: &'a dyn RegistrySource,
    runner: &'a dyn ToolRunner,
    workdir: PathBuf,
}

impl<'a> Executor<'a> {
    pub fn new(
        approvals: &'a dyn LogHandle,
        executions: &'a dyn LogHandle,
        registry: &'a dyn RegistrySource,
        runner: &'a dyn ToolRunner,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            approvals,
            executions,
            registry,
            runner,
            workdir: workdir.into(),
        }
    }

    pub fn execute(&self, id: &str, hash: &str) -> Result<Execution, ExecutionDenial> {
        let _lock = self
            .executions
            .lock()
            .map_err(|e| ExecutionDenial::LockUnavailable(e.to_string()))?;

        let eligible =
            EligibilityController::new(self.approvals, self.executions).check(id, hash)?;
        let (tool_name, invocation) = self.prepare(&eligible)?;

        tracing::debug!(id = %eligible.id(), tool = %tool_name, "starting tool");
        let (exit_code, stdout, stderr) = match self.runner.run(&invocation) {
            Ok(out) => (out.exit_code, out.stdout, out.stderr),
            Err(e) => {
                tracing::error!(id = %eligible.id(), tool = %tool_name, error = %e, "tool failed to start");
                (
                    SPAWN_FAILED_EXIT_CODE,
                    String::new(),
                    format!("failed to start tool: {e}"),
                )
            }
        };

        let record = ExecutionRecord::new(eligible.id(), tool_name, exit_code);
        let audit_error = self.record(&record).err().map(|e| e.to_string());
        if let Some(err) = &audit_error {
            tracing::error!(
                id = %eligible.id(),
                exit_code,
                error = %err,
                "execution record not written; reporting failure"
            );
        }

        Ok(Execution {
            record,
            stdout,
            stderr,
            audit_error,
        })
    }

    /// Registry lookup and parameter validation. Pure: starts nothing.
    fn prepare(&self, eligible: &Eligible) -> Result<(String, Invocation), ExecutionDenial> {
        let registry = self
            .registry
            .load()
            .map_err(|e| ExecutionDenial::RegistryUnavailable(e.to_string()))?;
        let resolution = registry.resolve(eligible.id())?;
        let tool = resolution.tool;
        let binding = resolution.binding;

        let program = runner::locate_executable(&tool.executable, &self.workdir)
            .ok_or_else(|| ExecutionDenial::ExecutableNotFound {
                tool: tool.name.clone(),
                executable: tool.executable.clone(),
            })?;

        let violations = schema::validate(&tool.params, &binding.params);
        if !violations.is_empty() {
            return Err(ExecutionDenial::InvalidParameters(violations));
        }

        let mut args = tool.args.clone();
        args.extend(binding.to_args());
        let invocation = Invocation {
            program,
            args,
            cwd: self.workdir.clone(),
            env: vec![(ACTION_ID_ENV.to_string(), eligible.id().to_string())],
        };
        Ok((tool.name.clone(), invocation))
    }

    fn record(&self, record: &ExecutionRecord) -> crate::Result<()> {
        let line = record.to_line()?;
        self.executions.append(&line)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ledger;
    use crate::log::MemoryLog;
    use crate::registry::ToolRegistry;
    use crate::runner::ToolOutput;
    use std::cell::RefCell;

    const ID: &str = "b2831d73-2708-4f50-944b-7b54f11bfbb4";
    const AMBIGUOUS: &str = "0f6c1a52-8a7e-4d3b-9c1e-2a4b6c8d0e1f";
    const UNMAPPED: &str = "7d9e2b14-3c5a-4f6b-8d7e-9f0a1b2c3d4e";
    const BAD_PARAMS: &str = "c3a1e5f7-9b2d-4e6f-a8c0-1d3e5f7a9b2c";

    /// Records every invocation and answers with a fixed result.
    struct FakeRunner {
        result: Result<ToolOutput, std::io::ErrorKind>,
        calls: RefCell<Vec<Invocation>>,
    }

    impl FakeRunner {
        fn exiting(code: i32) -> Self {
            Self {
                result: Ok(ToolOutput {
                    exit_code: code,
                    stdout: "done\n".into(),
                    stderr: "oops\n".into(),
                }),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn unspawnable() -> Self {
            Self {
                result: Err(std::io::ErrorKind::PermissionDenied),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl ToolRunner for FakeRunner {
        fn run(&self, invocation: &Invocation) -> std::io::Result<ToolOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            self.result.clone().map_err(std::io::Error::from)
        }
    }

    fn hash() -> String {
        "ab".repeat(32)
    }

    fn approvals() -> MemoryLog {
        MemoryLog::with_lines(
            [ID, AMBIGUOUS, UNMAPPED, BAD_PARAMS]
                .map(|id| format!(r#"{{"id":"{id}","timestamp":"t","hash":"{}"}}"#, hash())),
        )
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::from_yaml(&format!(
            r#"
tools:
  - name: note
    executable: /bin/sh
    args: ["-c", "true"]
    params:
      text:
        required: true
        kind: {{ type: string, max_len: 8 }}
      count:
        kind: {{ type: integer, min: 1 }}
actions:
  {ID}:
    - tool: note
      params: {{ text: hello, count: 2 }}
  {AMBIGUOUS}:
    - tool: note
      params: {{ text: a }}
    - tool: note
      params: {{ text: b }}
  {BAD_PARAMS}:
    - tool: note
      params: {{ count: 0 }}
"#
        ))
        .unwrap()
    }

    fn run(
        executions: &MemoryLog,
        runner: &FakeRunner,
        id: &str,
    ) -> Result<Execution, ExecutionDenial> {
        let approvals = approvals();
        let registry = registry();
        Executor::new(&approvals, executions, &registry, runner, "/tmp").execute(id, &hash())
    }

    fn records(log: &MemoryLog) -> Vec<ExecutionRecord> {
        ledger::parse_lines(&log.lines()).unwrap()
    }

    #[test]
    fn successful_run_is_recorded_once() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        let execution = run(&executions, &runner, ID).unwrap();

        assert!(execution.succeeded());
        assert_eq!(execution.code(), "success");
        assert_eq!(execution.stdout, "done\n");
        assert_eq!(runner.calls(), 1);

        let recorded = records(&executions);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].id, ID);
        assert_eq!(recorded[0].tool, "note");
        assert_eq!(recorded[0].exit_code, 0);
        assert_eq!(recorded[0].outcome, ToolOutcome::Success);
    }

    #[test]
    fn invocation_shape() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        run(&executions, &runner, ID).unwrap();
        let inv = runner.calls.borrow()[0].clone();
        assert_eq!(inv.program, PathBuf::from("/bin/sh"));
        assert_eq!(inv.args, vec!["-c", "true", "--count=2", "--text=hello"]);
        assert_eq!(inv.cwd, PathBuf::from("/tmp"));
        assert_eq!(inv.env, vec![(ACTION_ID_ENV.to_string(), ID.to_string())]);
    }

    #[test]
    fn second_run_is_a_replay_and_appends_nothing() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        run(&executions, &runner, ID).unwrap();

        let denial = run(&executions, &runner, ID).unwrap_err();
        assert_eq!(denial.code(), "replay");
        assert_eq!(runner.calls(), 1);
        assert_eq!(executions.lines().len(), 1);
    }

    #[test]
    fn nonzero_exit_is_recorded_as_failure() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(127);
        let execution = run(&executions, &runner, ID).unwrap();

        assert!(!execution.succeeded());
        assert_eq!(execution.code(), "tool_failed");
        assert_eq!(execution.stderr, "oops\n");
        let recorded = records(&executions);
        assert_eq!(recorded[0].exit_code, 127);
        assert_eq!(recorded[0].outcome, ToolOutcome::Failure);
    }

    #[test]
    fn audit_failure_overrides_tool_success() {
        let executions = MemoryLog::new().fail_appends();
        let runner = FakeRunner::exiting(0);
        let execution = run(&executions, &runner, ID).unwrap();

        assert_eq!(execution.record.outcome, ToolOutcome::Success);
        assert!(!execution.succeeded());
        assert_eq!(execution.code(), "audit_write_failed");
        assert!(executions.lines().is_empty(), "no partial record may be visible");
    }

    #[test]
    fn ambiguous_mapping_starts_nothing() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        let denial = run(&executions, &runner, AMBIGUOUS).unwrap_err();
        assert_eq!(denial, ExecutionDenial::AmbiguousToolMapping { count: 2 });
        assert_eq!(runner.calls(), 0);
        assert!(executions.lines().is_empty());
    }

    #[test]
    fn unmapped_action_has_no_tool() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        let denial = run(&executions, &runner, UNMAPPED).unwrap_err();
        assert_eq!(denial.code(), "no_tool_defined");
        assert_eq!(runner.calls(), 0);
    }

    #[test]
    fn invalid_parameters_list_every_violation() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        let denial = run(&executions, &runner, BAD_PARAMS).unwrap_err();
        assert_eq!(denial.code(), "invalid_parameters");
        let ExecutionDenial::InvalidParameters(violations) = &denial else {
            panic!("unexpected denial: {denial:?}");
        };
        assert_eq!(violations.len(), 2);
        assert!(denial.to_string().contains("missing required parameter 'text'"));
        assert_eq!(runner.calls(), 0);
        assert!(executions.lines().is_empty());
    }

    #[test]
    fn spawn_failure_consumes_the_identifier() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::unspawnable();
        let execution = run(&executions, &runner, ID).unwrap();
        assert!(!execution.succeeded());
        assert_eq!(execution.record.exit_code, SPAWN_FAILED_EXIT_CODE);

        let denial = run(&executions, &FakeRunner::exiting(0), ID).unwrap_err();
        assert_eq!(denial.code(), "replay");
    }

    #[test]
    fn ineligible_requests_never_reach_the_registry() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        let approvals = approvals();
        let broken = crate::registry::RegistryFile(PathBuf::from("/no/such/registry.yaml"));
        let exec = Executor::new(&approvals, &executions, &broken, &runner, "/tmp");

        assert_eq!(
            exec.execute(ID, &"cd".repeat(32)).unwrap_err().code(),
            "hash_mismatch"
        );
        assert_eq!(
            exec.execute(ID, &hash()).unwrap_err().code(),
            "registry_unavailable"
        );
        assert_eq!(runner.calls(), 0);
    }

    #[test]
    fn missing_executable_is_a_configuration_denial() {
        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        let approvals = approvals();
        let registry = ToolRegistry::from_yaml(&format!(
            "tools:\n  - name: gone\n    executable: /no/such/bin\nactions:\n  {ID}:\n    - tool: gone\n"
        ))
        .unwrap();
        let denial = Executor::new(&approvals, &executions, &registry, &runner, "/tmp")
            .execute(ID, &hash())
            .unwrap_err();
        assert_eq!(denial.code(), "executable_not_found");
        assert_eq!(runner.calls(), 0);
    }

    #[test]
    fn non_executable_file_is_denied_without_consuming_the_id() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("tool.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let executions = MemoryLog::new();
        let runner = FakeRunner::exiting(0);
        let approvals = approvals();
        let registry = ToolRegistry::from_yaml(&format!(
            "tools:\n  - name: plain\n    executable: ./tool.sh\nactions:\n  {ID}:\n    - tool: plain\n"
        ))
        .unwrap();
        let denial = Executor::new(&approvals, &executions, &registry, &runner, dir.path())
            .execute(ID, &hash())
            .unwrap_err();
        assert_eq!(denial.code(), "executable_not_found");
        assert_eq!(runner.calls(), 0);
        assert!(executions.lines().is_empty());
    }
}
