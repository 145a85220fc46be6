use crate::output::{self, Verdict};
use lane_core::executor::Executor;
use lane_core::log::FileLog;
use lane_core::registry::RegistryFile;
use lane_core::runner::ProcessRunner;
use lane_core::{Denial, Stage};
use std::io::Write;
use std::path::Path;

use super::Overrides;

pub fn run(root: &Path, overrides: &Overrides, id: &str, hash: &str, json: bool) -> Verdict {
    if let Some(verdict) = super::reject_malformed(Stage::Execute, id, hash, json) {
        return verdict;
    }
    let paths = match super::lane_paths(root, overrides) {
        Ok(p) => p,
        Err(e) => {
            return output::deny(Stage::Execute, "config_unavailable", &format!("{e:#}"), None, json)
        }
    };
    let approvals = FileLog::new(&paths.approval_log);
    let executions = FileLog::new(&paths.execution_log);
    let registry = RegistryFile(paths.registry.clone());

    let executor = Executor::new(&approvals, &executions, &registry, &ProcessRunner, &paths.root);
    let execution = match executor.execute(id, hash) {
        Ok(execution) => execution,
        Err(denial) => {
            tracing::warn!(code = denial.code(), "execution denied");
            return output::deny(Stage::Execute, denial.code(), &denial.to_string(), None, json);
        }
    };

    let tool = &execution.record.tool;
    let exit_code = execution.record.exit_code;

    if execution.succeeded() {
        if json {
            return output::proceed(
                Stage::Execute,
                execution.code(),
                &format!("tool '{tool}' exited 0"),
                Some(&execution.stdout),
                true,
            );
        }
        print!("{}", execution.stdout);
        let _ = std::io::stdout().flush();
        return output::proceed(
            Stage::Execute,
            execution.code(),
            &format!("tool '{tool}' exited 0"),
            None,
            false,
        );
    }

    let message = match &execution.audit_error {
        Some(err) => format!(
            "tool '{tool}' exited {exit_code} but the execution record was not written: {err}"
        ),
        None => format!("tool '{tool}' exited {exit_code}"),
    };
    if json {
        return output::deny(
            Stage::Execute,
            execution.code(),
            &message,
            Some(&execution.stderr),
            true,
        );
    }
    eprint!("{}", execution.stderr);
    output::deny(Stage::Execute, execution.code(), &message, None, false)
}
