use crate::output::{self, Verdict};
use lane_core::eligibility::EligibilityController;
use lane_core::log::FileLog;
use lane_core::{Denial, Stage};
use std::path::Path;

use super::Overrides;

pub fn run(root: &Path, overrides: &Overrides, id: &str, hash: &str, json: bool) -> Verdict {
    if let Some(verdict) = super::reject_malformed(Stage::Eligibility, id, hash, json) {
        return verdict;
    }
    let paths = match super::lane_paths(root, overrides) {
        Ok(p) => p,
        Err(e) => {
            return output::deny(
                Stage::Eligibility,
                "config_unavailable",
                &format!("{e:#}"),
                None,
                json,
            )
        }
    };
    let approvals = FileLog::new(&paths.approval_log);
    let executions = FileLog::new(&paths.execution_log);

    match EligibilityController::new(&approvals, &executions).check(id, hash) {
        Ok(eligible) => output::proceed(
            Stage::Eligibility,
            "eligible",
            &format!("eligible {}", eligible.id()),
            None,
            json,
        ),
        Err(denial) => {
            tracing::warn!(
                code = denial.code(),
                precondition = denial.precondition(),
                "eligibility denied"
            );
            output::deny(Stage::Eligibility, denial.code(), &denial.to_string(), None, json)
        }
    }
}
