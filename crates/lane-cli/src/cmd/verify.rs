use crate::output::{self, Verdict};
use lane_core::log::FileLog;
use lane_core::verifier::Verifier;
use lane_core::{Denial, Stage};
use std::path::Path;

use super::Overrides;

pub fn run(root: &Path, overrides: &Overrides, id: &str, hash: &str, json: bool) -> Verdict {
    if let Some(verdict) = super::reject_malformed(Stage::Verify, id, hash, json) {
        return verdict;
    }
    let paths = match super::lane_paths(root, overrides) {
        Ok(p) => p,
        Err(e) => {
            return output::deny(Stage::Verify, "config_unavailable", &format!("{e:#}"), None, json)
        }
    };
    let approvals = FileLog::new(&paths.approval_log);

    match Verifier::new(&approvals).verify(id, hash) {
        Ok(approved) => output::proceed(
            Stage::Verify,
            "approved",
            &format!("approved {}", approved.id()),
            None,
            json,
        ),
        Err(denial) => {
            tracing::warn!(code = denial.code(), "verification denied");
            output::deny(Stage::Verify, denial.code(), &denial.to_string(), None, json)
        }
    }
}
