use serde::Serialize;
use std::fmt;

/// The three gates, in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Verify,
    Eligibility,
    Execute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Verify => "verify",
            Stage::Eligibility => "eligibility",
            Stage::Execute => "execute",
        })
    }
}

/// A terminal deny from one of the gates.
///
/// `code` is stable and machine-readable; `Display` is the human detail.
/// Neither is ever used to soften the decision.
pub trait Denial: std::error::Error {
    fn code(&self) -> &'static str;
}
