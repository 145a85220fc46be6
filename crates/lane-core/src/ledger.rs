//! Execution records: the audit trail this lane writes, and the only thing
//! standing between an approved action and a second run of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::approval::CorruptLine;
use crate::ident::ActionId;

// ---------------------------------------------------------------------------
// ToolOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success,
    Failure,
}

impl ToolOutcome {
    /// `Success` iff the exit code is exactly zero.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            ToolOutcome::Success
        } else {
            ToolOutcome::Failure
        }
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolOutcome::Success => "success",
            ToolOutcome::Failure => "failure",
        })
    }
}

// ---------------------------------------------------------------------------
// ExecutionRecord
// ---------------------------------------------------------------------------

/// One line of the execution log.
///
/// Only these five fields are ever persisted: no parameters, no tool output,
/// no command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub exit_code: i32,
    #[serde(alias = "result")]
    pub outcome: ToolOutcome,
}

impl ExecutionRecord {
    pub fn new(id: &ActionId, tool: impl Into<String>, exit_code: i32) -> Self {
        Self {
            id: id.as_str().to_string(),
            timestamp: Utc::now(),
            tool: tool.into(),
            exit_code,
            outcome: ToolOutcome::from_exit_code(exit_code),
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Parse every execution line. The first bad line aborts the whole parse.
pub fn parse_lines(lines: &[String]) -> Result<Vec<ExecutionRecord>, CorruptLine> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            serde_json::from_str::<ExecutionRecord>(raw).map_err(|e| CorruptLine {
                line: idx + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Exact, case-sensitive membership test.
pub fn contains(records: &[ExecutionRecord], id: &ActionId) -> bool {
    records.iter().any(|r| r.id == id.as_str())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "b2831d73-2708-4f50-944b-7b54f11bfbb4";

    #[test]
    fn outcome_follows_exit_code() {
        assert_eq!(ToolOutcome::from_exit_code(0), ToolOutcome::Success);
        assert_eq!(ToolOutcome::from_exit_code(1), ToolOutcome::Failure);
        assert_eq!(ToolOutcome::from_exit_code(127), ToolOutcome::Failure);
        assert_eq!(ToolOutcome::from_exit_code(-1), ToolOutcome::Failure);
    }

    #[test]
    fn record_line_has_exactly_the_audit_fields() {
        let id = ActionId::parse(ID).unwrap();
        let line = ExecutionRecord::new(&id, "send_note", 127).to_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["exit_code", "id", "outcome", "timestamp", "tool"]);
        assert_eq!(obj["exit_code"], 127);
        assert_eq!(obj["outcome"], "failure");
        assert!(!line.contains('\n'));
    }

    #[test]
    fn result_alias_accepted() {
        let raw = format!(
            r#"{{"id":"{ID}","timestamp":"2026-03-01T10:00:00Z","tool":"t","exit_code":0,"result":"success"}}"#
        );
        let records = parse_lines(&[raw]).unwrap();
        assert_eq!(records[0].outcome, ToolOutcome::Success);
    }

    #[test]
    fn extra_fields_are_corrupt() {
        let raw = format!(
            r#"{{"id":"{ID}","timestamp":"2026-03-01T10:00:00Z","tool":"t","exit_code":0,"outcome":"success","stdout":"x"}}"#
        );
        assert_eq!(parse_lines(&[raw]).unwrap_err().line, 1);
    }

    #[test]
    fn contains_is_case_sensitive() {
        let id = ActionId::parse(ID).unwrap();
        let mut record = ExecutionRecord::new(&id, "t", 0);
        assert!(contains(std::slice::from_ref(&record), &id));
        record.id = ID.to_uppercase();
        assert!(!contains(&[record], &id));
    }
}
