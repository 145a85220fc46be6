use serde::{Deserialize, Serialize};

/// One line of the approval log, written by the external review step.
///
/// `timestamp` is informational and kept as the raw string; nothing gates on
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: String,
    pub timestamp: String,
    pub hash: String,
}

/// A line of a log that could not be parsed. `line` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptLine {
    pub line: usize,
    pub reason: String,
}

/// Parse every approval line. The first bad line aborts the whole parse.
pub fn parse_lines(lines: &[String]) -> Result<Vec<ApprovalRecord>, CorruptLine> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            serde_json::from_str::<ApprovalRecord>(raw).map_err(|e| CorruptLine {
                line: idx + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_well_formed_lines() {
        let parsed = parse_lines(&lines(&[
            r#"{"id":"a","timestamp":"2026-01-01T00:00:00Z","hash":"h1"}"#,
            r#"{"id":"b","timestamp":"whenever","hash":"h2"}"#,
        ]))
        .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].id, "b");
        assert_eq!(parsed[1].hash, "h2");
    }

    #[test]
    fn reports_first_corrupt_line() {
        let err = parse_lines(&lines(&[
            r#"{"id":"a","timestamp":"t","hash":"h"}"#,
            r#"{"id":"b","timestamp":"t"}"#,
            "garbage",
        ]))
        .unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn blank_line_is_corrupt() {
        let err = parse_lines(&lines(&["", r#"{"id":"a","timestamp":"t","hash":"h"}"#]))
            .unwrap_err();
        assert_eq!(err.line, 1);
    }
}
