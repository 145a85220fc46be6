//! Typed parameter schemas for registry tools.
//!
//! A tool declares each parameter as one of a closed set of kinds, each with
//! its own constraint fields. Validation reports every violation it finds so
//! the operator can fix a binding in one pass.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ParamValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Boolean(bool),
    Integer(i64),
    String(String),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Integer(_) => "integer",
            ParamValue::String(_) => "string",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Boolean(b) => write!(f, "{b}"),
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::String(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// ParamKind / ParamSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ParamKind {
    String {
        min_len: Option<usize>,
        max_len: Option<usize>,
        /// Regex the whole value is matched against; anchor it yourself.
        pattern: Option<String>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Boolean,
    Enum {
        values: Vec<String>,
    },
}

impl ParamKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamKind::String { .. } => "string",
            ParamKind::Integer { .. } => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Enum { .. } => "enum",
        }
    }

    /// Problems with the constraint declaration itself, independent of any value.
    pub fn declaration_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match self {
            ParamKind::String {
                min_len,
                max_len,
                pattern,
            } => {
                if let (Some(lo), Some(hi)) = (min_len, max_len) {
                    if lo > hi {
                        errors.push(format!("min_len {lo} exceeds max_len {hi}"));
                    }
                }
                if let Some(p) = pattern {
                    if let Err(e) = Regex::new(p) {
                        errors.push(format!("pattern does not compile: {e}"));
                    }
                }
            }
            ParamKind::Integer { min, max } => {
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        errors.push(format!("min {lo} exceeds max {hi}"));
                    }
                }
            }
            ParamKind::Boolean => {}
            ParamKind::Enum { values } => {
                if values.is_empty() {
                    errors.push("enum declares no values".to_string());
                }
            }
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    #[serde(default)]
    pub required: bool,
    pub kind: ParamKind,
}

// ---------------------------------------------------------------------------
// ParamViolation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamViolation {
    #[error("missing required parameter '{name}'")]
    Missing { name: String },

    #[error("unknown parameter '{name}'")]
    Unknown { name: String },

    #[error("parameter '{name}' must be {expected}, got {found}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("parameter '{name}' is outside {bounds}")]
    OutOfRange { name: String, bounds: String },

    #[error("parameter '{name}' length {len} is outside {bounds}")]
    Length {
        name: String,
        len: usize,
        bounds: String,
    },

    #[error("parameter '{name}' does not match its pattern")]
    PatternMismatch { name: String },

    #[error("parameter '{name}' is not one of the allowed values")]
    NotAllowed { name: String },

    #[error("parameter '{name}' has an unusable pattern")]
    BadPattern { name: String },
}

fn bounds<T: fmt::Display>(lo: &Option<T>, hi: &Option<T>) -> String {
    let lo = lo.as_ref().map_or("-inf".to_string(), ToString::to_string);
    let hi = hi.as_ref().map_or("+inf".to_string(), ToString::to_string);
    format!("[{lo}, {hi}]")
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check `values` against `schema`. An empty result means the values are valid.
pub fn validate(
    schema: &BTreeMap<String, ParamSpec>,
    values: &BTreeMap<String, ParamValue>,
) -> Vec<ParamViolation> {
    let mut violations = Vec::new();

    for (name, spec) in schema {
        match values.get(name) {
            None if spec.required => violations.push(ParamViolation::Missing { name: name.clone() }),
            None => {}
            Some(value) => check_value(name, &spec.kind, value, &mut violations),
        }
    }

    for name in values.keys() {
        if !schema.contains_key(name) {
            violations.push(ParamViolation::Unknown { name: name.clone() });
        }
    }

    violations
}

fn check_value(name: &str, kind: &ParamKind, value: &ParamValue, out: &mut Vec<ParamViolation>) {
    let wrong_type = |expected: &'static str| ParamViolation::WrongType {
        name: name.to_string(),
        expected,
        found: value.type_name(),
    };

    match (kind, value) {
        (
            ParamKind::String {
                min_len,
                max_len,
                pattern,
            },
            ParamValue::String(s),
        ) => {
            let len = s.chars().count();
            let too_short = min_len.is_some_and(|lo| len < lo);
            let too_long = max_len.is_some_and(|hi| len > hi);
            if too_short || too_long {
                out.push(ParamViolation::Length {
                    name: name.to_string(),
                    len,
                    bounds: bounds(min_len, max_len),
                });
            }
            if let Some(p) = pattern {
                match Regex::new(p) {
                    Ok(re) if re.is_match(s) => {}
                    Ok(_) => out.push(ParamViolation::PatternMismatch {
                        name: name.to_string(),
                    }),
                    Err(_) => out.push(ParamViolation::BadPattern {
                        name: name.to_string(),
                    }),
                }
            }
        }
        (ParamKind::Integer { min, max }, ParamValue::Integer(i)) => {
            let below = min.is_some_and(|lo| *i < lo);
            let above = max.is_some_and(|hi| *i > hi);
            if below || above {
                out.push(ParamViolation::OutOfRange {
                    name: name.to_string(),
                    bounds: bounds(min, max),
                });
            }
        }
        (ParamKind::Boolean, ParamValue::Boolean(_)) => {}
        (ParamKind::Enum { values }, ParamValue::String(s)) => {
            if !values.iter().any(|v| v == s) {
                out.push(ParamViolation::NotAllowed {
                    name: name.to_string(),
                });
            }
        }
        (ParamKind::Enum { .. }, _) => out.push(wrong_type("string")),
        (kind, _) => out.push(wrong_type(kind.type_name())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> BTreeMap<String, ParamSpec> {
        serde_yaml::from_str(
            r#"
text:
  required: true
  kind: { type: string, min_len: 1, max_len: 5, pattern: "^[a-z]+$" }
priority:
  kind: { type: integer, min: 0, max: 3 }
urgent:
  kind: { type: boolean }
channel:
  required: true
  kind: { type: enum, values: [email, sms] }
"#,
        )
        .unwrap()
    }

    fn values(yaml: &str) -> BTreeMap<String, ParamValue> {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn valid_values_pass() {
        let v = values("{ text: hello, priority: 2, urgent: true, channel: sms }");
        assert!(validate(&schema(), &v).is_empty());
    }

    #[test]
    fn optional_parameters_may_be_absent() {
        let v = values("{ text: hi, channel: email }");
        assert!(validate(&schema(), &v).is_empty());
    }

    #[test]
    fn missing_and_unknown_are_both_reported() {
        let v = values("{ text: hi, extra: 1 }");
        let violations = validate(&schema(), &v);
        assert_eq!(
            violations,
            vec![
                ParamViolation::Missing {
                    name: "channel".into()
                },
                ParamViolation::Unknown {
                    name: "extra".into()
                },
            ]
        );
    }

    #[test]
    fn type_mismatches() {
        let v = values(r#"{ text: 5, priority: "2", urgent: "yes", channel: true }"#);
        let violations = validate(&schema(), &v);
        assert_eq!(violations.len(), 4);
        assert!(violations.iter().all(|v| matches!(v, ParamViolation::WrongType { .. })));
    }

    #[test]
    fn constraint_violations() {
        let v = values(r#"{ text: "TOOLONG", priority: 9, channel: fax }"#);
        let violations = validate(&schema(), &v);
        assert!(violations.contains(&ParamViolation::Length {
            name: "text".into(),
            len: 7,
            bounds: "[1, 5]".into(),
        }));
        assert!(violations.contains(&ParamViolation::PatternMismatch {
            name: "text".into()
        }));
        assert!(violations.contains(&ParamViolation::OutOfRange {
            name: "priority".into(),
            bounds: "[0, 3]".into(),
        }));
        assert!(violations.contains(&ParamViolation::NotAllowed {
            name: "channel".into()
        }));
    }

    #[test]
    fn unknown_kind_fields_rejected() {
        let result = serde_yaml::from_str::<ParamSpec>("kind: { type: integer, minimum: 1 }");
        assert!(result.is_err(), "typo in constraint name should be rejected");
    }

    #[test]
    fn declaration_errors() {
        let bad = ParamKind::String {
            min_len: Some(4),
            max_len: Some(2),
            pattern: Some("(".into()),
        };
        assert_eq!(bad.declaration_errors().len(), 2);
        assert_eq!(
            ParamKind::Enum { values: vec![] }.declaration_errors().len(),
            1
        );
        assert!(ParamKind::Boolean.declaration_errors().is_empty());
    }
}
