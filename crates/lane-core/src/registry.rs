//! Read-only tool registry.
//!
//! The registry declares tools (executable plus typed parameter schema) and
//! binds action identifiers to tool invocations. An action is executable only
//! when it resolves to exactly one binding naming exactly one tool; every
//! other shape is a configuration error and is never repaired.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::ConfigWarning;
use crate::error::{LaneError, Result};
use crate::ident::ActionId;
use crate::runner;
use crate::schema::{ParamSpec, ParamValue};

static PARAM_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn param_name_re() -> &'static Regex {
    PARAM_NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap())
}

// ---------------------------------------------------------------------------
// ToolDefinition / ToolBinding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolDefinition {
    pub name: String,
    /// Absolute path, relative path, or a bare name looked up on `PATH`.
    pub executable: String,
    /// Fixed leading arguments, placed before any parameters.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolBinding {
    pub tool: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl ToolBinding {
    /// `--name=value` for every parameter, in name order.
    pub fn to_args(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|(name, value)| format!("--{name}={value}"))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ToolRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolRegistry {
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub actions: BTreeMap<String, Vec<ToolBinding>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no tool is defined for this action")]
    NoToolDefined,

    #[error("action maps to {count} tool candidates")]
    Ambiguous { count: usize },

    #[error("action is bound to undeclared tool '{name}'")]
    UnknownTool { name: String },
}

/// The single tool an action resolved to, with its bound parameters.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub tool: &'a ToolDefinition,
    pub binding: &'a ToolBinding,
}

impl ToolRegistry {
    pub fn from_yaml(data: &str) -> Result<Self> {
        let registry: ToolRegistry = serde_yaml::from_str(data)?;
        registry.check_declarations()?;
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    /// Reject schemas that could never be validated against.
    fn check_declarations(&self) -> Result<()> {
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(LaneError::InvalidRegistry("tool with empty name".into()));
            }
            for (param, spec) in &tool.params {
                if !param_name_re().is_match(param) {
                    return Err(LaneError::InvalidRegistry(format!(
                        "tool '{}': invalid parameter name '{param}'",
                        tool.name
                    )));
                }
                if let Some(problem) = spec.kind.declaration_errors().into_iter().next() {
                    return Err(LaneError::InvalidRegistry(format!(
                        "tool '{}', parameter '{param}': {problem}",
                        tool.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve `id` to exactly one tool. Never picks among several candidates.
    pub fn resolve(&self, id: &ActionId) -> std::result::Result<Resolution<'_>, ResolveError> {
        let bindings = self
            .actions
            .get(id.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let binding = match bindings {
            [] => return Err(ResolveError::NoToolDefined),
            [only] => only,
            many => return Err(ResolveError::Ambiguous { count: many.len() }),
        };

        let candidates: Vec<&ToolDefinition> = self
            .tools
            .iter()
            .filter(|t| t.name == binding.tool)
            .collect();
        match candidates.as_slice() {
            [] => Err(ResolveError::UnknownTool {
                name: binding.tool.clone(),
            }),
            [tool] => Ok(Resolution {
                tool: *tool,
                binding,
            }),
            many => Err(ResolveError::Ambiguous { count: many.len() }),
        }
    }

    /// Non-fatal findings: entries that load but can never execute.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let mut seen: HashMap<&str, usize> = HashMap::new();
        for tool in &self.tools {
            *seen.entry(tool.name.as_str()).or_default() += 1;
        }
        let mut duplicated: Vec<(&str, usize)> =
            seen.iter().filter(|(_, n)| **n > 1).map(|(k, n)| (*k, *n)).collect();
        duplicated.sort_unstable();
        for (name, count) in duplicated {
            warnings.push(ConfigWarning::error(format!(
                "tool '{name}' is declared {count} times; actions bound to it are ambiguous"
            )));
        }

        for (id, bindings) in &self.actions {
            if ActionId::parse(id).is_err() {
                warnings.push(ConfigWarning::warning(format!(
                    "action key '{id}' is not a canonical identifier and can never match"
                )));
            }
            match bindings.len() {
                0 => warnings.push(ConfigWarning::warning(format!(
                    "action '{id}' has no tool bindings"
                ))),
                1 => {}
                n => warnings.push(ConfigWarning::error(format!(
                    "action '{id}' has {n} tool bindings; it will always be denied"
                ))),
            }
            for binding in bindings {
                if !seen.contains_key(binding.tool.as_str()) {
                    warnings.push(ConfigWarning::error(format!(
                        "action '{id}' is bound to undeclared tool '{}'",
                        binding.tool
                    )));
                }
            }
        }

        warnings
    }

    /// Tools whose executable cannot be started from `workdir`: missing, not
    /// on `PATH`, or lacking the execute bit.
    pub fn check_executables(&self, workdir: &Path) -> Vec<ConfigWarning> {
        self.tools
            .iter()
            .filter(|tool| runner::locate_executable(&tool.executable, workdir).is_none())
            .map(|tool| {
                ConfigWarning::error(format!(
                    "tool '{}' executable '{}' is missing or not executable",
                    tool.name, tool.executable
                ))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// RegistrySource
// ---------------------------------------------------------------------------

/// Where the executor obtains its registry. Loaded once per request.
pub trait RegistrySource {
    fn load(&self) -> Result<ToolRegistry>;
}

#[derive(Debug, Clone)]
pub struct RegistryFile(pub PathBuf);

impl RegistrySource for RegistryFile {
    fn load(&self) -> Result<ToolRegistry> {
        ToolRegistry::load(&self.0)
    }
}

impl RegistrySource for ToolRegistry {
    fn load(&self) -> Result<ToolRegistry> {
        Ok(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
