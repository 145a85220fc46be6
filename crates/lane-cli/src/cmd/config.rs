use crate::output::print_json;
use clap::Subcommand;
use lane_core::config::{ConfigWarning, WarnLevel};
use lane_core::registry::ToolRegistry;
use std::path::Path;

use super::Overrides;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show resolved file locations
    Show,

    /// Validate config, logs, and registry for mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(
    root: &Path,
    overrides: &Overrides,
    subcmd: ConfigSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, overrides, json),
        ConfigSubcommand::Validate => validate(root, overrides, json),
    }
}

fn show(root: &Path, overrides: &Overrides, json: bool) -> anyhow::Result<()> {
    let paths = super::lane_paths(root, overrides)?;
    if json {
        return print_json(&serde_json::json!({
            "root": paths.root,
            "approval_log": paths.approval_log,
            "execution_log": paths.execution_log,
            "registry": paths.registry,
        }));
    }
    println!("root:          {}", paths.root.display());
    println!("approval_log:  {}", paths.approval_log.display());
    println!("execution_log: {}", paths.execution_log.display());
    println!("registry:      {}", paths.registry.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, overrides: &Overrides, json: bool) -> anyhow::Result<()> {
    let paths = super::lane_paths(root, overrides)?;
    let mut warnings = paths.validate();

    if paths.registry.is_file() {
        match ToolRegistry::load(&paths.registry) {
            Ok(registry) => {
                warnings.extend(registry.validate());
                warnings.extend(registry.check_executables(&paths.root));
            }
            Err(e) => warnings.push(ConfigWarning::error(format!("registry does not load: {e}"))),
        }
    }

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
