use anyhow::Context;
use lane_core::config::Config;
use lane_core::{io, paths};
use std::path::Path;

const REGISTRY_TEMPLATE: &str = "\
# Tools this lane may run, and the single tool each approved action maps to.
#
# tools:
#   - name: send_note
#     executable: /usr/local/bin/send-note
#     params:
#       text:
#         required: true
#         kind: { type: string, max_len: 280 }
# actions:
#   b2831d73-2708-4f50-944b-7b54f11bfbb4:
#     - tool: send_note
#       params: { text: hello }
tools: []
actions: {}
";

pub fn run(root: &Path) -> anyhow::Result<()> {
    io::ensure_dir(&paths::lane_dir(root)).context("failed to create .lane/")?;

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("created {}", paths::CONFIG_FILE);
    }

    // Resolve through the config so init honours custom locations.
    let resolved = Config::load(root)
        .context("failed to load config")?
        .resolve(root);

    for (path, data) in [
        (&resolved.approval_log, ""),
        (&resolved.execution_log, ""),
        (&resolved.registry, REGISTRY_TEMPLATE),
    ] {
        if let Some(parent) = path.parent() {
            io::ensure_dir(parent)?;
        }
        if io::write_if_missing(path, data.as_bytes())
            .with_context(|| format!("failed to create {}", path.display()))?
        {
            println!("created {}", path.display());
        }
    }

    io::ensure_gitignore_entry(root, &format!("{}/*{}", paths::LANE_DIR, paths::LOCK_SUFFIX))
        .context("failed to update .gitignore")?;

    println!("lane initialized in {}", root.display());
    Ok(())
}
