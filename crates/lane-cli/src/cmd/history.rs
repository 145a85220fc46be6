use anyhow::Context;
use lane_core::ledger;
use lane_core::log::{FileLog, LogHandle};
use std::path::Path;

use super::Overrides;
use crate::output::{print_json, print_table};

pub fn run(root: &Path, overrides: &Overrides, id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let paths = super::lane_paths(root, overrides)?;
    let log = FileLog::new(&paths.execution_log);
    let lines = log
        .scan()
        .with_context(|| format!("failed to read {}", log.describe()))?;
    let records = ledger::parse_lines(&lines).map_err(|c| {
        anyhow::anyhow!(
            "execution log line {} is corrupt: {}",
            c.line,
            c.reason
        )
    })?;
    let records: Vec<_> = records
        .into_iter()
        .filter(|r| id.map_or(true, |want| r.id == want))
        .collect();

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No executions recorded.");
        return Ok(());
    }
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.timestamp.to_rfc3339(),
                r.id.clone(),
                r.tool.clone(),
                r.exit_code.to_string(),
                r.outcome.to_string(),
            ]
        })
        .collect();
    print_table(&["TIMESTAMP", "ID", "TOOL", "EXIT", "OUTCOME"], rows);
    Ok(())
}
