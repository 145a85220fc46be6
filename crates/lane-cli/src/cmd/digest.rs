use anyhow::Context;
use lane_core::digest;
use std::io::Read;
use std::path::Path;

use crate::output::print_json;

pub fn run(file: &Path, json: bool) -> anyhow::Result<()> {
    let hash = if file == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        digest::content_hash(&buf)
    } else {
        digest::file_hash(file).with_context(|| format!("failed to read {}", file.display()))?
    };

    if json {
        print_json(&serde_json::json!({ "hash": hash.as_str() }))?;
    } else {
        println!("{}", hash.as_str());
    }
    Ok(())
}
