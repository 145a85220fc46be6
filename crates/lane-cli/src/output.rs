use lane_core::Stage;
use serde::Serialize;

/// How a command ends: exit 0 or exit 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Deny,
}

#[derive(Serialize)]
struct StatusLine<'a> {
    status: &'static str,
    stage: Stage,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
}

/// Print the `[OK]` status line (or its JSON form) and return `Proceed`.
pub fn proceed(stage: Stage, code: &str, message: &str, output: Option<&str>, json: bool) -> Verdict {
    emit("ok", stage, code, message, output, json);
    Verdict::Proceed
}

/// Print the `[ERROR]` status line (or its JSON form) and return `Deny`.
pub fn deny(stage: Stage, code: &str, message: &str, output: Option<&str>, json: bool) -> Verdict {
    emit("error", stage, code, message, output, json);
    Verdict::Deny
}

fn emit(status: &'static str, stage: Stage, code: &str, message: &str, output: Option<&str>, json: bool) {
    if json {
        let line = StatusLine {
            status,
            stage,
            code,
            message,
            output,
        };
        match serde_json::to_string(&line) {
            Ok(s) => println!("{s}"),
            // Never leave the caller without a status line.
            Err(_) => println!("{{\"status\":\"error\",\"code\":\"output_failed\"}}"),
        }
        return;
    }
    // Single line only: fold any embedded newlines in the detail.
    let message = message.replace('\n', " ");
    if status == "ok" {
        println!("[OK] {message}");
    } else {
        println!("[ERROR] {code}: {message}");
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  "));
    }
}
