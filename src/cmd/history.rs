//! Saved run history: `rundock history stats|export`.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::path::Path;

use rundock::format::format_duration_ms;
use rundock::history::{
    RunHistoryEntry, compute_stats, format_summary, format_toolbar, group_by_date, stats_csv,
    to_csv,
};

use super::super::{ExportFormat, HistoryCommands};

fn load_entries(path: &Path) -> Result<Vec<RunHistoryEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse history file: {}", path.display()))
}

fn print_entry(entry: &RunHistoryEntry) {
    let status = match entry.exit_code {
        Some(0) => console::style("ok".to_string()).green(),
        Some(code) => console::style(format!("exit {}", code)).red(),
        None => console::style("stopped".to_string()).dim(),
    };
    let when = entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    let duration = format_duration_ms(entry.duration_ms);
    println!("  {}  {:<32} {:>8}  {}", when, entry.label, duration, status);
}

pub fn cmd_history(command: HistoryCommands) -> Result<()> {
    match command {
        HistoryCommands::Stats { file, toolbar } => {
            let entries = load_entries(&file)?;
            let stats = compute_stats(&entries);
            if toolbar {
                println!("{}", format_toolbar(&stats));
                return Ok(());
            }

            println!("{}", format_summary(&stats));
            for (group, bucket) in group_by_date(&entries, &Local::now()) {
                println!();
                println!("{}", console::style(group.label()).bold());
                for entry in &bucket {
                    print_entry(entry);
                }
            }
        }
        HistoryCommands::Export { file, format } => {
            let entries = load_entries(&file)?;
            let output = match format {
                ExportFormat::Csv => to_csv(&entries),
                ExportFormat::Json => serde_json::to_string_pretty(&entries)?,
                ExportFormat::StatsCsv => stats_csv(&entries, Utc::now()),
            };
            println!("{}", output);
        }
    }

    Ok(())
}
