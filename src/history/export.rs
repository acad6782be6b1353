//! CSV exports of run history.

use chrono::{DateTime, SecondsFormat, Utc};

use super::{RunHistoryEntry, compute_stats, format_summary};
use crate::format::format_duration_ms;

const HISTORY_CSV_HEADER: &str = "timestamp,label,slot,exit_code,duration,output";
const STATS_CSV_HEADER: &str =
    "exportedAt,totalRuns,successCount,failCount,totalDurationMs,summary";

/// Quote a CSV field when it contains a comma, quote, or line break.
pub fn escape_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Full history as CSV. `entries` are newest first; rows come out oldest first.
pub fn to_csv(entries: &[RunHistoryEntry]) -> String {
    let mut lines = vec![HISTORY_CSV_HEADER.to_string()];
    for e in entries.iter().rev() {
        lines.push(format!(
            "{},{},{},{},{},{}",
            escape_csv_field(&rfc3339(&e.timestamp)),
            escape_csv_field(&e.label),
            e.slot.map(|s| s.to_string()).unwrap_or_default(),
            e.exit_code.map(|c| c.to_string()).unwrap_or_default(),
            format_duration_ms(e.duration_ms),
            escape_csv_field(&e.output),
        ));
    }
    lines.join("\n")
}

/// Single-row CSV of aggregate stats.
pub fn stats_csv(entries: &[RunHistoryEntry], exported_at: DateTime<Utc>) -> String {
    let stats = compute_stats(entries);
    let row = [
        escape_csv_field(&rfc3339(&exported_at)),
        stats.total_runs.to_string(),
        stats.success_count.to_string(),
        stats.fail_count.to_string(),
        stats.total_duration_ms.to_string(),
        escape_csv_field(&format_summary(&stats)),
    ]
    .join(",");
    format!("{}\n{}", STATS_CSV_HEADER, row)
}
