//! Run history: archived runs, aggregate stats and summary strings.
//!
//! Every run that reaches `done` is archived as an immutable
//! [`RunHistoryEntry`]. [`RunHistory`] keeps a bounded, newest-first list of
//! them; the free functions here aggregate over any slice of entries.

pub mod export;
pub mod groups;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::format::format_duration_ms;
use crate::run::types::{Run, RunId, Slot};

pub use export::{stats_csv, to_csv};
pub use groups::{DateGroup, group_by_date};

/// Default bound on the in-memory history list.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

const HOUR_MS: i64 = 3_600_000;
const MINUTE_MS: i64 = 60_000;

/// A completed run, archived for later review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryEntry {
    pub id: String,
    pub run_id: RunId,
    pub label: String,
    pub output: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
}

impl RunHistoryEntry {
    /// Archive a finished run. The timestamp is the moment the run finished.
    pub fn from_run(run: &Run) -> Self {
        let finished = run.done_at.unwrap_or(run.started_at);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            run_id: run.run_id.clone(),
            label: run.label.clone(),
            output: run.output(),
            timestamp: DateTime::from_timestamp_millis(finished).unwrap_or_else(Utc::now),
            exit_code: run.exit_code,
            duration_ms: run.duration_ms(),
            slot: run.slot,
        }
    }
}

/// Aggregate counts over a list of history entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHistoryStats {
    pub total_runs: usize,
    pub success_count: usize,
    pub fail_count: usize,
    pub total_duration_ms: i64,
}

/// Count successes and failures and sum durations.
///
/// A missing exit code counts as a failure. Only present, non-negative
/// durations contribute to the total.
pub fn compute_stats(entries: &[RunHistoryEntry]) -> RunHistoryStats {
    let mut stats = RunHistoryStats {
        total_runs: entries.len(),
        ..Default::default()
    };
    for entry in entries {
        if entry.exit_code == Some(0) {
            stats.success_count += 1;
        } else {
            stats.fail_count += 1;
        }
        if let Some(ms) = entry.duration_ms.filter(|ms| *ms >= 0) {
            stats.total_duration_ms = stats.total_duration_ms.saturating_add(ms);
        }
    }
    stats
}

/// Render a total duration: `Ns`, `M:SS`, or `Hh Mm` from one hour up.
pub fn format_total_duration_ms(ms: i64) -> String {
    if ms <= 0 {
        return "0".to_string();
    }
    if ms >= HOUR_MS {
        let hours = ms / HOUR_MS;
        let minutes = (ms % HOUR_MS) / MINUTE_MS;
        return if minutes > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}h", hours)
        };
    }
    format_duration_ms(Some(ms))
}

/// One-line summary, e.g. `"42 runs, 38 passed, 4 failed, 1:05 total"`.
pub fn format_summary(stats: &RunHistoryStats) -> String {
    if stats.total_runs == 0 {
        return "No runs".to_string();
    }
    format!(
        "{} runs, {} passed, {} failed, {} total",
        stats.total_runs,
        stats.success_count,
        stats.fail_count,
        format_total_duration_ms(stats.total_duration_ms)
    )
}

/// Compact toolbar text; empty when there is no history.
pub fn format_toolbar(stats: &RunHistoryStats) -> String {
    if stats.total_runs == 0 {
        return String::new();
    }
    format!(
        "{} passed, {} failed · {} total",
        stats.success_count,
        stats.fail_count,
        format_total_duration_ms(stats.total_duration_ms)
    )
}

/// Toast text shown when a run finishes.
pub fn completion_notice(label: &str, exit_code: Option<i32>) -> String {
    let label = label.trim();
    let name = if label.is_empty() {
        "Run".to_string()
    } else {
        format!("Run {}", label)
    };
    match exit_code {
        None | Some(0) => format!("{} completed successfully.", name),
        Some(_) => format!("{} failed.", name),
    }
}

/// Bounded, newest-first store of archived runs.
#[derive(Debug)]
pub struct RunHistory {
    entries: Mutex<VecDeque<RunHistoryEntry>>,
    max_entries: usize,
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl RunHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries: max_entries.max(1),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<RunHistoryEntry>> {
        // Entries are whole values, so a panic mid-push cannot leave one torn.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Archive an entry, evicting the oldest beyond the bound.
    pub fn record(&self, entry: RunHistoryEntry) {
        let mut entries = self.lock();
        entries.push_front(entry);
        entries.truncate(self.max_entries);
    }

    /// Archive a finished run.
    pub fn record_run(&self, run: &Run) -> RunHistoryEntry {
        let entry = RunHistoryEntry::from_run(run);
        self.record(entry.clone());
        entry
    }

    /// Copy of the current entries, newest first.
    pub fn snapshot(&self) -> Vec<RunHistoryEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> RunHistoryStats {
        compute_stats(&self.snapshot())
    }
}

#[cfg(test)]
pub(crate) fn entry(exit_code: Option<i32>, duration_ms: Option<i64>) -> RunHistoryEntry {
    RunHistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        run_id: RunId::new("run-1"),
        label: "Implement All".to_string(),
        output: String::new(),
        timestamp: Utc::now(),
        exit_code,
        duration_ms,
        slot: None,
    }
}
