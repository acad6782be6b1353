//! The source of truth for all runs.
//!
//! The run list lives in a `tokio::sync::watch` channel as an
//! `Arc<Vec<Run>>`. Every mutation builds a new list and swaps it in, so a
//! snapshot handed out earlier is never modified and subscribers always see
//! whole runs. Mutations are short synchronous critical sections and never
//! await.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use super::types::{Run, RunId, RunStatus, Slot, now_ms};

/// Immutable view of the run list at one point in time.
pub type RunSnapshot = Arc<Vec<Run>>;

#[derive(Debug)]
pub struct RunRegistry {
    runs: watch::Sender<RunSnapshot>,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self {
            runs: watch::Sender::new(Arc::new(Vec::new())),
        }
    }

    /// Replace the run with `run_id` by `f(run)` if `f` returns a new value.
    fn update<F>(&self, run_id: &RunId, f: F) -> Option<Run>
    where
        F: FnOnce(&Run) -> Option<Run>,
    {
        let mut replaced = None;
        self.runs.send_if_modified(|current| {
            let Some(index) = current.iter().position(|r| &r.run_id == run_id) else {
                return false;
            };
            let Some(next) = f(&current[index]) else {
                return false;
            };
            let mut list: Vec<Run> = current.as_ref().clone();
            list[index] = next.clone();
            *current = Arc::new(list);
            replaced = Some(next);
            true
        });
        replaced
    }

    /// Register a new run. A run whose id is already registered is ignored.
    pub fn start(&self, run: Run) -> bool {
        self.runs.send_if_modified(|current| {
            if current.iter().any(|r| r.run_id == run.run_id) {
                debug!(run_id = %run.run_id, "run already registered");
                return false;
            }
            let mut list: Vec<Run> = current.as_ref().clone();
            list.push(run);
            *current = Arc::new(list);
            true
        })
    }

    /// Append one output line. Unknown runs are ignored.
    pub fn append_log(&self, run_id: &RunId, line: &str) -> bool {
        let appended = self
            .update(run_id, |run| {
                let mut next = run.clone();
                next.log_lines.push(line.to_string());
                Some(next)
            })
            .is_some();
        if !appended {
            debug!(run_id = %run_id, "dropping log line for unknown run");
        }
        appended
    }

    /// Record the first local app URL seen in a run's output.
    pub fn set_local_url(&self, run_id: &RunId, url: &str) -> bool {
        self.update(run_id, |run| {
            if run.local_url.is_some() {
                return None;
            }
            let mut next = run.clone();
            next.local_url = Some(url.to_string());
            Some(next)
        })
        .is_some()
    }

    /// Transition a run to `done`.
    ///
    /// Returns the finished run only on the `running -> done` transition.
    /// Later calls leave the run untouched, including its exit code.
    pub fn mark_done(&self, run_id: &RunId, exit_code: Option<i32>) -> Option<Run> {
        self.update(run_id, |run| {
            if !run.is_running() {
                return None;
            }
            let mut next = run.clone();
            next.status = RunStatus::Done;
            next.done_at = Some(now_ms());
            next.exit_code = exit_code;
            Some(next)
        })
    }

    /// Mark every running run done. Returns the runs that transitioned.
    pub fn mark_all_done(&self) -> Vec<Run> {
        let mut finished = Vec::new();
        self.runs.send_if_modified(|current| {
            if !current.iter().any(Run::is_running) {
                return false;
            }
            let done_at = now_ms();
            let list: Vec<Run> = current
                .iter()
                .map(|run| {
                    if !run.is_running() {
                        return run.clone();
                    }
                    let mut next = run.clone();
                    next.status = RunStatus::Done;
                    next.done_at = Some(done_at);
                    finished.push(next.clone());
                    next
                })
                .collect();
            *current = Arc::new(list);
            true
        });
        finished
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.runs.borrow().clone()
    }

    pub fn get(&self, run_id: &RunId) -> Option<Run> {
        self.runs.borrow().iter().find(|r| &r.run_id == run_id).cloned()
    }

    pub fn running(&self) -> Vec<Run> {
        self.runs.borrow().iter().filter(|r| r.is_running()).cloned().collect()
    }

    pub fn any_running(&self) -> bool {
        self.runs.borrow().iter().any(Run::is_running)
    }

    /// The lowest free slot given the current runs.
    pub fn next_free_slot(&self) -> Option<Slot> {
        super::slots::next_free_slot(self.runs.borrow().iter())
    }

    /// Watch for new snapshots.
    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.runs.subscribe()
    }
}
