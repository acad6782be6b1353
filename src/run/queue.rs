//! Feature queue: features started one after another, each as its own run.
//!
//! Only the head of the queue is ever running. When the run started for
//! the head exits, the head is popped and the next feature is started.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::controller::RunController;
use super::types::{RunId, StartParams, Timing};
use crate::errors::RunError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub prompt_ids: Vec<u32>,
    #[serde(default)]
    pub project_paths: Vec<String>,
}

impl QueueItem {
    /// Start parameters for this feature, falling back to `fallback_projects`
    /// when it names none.
    fn start_params(
        &self,
        fallback_projects: &[String],
        timing: Timing,
    ) -> Result<StartParams, RunError> {
        let projects = if self.project_paths.is_empty() {
            fallback_projects.to_vec()
        } else {
            self.project_paths.clone()
        };
        if projects.is_empty() {
            return Err(RunError::Validation(
                "Select at least one project (or set projects on the feature)".to_string(),
            ));
        }
        if self.prompt_ids.is_empty() {
            return Err(RunError::Validation(format!(
                "Feature \"{}\" has no prompts",
                self.title
            )));
        }
        Ok(StartParams::new(self.prompt_ids.clone(), projects)
            .with_timing(timing)
            .with_label(self.title.clone()))
    }
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<QueueItem>,
    /// Run started for the head item.
    tracked: Option<RunId>,
}

#[derive(Debug, Default)]
pub struct FeatureQueue {
    state: Mutex<QueueState>,
}

impl FeatureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a feature. Returns false if one with the same id is queued.
    pub fn add(&self, item: QueueItem) -> bool {
        let mut state = self.lock();
        if state.items.iter().any(|i| i.id == item.id) {
            return false;
        }
        state.items.push_back(item);
        true
    }

    /// Remove a feature. Removing the head forgets its tracked run.
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.lock();
        let was_head = state.items.front().is_some_and(|i| i.id == id);
        let before = state.items.len();
        state.items.retain(|i| i.id != id);
        if was_head {
            state.tracked = None;
        }
        state.items.len() != before
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.items.clear();
        state.tracked = None;
    }

    pub fn items(&self) -> Vec<QueueItem> {
        self.lock().items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn tracked_run(&self) -> Option<RunId> {
        self.lock().tracked.clone()
    }

    /// Start the head feature. Refuses while any run is still running.
    ///
    /// Returns `Ok(None)` when the queue is empty.
    pub async fn run_queue(
        &self,
        controller: &RunController,
        fallback_projects: &[String],
        timing: Timing,
    ) -> Result<Option<RunId>, RunError> {
        let head = self.lock().items.front().cloned();
        let Some(head) = head else {
            return Ok(None);
        };
        if controller.registry().any_running() {
            return Err(RunError::Validation("A run is already in progress".to_string()));
        }
        let params = head.start_params(fallback_projects, timing)?;
        let run_id = controller.start(params).await?;
        info!(feature = %head.id, run_id = %run_id, "queue started feature");
        self.lock().tracked = Some(run_id.clone());
        Ok(Some(run_id))
    }

    /// Advance after `exited` finished. Only the tracked run advances the
    /// queue; the next feature is started if it is runnable.
    pub async fn on_run_exited(
        &self,
        exited: &RunId,
        controller: &RunController,
        fallback_projects: &[String],
        timing: Timing,
    ) -> Option<RunId> {
        let next = {
            let mut state = self.lock();
            if state.tracked.as_ref() != Some(exited) {
                return None;
            }
            state.tracked = None;
            state.items.pop_front();
            state.items.front().cloned()?
        };

        let params = match next.start_params(fallback_projects, timing) {
            Ok(params) => params,
            Err(e) => {
                warn!(feature = %next.id, error = %e, "queue stopped at feature");
                return None;
            }
        };
        match controller.start(params).await {
            Ok(run_id) => {
                info!(feature = %next.id, run_id = %run_id, "queue started next feature");
                self.lock().tracked = Some(run_id.clone());
                Some(run_id)
            }
            Err(e) => {
                warn!(feature = %next.id, error = %e, "queue failed to start next feature");
                None
            }
        }
    }
}
