//! Run orchestration core.
//!
//! | Module         | Role                                                     |
//! |----------------|----------------------------------------------------------|
//! | `types`        | `Run`, `RunId`, `Slot`, `Timing`, `StartParams`           |
//! | `slots`        | label classification and slot allocation                 |
//! | `registry`     | the run list, replaced wholesale on every mutation       |
//! | `router`       | host `log`/`exited` events into registry mutations       |
//! | `controller`   | start/stop requests against the process host             |
//! | `queue`        | feature queue started one item at a time                 |
//!
//! Every `running -> done` transition, whichever component causes it, goes
//! through [`Completions::finish`] so it is archived and announced once.

pub mod controller;
pub mod queue;
pub mod registry;
pub mod router;
pub mod slots;
pub mod types;

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use crate::history::{RunHistory, completion_notice};

pub use controller::RunController;
pub use queue::{FeatureQueue, QueueItem};
pub use registry::{RunRegistry, RunSnapshot};
pub use router::{LogStreamRouter, RouterHandle};
pub use slots::{RunClass, SlotBearing, classify, next_free_slot};
pub use types::{Run, RunId, RunStatus, Slot, StartParams, Timing};

const COMPLETION_CHANNEL_CAPACITY: usize = 256;

/// Archives finished runs and broadcasts them to listeners.
#[derive(Debug, Clone)]
pub struct Completions {
    history: Arc<RunHistory>,
    tx: broadcast::Sender<Run>,
}

impl Completions {
    pub fn new(history: Arc<RunHistory>) -> Self {
        let (tx, _) = broadcast::channel(COMPLETION_CHANNEL_CAPACITY);
        Self { history, tx }
    }

    /// Record a run that just transitioned to `done`.
    pub fn finish(&self, run: &Run) {
        self.history.record_run(run);
        info!(
            run_id = %run.run_id,
            exit_code = ?run.exit_code,
            "{}",
            completion_notice(&run.label, run.exit_code)
        );
        // No receivers is fine.
        let _ = self.tx.send(run.clone());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Run> {
        self.tx.subscribe()
    }

    pub fn history(&self) -> &Arc<RunHistory> {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finish_archives_and_broadcasts() {
        let history = Arc::new(RunHistory::new(10));
        let completions = Completions::new(history.clone());
        let mut rx = completions.subscribe();

        let mut run = Run::started(RunId::new("r"), "Manual run", None, 0);
        run.status = RunStatus::Done;
        run.done_at = Some(10);
        completions.finish(&run);

        assert_eq!(rx.recv().await.unwrap().run_id, RunId::new("r"));
        assert_eq!(history.snapshot()[0].duration_ms, Some(10));
    }
}
