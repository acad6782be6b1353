//! Orchestration session.
//!
//! An [`Orchestrator`] owns everything a session needs: the host
//! subscription (through the router task), the registry, the controller,
//! the history and the feature queue. Creating it subscribes to host
//! events; [`Orchestrator::shutdown`] or dropping it releases the
//! subscription on every path.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::RunError;
use crate::history::{DEFAULT_MAX_ENTRIES, RunHistory};
use crate::host::ProcessHost;
use crate::run::{
    Completions, FeatureQueue, LogStreamRouter, RouterHandle, Run, RunController, RunId,
    RunRegistry, RunSnapshot, StartParams, Timing,
};

/// Session settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Timing forwarded with queue-started runs.
    pub timing: Timing,
    /// Projects used for queued features that name none.
    pub active_projects: Vec<String>,
    pub history_max_entries: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            active_projects: Vec::new(),
            history_max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_active_projects(mut self, projects: Vec<String>) -> Self {
        self.active_projects = projects;
        self
    }

    pub fn with_history_max_entries(mut self, max: usize) -> Self {
        self.history_max_entries = max;
        self
    }
}

#[derive(Debug)]
struct QueueSettings {
    timing: Timing,
    active_projects: Vec<String>,
}

pub struct Orchestrator {
    host: Arc<dyn ProcessHost>,
    registry: Arc<RunRegistry>,
    history: Arc<RunHistory>,
    controller: Arc<RunController>,
    queue: Arc<FeatureQueue>,
    settings: Arc<QueueSettings>,
    router: Option<RouterHandle>,
    queue_task: Option<JoinHandle<()>>,
}

impl Orchestrator {
    /// Subscribe to `host` and start routing its events. Must be called
    /// inside a Tokio runtime.
    pub fn new(host: Arc<dyn ProcessHost>, config: OrchestratorConfig) -> Self {
        let registry = Arc::new(RunRegistry::new());
        let history = Arc::new(RunHistory::new(config.history_max_entries));
        let completions = Completions::new(history.clone());
        let controller = Arc::new(RunController::new(
            host.clone(),
            registry.clone(),
            completions.clone(),
        ));
        let queue = Arc::new(FeatureQueue::new());
        let settings = Arc::new(QueueSettings {
            timing: config.timing,
            active_projects: config.active_projects,
        });

        let router =
            LogStreamRouter::new(registry.clone(), completions.clone()).spawn(host.subscribe());
        let queue_task = tokio::spawn(advance_queue(
            completions.subscribe(),
            queue.clone(),
            controller.clone(),
            settings.clone(),
        ));
        debug!("orchestrator started");

        Self {
            host,
            registry,
            history,
            controller,
            queue,
            settings,
            router: Some(router),
            queue_task: Some(queue_task),
        }
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    pub fn history(&self) -> &Arc<RunHistory> {
        &self.history
    }

    pub fn controller(&self) -> &Arc<RunController> {
        &self.controller
    }

    pub fn queue(&self) -> &Arc<FeatureQueue> {
        &self.queue
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.registry.snapshot()
    }

    pub fn subscribe_runs(&self) -> watch::Receiver<RunSnapshot> {
        self.registry.subscribe()
    }

    /// Runs as they finish.
    pub fn subscribe_completions(&self) -> broadcast::Receiver<Run> {
        self.controller.completions().subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.router.is_some()
    }

    pub async fn start(&self, params: StartParams) -> Result<RunId, RunError> {
        self.controller.start(params).await
    }

    pub async fn stop(&self, run_id: &RunId) -> Result<(), RunError> {
        self.controller.stop(run_id).await
    }

    pub async fn stop_all(&self) -> Result<(), RunError> {
        self.controller.stop_all().await
    }

    /// Start the head of the feature queue.
    pub async fn run_queue(&self) -> Result<Option<RunId>, RunError> {
        self.queue
            .run_queue(
                &self.controller,
                &self.settings.active_projects,
                self.settings.timing,
            )
            .await
    }

    /// Clear the queue, ask the host to stop its scripts, and release the
    /// event subscription. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        let Some(router) = self.router.take() else {
            return;
        };
        self.queue.clear();
        if let Some(task) = self.queue_task.take() {
            task.abort();
        }
        if let Err(e) = self.host.stop_script().await {
            warn!(error = %e, "stop_script failed during shutdown");
        }
        router.shutdown();
        info!("orchestrator shut down");
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Some(task) = self.queue_task.take() {
            task.abort();
        }
        // RouterHandle aborts its task, dropping the subscription.
        self.router.take();
    }
}

async fn advance_queue(
    mut completions: broadcast::Receiver<Run>,
    queue: Arc<FeatureQueue>,
    controller: Arc<RunController>,
    settings: Arc<QueueSettings>,
) {
    loop {
        let run = match completions.recv().await {
            Ok(run) => run,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "queue missed run completions");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        queue
            .on_run_exited(
                &run.run_id,
                &controller,
                &settings.active_projects,
                settings.timing,
            )
            .await;
    }
}
