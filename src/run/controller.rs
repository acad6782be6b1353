//! Starting and stopping runs.
//!
//! The controller is the only component that calls the process host. A
//! start is validated and given a slot before the host is asked for
//! anything, and the run is registered only after the host returns its id.
//! Stops are optimistic: the run is marked done locally first and the host
//! call is reported but never rolls that back.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::Completions;
use super::registry::RunRegistry;
use super::slots::classify;
use super::types::{DEFAULT_RUN_LABEL, Run, RunId, StartParams, now_ms};
use crate::errors::RunError;
use crate::host::{ProcessHost, RunScriptArgs};

/// Label a run is registered and classified under: the caller's label as
/// given, or the default when it is absent or blank.
pub fn effective_label(run_label: Option<&str>) -> String {
    run_label
        .filter(|label| !label.trim().is_empty())
        .unwrap_or(DEFAULT_RUN_LABEL)
        .to_string()
}

fn validate(params: &StartParams) -> Result<(), RunError> {
    if params.prompt_ids.is_empty() {
        return Err(RunError::Validation("Select at least one prompt".to_string()));
    }
    if params.active_projects.is_empty() {
        return Err(RunError::Validation("Select at least one project".to_string()));
    }
    Ok(())
}

pub struct RunController {
    host: Arc<dyn ProcessHost>,
    registry: Arc<RunRegistry>,
    completions: Completions,
    /// Held from slot selection through registration so two starts cannot
    /// claim the same slot.
    start_lock: Mutex<()>,
}

impl RunController {
    pub fn new(
        host: Arc<dyn ProcessHost>,
        registry: Arc<RunRegistry>,
        completions: Completions,
    ) -> Self {
        Self {
            host,
            registry,
            completions,
            start_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    pub fn completions(&self) -> &Completions {
        &self.completions
    }

    /// Start a run and register it once the host has assigned an id.
    pub async fn start(&self, params: StartParams) -> Result<RunId, RunError> {
        validate(&params)?;
        let label = effective_label(params.run_label.as_deref());

        let _guard = self.start_lock.lock().await;

        let slot = if classify(&label).is_slot_bearing() {
            match self.registry.next_free_slot() {
                Some(slot) => Some(slot),
                None => {
                    warn!(label = %label, "no free terminal slot");
                    return Err(RunError::Scheduling { label });
                }
            }
        } else {
            None
        };

        let args = RunScriptArgs {
            prompt_ids: params.prompt_ids,
            active_projects: params.active_projects,
            timing: params.timing,
            run_label: params.run_label,
        };
        let run_id = self.host.run_script(&args).await.map_err(|e| {
            warn!(label = %label, error = %e, "host failed to start run");
            RunError::Transport(e.to_string())
        })?;

        info!(run_id = %run_id, label = %label, slot = ?slot, "run started");
        self.registry.start(Run::started(run_id.clone(), label, slot, now_ms()));
        Ok(run_id)
    }

    /// Stop one run. It is marked done even if the host call fails.
    pub async fn stop(&self, run_id: &RunId) -> Result<(), RunError> {
        if let Some(run) = self.registry.mark_done(run_id, None) {
            self.completions.finish(&run);
        }
        info!(run_id = %run_id, "stop requested");
        self.host.stop_run(run_id).await.map_err(|e| {
            warn!(run_id = %run_id, error = %e, "host failed to stop run");
            RunError::HostStop(e.to_string())
        })
    }

    /// Mark every running run done and ask the host to stop everything.
    pub async fn stop_all(&self) -> Result<(), RunError> {
        let finished = self.registry.mark_all_done();
        for run in &finished {
            self.completions.finish(run);
        }
        info!(count = finished.len(), "stop all requested");
        self.host.stop_script().await.map_err(|e| {
            warn!(error = %e, "host failed to stop scripts");
            RunError::HostStop(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::RunHistory;
    use crate::host::testing::FakeHost;
    use crate::run::types::{RunStatus, Slot};
    use std::sync::atomic::Ordering;

    fn setup() -> (Arc<FakeHost>, Arc<RunHistory>, RunController) {
        let host = Arc::new(FakeHost::new());
        let history = Arc::new(RunHistory::new(10));
        let controller = RunController::new(
            host.clone(),
            Arc::new(RunRegistry::new()),
            Completions::new(history.clone()),
        );
        (host, history, controller)
    }

    fn params(label: Option<&str>) -> StartParams {
        let params = StartParams::new(vec![1], vec!["/work/app".into()]);
        match label {
            Some(label) => params.with_label(label),
            None => params,
        }
    }

    #[test]
    fn test_effective_label() {
        assert_eq!(effective_label(None), "Manual run");
        assert_eq!(effective_label(Some("  ")), "Manual run");
        assert_eq!(effective_label(Some("Debug: x ")), "Debug: x ");
        assert_eq!(effective_label(Some(" Ticket #1: x")), " Ticket #1: x");
    }

    #[tokio::test]
    async fn test_label_is_classified_as_given() {
        let (host, _, controller) = setup();
        let id = controller.start(params(Some(" Ticket #1: x"))).await.unwrap();

        let run = controller.registry().get(&id).unwrap();
        assert_eq!(run.label, " Ticket #1: x");
        assert_eq!(run.slot, None);
        assert_eq!(host.scripts.lock().unwrap()[0].run_label.as_deref(), Some(" Ticket #1: x"));
    }

    #[tokio::test]
    async fn test_validation_happens_before_host_call() {
        let (host, _, controller) = setup();

        let no_prompts = StartParams::new(vec![], vec!["/p".into()]);
        let err = controller.start(no_prompts).await.unwrap_err();
        assert!(matches!(err, RunError::Validation(ref m) if m.contains("prompt")));

        let no_projects = StartParams::new(vec![1], vec![]);
        let err = controller.start(no_projects).await.unwrap_err();
        assert!(matches!(err, RunError::Validation(ref m) if m.contains("project")));

        assert!(host.calls().is_empty());
        assert!(controller.registry().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_start_registers_run_after_host_ack() {
        let (host, _, controller) = setup();
        let run_id = controller.start(params(Some("Implement All"))).await.unwrap();

        let run = controller.registry().get(&run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.label, "Implement All");
        assert_eq!(run.slot, Slot::new(1));
        assert_eq!(host.calls(), ["run_script:Implement All"]);
        assert_eq!(host.scripts.lock().unwrap()[0].prompt_ids, [1]);
    }

    #[tokio::test]
    async fn test_background_runs_take_no_slot() {
        let (_, _, controller) = setup();
        for _ in 0..5 {
            let id = controller.start(params(None)).await.unwrap();
            let run = controller.registry().get(&id).unwrap();
            assert_eq!(run.slot, None);
            assert_eq!(run.label, "Manual run");
        }
    }

    #[tokio::test]
    async fn test_transport_error_leaves_no_run() {
        let (host, _, controller) = setup();
        host.fail_run.store(true, Ordering::SeqCst);

        let err = controller.start(params(Some("Implement All"))).await.unwrap_err();
        assert!(matches!(err, RunError::Transport(ref m) if m.contains("spawn failed")));
        assert!(controller.registry().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_scheduling_error_when_slots_full() {
        let (host, _, controller) = setup();
        for label in ["Implement All", "Ticket #1: a", "Analyze: ideas"] {
            controller.start(params(Some(label))).await.unwrap();
        }

        let err = controller.start(params(Some("Debug: x"))).await.unwrap_err();
        assert!(matches!(err, RunError::Scheduling { ref label } if label == "Debug: x"));
        assert_eq!(host.calls().len(), 3);

        // Background runs are unaffected by full slots.
        assert!(controller.start(params(None)).await.is_ok());
    }

    #[tokio::test]
    async fn test_freed_slot_is_reused_lowest_first() {
        let (_, _, controller) = setup();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(controller.start(params(Some("Implement All"))).await.unwrap());
        }
        controller.stop(&ids[1]).await.unwrap();

        let next = controller.start(params(Some("Fast dev: tweak"))).await.unwrap();
        assert_eq!(controller.registry().get(&next).unwrap().slot, Slot::new(2));
    }

    #[tokio::test]
    async fn test_stop_marks_done_even_when_host_fails() {
        let (host, history, controller) = setup();
        let id = controller.start(params(None)).await.unwrap();
        host.fail_stop.store(true, Ordering::SeqCst);

        let err = controller.stop(&id).await.unwrap_err();
        assert!(matches!(err, RunError::HostStop(_)));

        let run = controller.registry().get(&id).unwrap();
        assert_eq!(run.status, RunStatus::Done);
        assert!(run.done_at.is_some());
        assert_eq!(history.len(), 1);
        assert!(host.calls().contains(&format!("stop_run:{id}")));
    }

    #[tokio::test]
    async fn test_stop_all_marks_every_running_run_done() {
        let (host, history, controller) = setup();
        let a = controller.start(params(Some("Implement All"))).await.unwrap();
        let b = controller.start(params(None)).await.unwrap();
        controller.registry().mark_done(&a, Some(0));
        host.fail_stop.store(true, Ordering::SeqCst);

        assert!(controller.stop_all().await.is_err());
        assert!(!controller.registry().any_running());
        assert_eq!(controller.registry().get(&a).unwrap().exit_code, Some(0));
        assert_eq!(controller.registry().get(&b).unwrap().status, RunStatus::Done);
        // Only b transitioned here; a was marked done directly on the registry.
        assert_eq!(history.len(), 1);
        assert_eq!(host.calls().last().map(String::as_str), Some("stop_script"));
    }

    #[tokio::test]
    async fn test_concurrent_starts_never_share_a_slot() {
        let (_, _, controller) = setup();
        let controller = Arc::new(controller);
        let mut handles = Vec::new();
        for _ in 0..5 {
            let c = controller.clone();
            handles.push(tokio::spawn(async move {
                c.start(params(Some("Implement All"))).await
            }));
        }
        let mut ok = 0;
        let mut scheduling = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(RunError::Scheduling { .. }) => scheduling += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((ok, scheduling), (3, 2));

        let mut slots: Vec<_> = controller
            .registry()
            .running()
            .iter()
            .filter_map(|r| r.slot)
            .collect();
        slots.sort();
        assert_eq!(slots, Slot::ALL.to_vec());
    }
}
