//! In-process host double for unit tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::{EventHub, ProcessHost, RawHostEvent, RunScriptArgs, Subscription};
use crate::errors::HostError;
use crate::run::types::RunId;

#[derive(Debug, Default)]
pub(crate) struct FakeHost {
    pub hub: EventHub,
    pub calls: Mutex<Vec<String>>,
    pub scripts: Mutex<Vec<RunScriptArgs>>,
    pub fail_run: AtomicBool,
    pub fail_stop: AtomicBool,
    next_id: AtomicU64,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn emit(&self, event: RawHostEvent) {
        self.hub.publish(event);
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn stop_result(&self) -> Result<(), HostError> {
        if self.fail_stop.load(Ordering::SeqCst) {
            Err(HostError::Transport("process not found".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProcessHost for FakeHost {
    async fn run_script(&self, args: &RunScriptArgs) -> Result<RunId, HostError> {
        self.record(format!("run_script:{}", args.run_label.as_deref().unwrap_or("")));
        if self.fail_run.load(Ordering::SeqCst) {
            return Err(HostError::Transport("spawn failed".into()));
        }
        self.scripts.lock().unwrap().push(args.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RunId::new(format!("run-{n}")))
    }

    async fn stop_script(&self) -> Result<(), HostError> {
        self.record("stop_script".into());
        self.stop_result()
    }

    async fn stop_run(&self, run_id: &RunId) -> Result<(), HostError> {
        self.record(format!("stop_run:{run_id}"));
        self.stop_result()
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }
}
