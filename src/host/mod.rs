//! Boundary with the external process host.
//!
//! The host spawns and kills the agent processes. This crate only talks to
//! it through [`ProcessHost`]: three request/response commands plus a push
//! subscription delivering `script-log` and `script-exited` events.
//!
//! | Command        | Arguments                                         | Result     |
//! |----------------|---------------------------------------------------|------------|
//! | `run_script`   | `promptIds, activeProjects, timing, runLabel`     | `{run_id}` |
//! | `stop_script`  | none                                              | none       |
//! | `stop_run`     | `run_id`                                          | none       |
//!
//! Event payloads are decoded field by field so a malformed field never
//! takes the whole stream down.

pub mod hub;
pub mod http;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::errors::HostError;
use crate::run::types::{RunId, Timing};

pub use http::HttpHost;
pub use hub::EventHub;

pub const SCRIPT_LOG_EVENT: &str = "script-log";
pub const SCRIPT_EXITED_EVENT: &str = "script-exited";

/// Arguments of the `run_script` command, serialized the way the host expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunScriptArgs {
    pub prompt_ids: Vec<u32>,
    pub active_projects: Vec<String>,
    pub timing: Timing,
    #[serde(default)]
    pub run_label: Option<String>,
}

/// An event as the host pushes it: a name and an untyped payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHostEvent {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl RawHostEvent {
    pub fn log(run_id: &RunId, line: &str) -> Self {
        Self {
            event: SCRIPT_LOG_EVENT.to_string(),
            payload: json!({ "run_id": run_id.as_str(), "line": line }),
        }
    }

    pub fn exited(run_id: &RunId, exit_code: Option<i32>) -> Self {
        let mut payload = json!({ "run_id": run_id.as_str() });
        if let Some(code) = exit_code {
            payload["exit_code"] = json!(code);
        }
        Self {
            event: SCRIPT_EXITED_EVENT.to_string(),
            payload,
        }
    }
}

/// A decoded host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Log { run_id: RunId, line: String },
    Exited { run_id: RunId, exit_code: Option<i32> },
}

impl HostEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            HostEvent::Log { run_id, .. } | HostEvent::Exited { run_id, .. } => run_id,
        }
    }

    /// Decode a raw event. Unknown event names, a missing or non-string
    /// `run_id`, and log events without a string `line` yield `None`. A
    /// missing or non-integer exit code decodes as absent.
    pub fn decode(raw: &RawHostEvent) -> Option<Self> {
        let run_id = raw.payload.get("run_id").and_then(Value::as_str)?;
        let run_id = RunId::new(run_id);
        match raw.event.as_str() {
            SCRIPT_LOG_EVENT => {
                let line = raw.payload.get("line").and_then(Value::as_str)?;
                Some(HostEvent::Log {
                    run_id,
                    line: line.to_string(),
                })
            }
            SCRIPT_EXITED_EVENT => {
                let exit_code = ["exit_code", "exitCode"]
                    .iter()
                    .find_map(|key| raw.payload.get(*key).and_then(Value::as_i64))
                    .and_then(|code| i32::try_from(code).ok());
                Some(HostEvent::Exited { run_id, exit_code })
            }
            _ => None,
        }
    }
}

/// A live event subscription.
///
/// Dropping the subscription unsubscribes; [`Subscription::unsubscribe`]
/// does it early. Either way it happens exactly once.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<RawHostEvent>,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(
        events: mpsc::UnboundedReceiver<RawHostEvent>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            events,
            release: Some(Box::new(release)),
        }
    }

    /// Next event in delivery order, or `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<RawHostEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        self.events.close();
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A process host: something that can start and stop agent scripts and
/// push their output back.
#[async_trait]
pub trait ProcessHost: Send + Sync {
    /// Start a script. Resolves once the host has assigned a run id.
    async fn run_script(&self, args: &RunScriptArgs) -> Result<RunId, HostError>;

    /// Stop every script the host is running.
    async fn stop_script(&self) -> Result<(), HostError>;

    /// Stop one run.
    async fn stop_run(&self, run_id: &RunId) -> Result<(), HostError>;

    /// Subscribe to `script-log` and `script-exited` events.
    fn subscribe(&self) -> Subscription;
}
