//! Routing host events into the registry.
//!
//! One task owns the subscription and applies events one at a time, so
//! lines for a run land in the registry in exactly the order the host
//! delivered them. Aborting the task drops the subscription, which
//! unsubscribes from the host.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::task::JoinHandle;
use tracing::debug;

use super::Completions;
use super::registry::RunRegistry;
use crate::host::{HostEvent, Subscription};

static LOCAL_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://(?:localhost|127\.0\.0\.1)(?::\d+)?(?:/\S*)?").unwrap()
});

/// First `localhost` / `127.0.0.1` URL in a line of output.
pub fn find_local_url(line: &str) -> Option<&str> {
    LOCAL_URL_REGEX.find(line).map(|m| m.as_str())
}

#[derive(Debug, Clone)]
pub struct LogStreamRouter {
    registry: Arc<RunRegistry>,
    completions: Completions,
}

impl LogStreamRouter {
    pub fn new(registry: Arc<RunRegistry>, completions: Completions) -> Self {
        Self {
            registry,
            completions,
        }
    }

    /// Apply one event. Never suspends.
    pub fn route(&self, event: HostEvent) {
        match event {
            HostEvent::Log { run_id, line } => {
                if !self.registry.append_log(&run_id, &line) {
                    return;
                }
                if let Some(url) = find_local_url(&line) {
                    self.registry.set_local_url(&run_id, url);
                }
            }
            HostEvent::Exited { run_id, exit_code } => {
                match self.registry.mark_done(&run_id, exit_code) {
                    Some(run) => self.completions.finish(&run),
                    None => debug!(run_id = %run_id, "exit for unknown or finished run"),
                }
            }
        }
    }

    /// Consume `subscription` on a background task until it closes or the
    /// returned handle is shut down.
    pub fn spawn(self, mut subscription: Subscription) -> RouterHandle {
        let task = tokio::spawn(async move {
            while let Some(raw) = subscription.recv().await {
                match HostEvent::decode(&raw) {
                    Some(event) => self.route(event),
                    None => debug!(event = %raw.event, "ignoring malformed host event"),
                }
            }
            debug!("host event stream closed");
        });
        RouterHandle { task }
    }
}

/// Owns the router task. Dropping it stops routing and releases the
/// subscription.
#[derive(Debug)]
pub struct RouterHandle {
    task: JoinHandle<()>,
}

impl RouterHandle {
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RouterHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
