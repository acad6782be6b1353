//! Fan-out of host events to subscribers.
//!
//! Each subscriber gets its own unbounded channel so events are never
//! dropped for a slow reader and per-run order is exactly publish order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use super::{RawHostEvent, Subscription};

#[derive(Debug, Default)]
struct HubState {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<RawHostEvent>>,
}

/// In-process event bus for hosts that push events from the same process.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    state: Arc<Mutex<HubState>>,
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.insert(id, tx);
            id
        };
        let state = Arc::clone(&self.state);
        Subscription::new(rx, move || {
            lock(&state).subscribers.remove(&id);
        })
    }

    /// Deliver an event to every live subscriber. Returns how many received it.
    pub fn publish(&self, event: RawHostEvent) -> usize {
        let mut state = lock(&self.state);
        state
            .subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
        state.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }
}
