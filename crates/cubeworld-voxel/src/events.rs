//! World-level notifications fanned out to independent subsystems.
//!
//! UI panels and other consumers call [`EventBus::subscribe`] once and poll
//! their receiver each frame. Subscribers whose receiver was dropped are
//! pruned on the next dispatch.

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Broadcast to every subscriber.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorldEvent {
    /// The world was replaced wholesale (e.g. a save finished loading).
    /// Consumers should drop cached state and resynchronise.
    Reset {
        /// Seed of the world now in memory.
        seed: u64,
    },
}

/// Fan-out channel for [`WorldEvent`]s.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<WorldEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&mut self) -> Receiver<WorldEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `event` to every live subscriber and returns how many received it.
    pub fn dispatch(&mut self, event: WorldEvent) -> usize {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        tracing::debug!(?event, delivered = self.subscribers.len(), "world event dispatched");
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
