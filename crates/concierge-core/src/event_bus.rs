//! Simple event bus for decoupled observation of the guarded executor.
//!
//! The bus is shared across request tasks, so the queue sits behind a
//! `std::sync::Mutex`. Events are buffered until a subscriber drains them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use concierge_types::event::TurnEvent;

/// Upper bound on buffered events; the oldest are dropped first.
const MAX_BUFFERED: usize = 1024;

/// Shared event bus, clone-cheap via Arc.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<VecDeque<TurnEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<TurnEvent>> {
        // A panic while holding the lock cannot leave the queue inconsistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish an event. Called by the executor.
    pub fn emit(&self, event: TurnEvent) {
        let mut queue = self.queue();
        if queue.len() == MAX_BUFFERED {
            queue.pop_front();
        }
        queue.push_back(event);
    }

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<TurnEvent> {
        self.queue().drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.queue().is_empty()
    }
}
