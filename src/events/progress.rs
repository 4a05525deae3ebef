//! Live progress fan-out
//!
//! One shared `ProgressState` behind a mutex plus a list of listeners, each
//! with its own unbounded crossbeam queue. Every update is applied and sent
//! while the state lock is held, so each listener sees updates in the order
//! they were applied, even with concurrent writers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

pub type ListenerId = u64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub phase: String,
    pub message: String,
    /// In `[0, 100]`.
    pub percent: f64,
    pub completed_steps: u64,
    pub total_steps: u64,
}

struct Listener {
    id: ListenerId,
    tx: Sender<ProgressState>,
}

#[derive(Default)]
pub struct ProgressBroadcaster {
    state: Mutex<ProgressState>,
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

// a panicked writer leaves the state readable; progress is advisory
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total_steps(self, total: u64) -> Self {
        lock(&self.state).total_steps = total;
        self
    }

    /// New listener queue. Updates published before subscribing are not
    /// replayed; call `snapshot()` for the current state.
    pub fn subscribe(&self) -> (ListenerId, Receiver<ProgressState>) {
        let (tx, rx) = unbounded();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push(Listener { id, tx });
        (id, rx)
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub fn update(&self, phase: &str, message: &str, percent: f64) {
        let mut state = lock(&self.state);
        state.phase = phase.to_string();
        state.message = message.to_string();
        state.percent = percent.clamp(0.0, 100.0);
        self.broadcast(&state);
    }

    /// Marks one more step complete and returns the new count.
    pub fn advance(&self) -> u64 {
        let mut state = lock(&self.state);
        state.completed_steps += 1;
        if state.total_steps > 0 {
            state.percent = (state.completed_steps as f64 / state.total_steps as f64 * 100.0).min(100.0);
        }
        self.broadcast(&state);
        state.completed_steps
    }

    pub fn snapshot(&self) -> ProgressState {
        lock(&self.state).clone()
    }

    fn broadcast(&self, state: &ProgressState) {
        // dropped receivers unsubscribe themselves
        lock(&self.listeners).retain(|l| l.tx.send(state.clone()).is_ok());
    }
}
