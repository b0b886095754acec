//! Debounced validation trigger.
//!
//! Coalesces bursts of rapid input changes into one downstream call per
//! quiet period. Modeled as an explicit state machine per scheduled
//! operation (idle -> pending -> fired | cancelled) with one generation per
//! scheduling: a newer schedule, a flush, or a cancel makes every older
//! pending timer a no-op when it wakes.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Where the current scheduling generation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    /// Nothing scheduled
    Idle,
    /// A timer is pending for the latest generation
    Pending,
    /// The latest generation ran
    Fired,
    /// The latest generation was cancelled before firing
    Cancelled,
}

#[derive(Debug)]
struct Shared {
    generation: u64,
    phase: DebouncePhase,
}

/// Coalesces calls: only the latest [`schedule`](Debouncer::schedule) within
/// the quiet period actually runs.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                phase: DebouncePhase::Idle,
            })),
        }
    }

    pub fn phase(&self) -> DebouncePhase {
        self.shared.lock().unwrap().phase
    }

    /// Schedule `action` to run after the quiet period. Any previously
    /// pending schedule is superseded.
    pub fn schedule<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = {
            let mut shared = self.shared.lock().unwrap();
            shared.generation += 1;
            shared.phase = DebouncePhase::Pending;
            shared.generation
        };

        let shared = Arc::clone(&self.shared);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let should_run = {
                let mut shared = shared.lock().unwrap();
                if shared.generation == generation && shared.phase == DebouncePhase::Pending {
                    shared.phase = DebouncePhase::Fired;
                    true
                } else {
                    // a newer schedule, flush, or cancel superseded us
                    false
                }
            };
            if should_run {
                action().await;
            } else {
                debug!(generation, "debounced timer woke stale; skipping");
            }
        });
    }

    /// The manual "validate now" path: supersede any pending timer and run
    /// `action` immediately.
    pub async fn flush<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        {
            let mut shared = self.shared.lock().unwrap();
            shared.generation += 1;
            shared.phase = DebouncePhase::Fired;
        }
        action().await;
    }

    /// Cancel a pending schedule without running it.
    pub fn cancel(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.generation += 1;
        if shared.phase == DebouncePhase::Pending {
            shared.phase = DebouncePhase::Cancelled;
        }
    }
}
