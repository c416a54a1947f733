// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Event Notification Fan-out
//!
//! [`SimulationObserver`] is a capability set: one optional handler slot per
//! event type, so an observer only supplies the callbacks it cares about.
//! [`ObserverRegistry`] delivers each event synchronously, in registration
//! order, on whichever worker or harness task produced it. Handlers must
//! therefore be safe to call from many threads at once.
//!
//! A panicking handler is caught and logged as an [`ObserverFailure`]; the
//! remaining observers still receive the event and the emitting worker carries
//! on unaffected.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{ClaimResult, Seat, SimulationStats, Snack, StrategyKind, WorkerId};

/// Handle returned by [`ObserverRegistry::register`], used to remove the observer again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub Uuid);

impl ObserverId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot reported by the progress poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub active: usize,
    pub completed: usize,
    pub total: usize,
}

/// Optional handler per event type. Build with the `on_*` methods:
///
/// ```
/// use threadrace_core::SimulationObserver;
///
/// let observer = SimulationObserver::new()
///     .on_claim_failed(|worker| println!("worker {worker} went home empty-handed"));
/// ```
#[derive(Clone, Default)]
pub struct SimulationObserver {
    resource_claimed: Option<Arc<dyn Fn(&Seat, WorkerId) + Send + Sync>>,
    claim_failed: Option<Arc<dyn Fn(WorkerId) + Send + Sync>>,
    collision_detected: Option<Arc<dyn Fn(&Seat) + Send + Sync>>,
    worker_started: Option<Arc<dyn Fn(WorkerId) + Send + Sync>>,
    worker_finished: Option<Arc<dyn Fn(&ClaimResult) + Send + Sync>>,
    run_started: Option<Arc<dyn Fn(StrategyKind, usize) + Send + Sync>>,
    run_completed: Option<Arc<dyn Fn(&SimulationStats) + Send + Sync>>,
    progress: Option<Arc<dyn Fn(Progress) + Send + Sync>>,
    deadlock_detected: Option<Arc<dyn Fn(&Seat, &Snack, WorkerId) + Send + Sync>>,
    pair_complete: Option<Arc<dyn Fn(&Seat, &Snack, WorkerId) + Send + Sync>>,
    worker_stuck: Option<Arc<dyn Fn(WorkerId, Duration) + Send + Sync>>,
}

impl SimulationObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_resource_claimed(mut self, f: impl Fn(&Seat, WorkerId) + Send + Sync + 'static) -> Self {
        self.resource_claimed = Some(Arc::new(f));
        self
    }

    pub fn on_claim_failed(mut self, f: impl Fn(WorkerId) + Send + Sync + 'static) -> Self {
        self.claim_failed = Some(Arc::new(f));
        self
    }

    pub fn on_collision_detected(mut self, f: impl Fn(&Seat) + Send + Sync + 'static) -> Self {
        self.collision_detected = Some(Arc::new(f));
        self
    }

    pub fn on_worker_started(mut self, f: impl Fn(WorkerId) + Send + Sync + 'static) -> Self {
        self.worker_started = Some(Arc::new(f));
        self
    }

    pub fn on_worker_finished(mut self, f: impl Fn(&ClaimResult) + Send + Sync + 'static) -> Self {
        self.worker_finished = Some(Arc::new(f));
        self
    }

    pub fn on_run_started(mut self, f: impl Fn(StrategyKind, usize) + Send + Sync + 'static) -> Self {
        self.run_started = Some(Arc::new(f));
        self
    }

    pub fn on_run_completed(mut self, f: impl Fn(&SimulationStats) + Send + Sync + 'static) -> Self {
        self.run_completed = Some(Arc::new(f));
        self
    }

    pub fn on_progress(mut self, f: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }

    pub fn on_deadlock_detected(
        mut self,
        f: impl Fn(&Seat, &Snack, WorkerId) + Send + Sync + 'static,
    ) -> Self {
        self.deadlock_detected = Some(Arc::new(f));
        self
    }

    pub fn on_pair_complete(
        mut self,
        f: impl Fn(&Seat, &Snack, WorkerId) + Send + Sync + 'static,
    ) -> Self {
        self.pair_complete = Some(Arc::new(f));
        self
    }

    pub fn on_worker_stuck(mut self, f: impl Fn(WorkerId, Duration) + Send + Sync + 'static) -> Self {
        self.worker_stuck = Some(Arc::new(f));
        self
    }

    fn handled_events(&self) -> Vec<&'static str> {
        [
            ("resource_claimed", self.resource_claimed.is_some()),
            ("claim_failed", self.claim_failed.is_some()),
            ("collision_detected", self.collision_detected.is_some()),
            ("worker_started", self.worker_started.is_some()),
            ("worker_finished", self.worker_finished.is_some()),
            ("run_started", self.run_started.is_some()),
            ("run_completed", self.run_completed.is_some()),
            ("progress", self.progress.is_some()),
            ("deadlock_detected", self.deadlock_detected.is_some()),
            ("pair_complete", self.pair_complete.is_some()),
            ("worker_stuck", self.worker_stuck.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

impl fmt::Debug for SimulationObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationObserver")
            .field("handles", &self.handled_events())
            .finish()
    }
}

/// A handler panicked while receiving an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("observer {observer} failed handling {event}: {message}")]
pub struct ObserverFailure {
    pub observer: ObserverId,
    pub event: &'static str,
    pub message: String,
}

/// Registered observers plus the fan-out for every event type.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<(ObserverId, Arc<SimulationObserver>)>>,
    failures: AtomicUsize,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: SimulationObserver) -> ObserverId {
        let id = ObserverId::new();
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` when no observer with `id` was registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Number of handler panics caught since the registry was created.
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    fn dispatch(&self, event: &'static str, deliver: impl Fn(&SimulationObserver)) {
        // Clone the list so handlers never run under the registry lock.
        let observers = self.observers.read().clone();
        for (id, observer) in observers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| deliver(&observer))) {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let failure = ObserverFailure {
                    observer: id,
                    event,
                    message: panic_message(panic.as_ref()),
                };
                warn!(observer_id = %id, event, "{}", failure);
            }
        }
    }

    pub fn resource_claimed(&self, seat: &Seat, worker: WorkerId) {
        self.dispatch("resource_claimed", |o| {
            if let Some(handler) = &o.resource_claimed {
                handler(seat, worker)
            }
        });
    }

    pub fn claim_failed(&self, worker: WorkerId) {
        self.dispatch("claim_failed", |o| {
            if let Some(handler) = &o.claim_failed {
                handler(worker)
            }
        });
    }

    pub fn collision_detected(&self, seat: &Seat) {
        self.dispatch("collision_detected", |o| {
            if let Some(handler) = &o.collision_detected {
                handler(seat)
            }
        });
    }

    pub fn worker_started(&self, worker: WorkerId) {
        self.dispatch("worker_started", |o| {
            if let Some(handler) = &o.worker_started {
                handler(worker)
            }
        });
    }

    pub fn worker_finished(&self, result: &ClaimResult) {
        self.dispatch("worker_finished", |o| {
            if let Some(handler) = &o.worker_finished {
                handler(result)
            }
        });
    }

    pub fn run_started(&self, strategy: StrategyKind, total_workers: usize) {
        self.dispatch("run_started", |o| {
            if let Some(handler) = &o.run_started {
                handler(strategy, total_workers)
            }
        });
    }

    pub fn run_completed(&self, stats: &SimulationStats) {
        self.dispatch("run_completed", |o| {
            if let Some(handler) = &o.run_completed {
                handler(stats)
            }
        });
    }

    pub fn progress(&self, progress: Progress) {
        self.dispatch("progress", |o| {
            if let Some(handler) = &o.progress {
                handler(progress)
            }
        });
    }

    pub fn deadlock_detected(&self, seat: &Seat, snack: &Snack, worker: WorkerId) {
        self.dispatch("deadlock_detected", |o| {
            if let Some(handler) = &o.deadlock_detected {
                handler(seat, snack, worker)
            }
        });
    }

    pub fn pair_complete(&self, seat: &Seat, snack: &Snack, worker: WorkerId) {
        self.dispatch("pair_complete", |o| {
            if let Some(handler) = &o.pair_complete {
                handler(seat, snack, worker)
            }
        });
    }

    pub fn worker_stuck(&self, worker: WorkerId, waited: Duration) {
        self.dispatch("worker_stuck", |o| {
            if let Some(handler) = &o.worker_stuck {
                handler(worker, waited)
            }
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
