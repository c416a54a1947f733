// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Worker Harness - spawns, tracks, cancels and joins the worker population
//!
//! One tokio task per worker, each running a single strategy invocation.
//! A background poller reports the active/completed counters at a fixed
//! interval until the run is joined.
//!
//! # Cancellation
//!
//! Every `prepare()` derives a fresh child of the simulation's root token, so
//! `cancel_all()` stops the current population without poisoning later runs,
//! while cancelling the root stops any run in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::observer::{ObserverRegistry, Progress};
use crate::application::strategy::BookingStrategy;
use crate::application::worker::WorkerContext;
use crate::domain::{ClaimError, ClaimResult, SimulationConfig, SimulationError, Venue, WorkerId};

/// Decrements the active counter when a worker task ends, panics included.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>, completed: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            active: active.clone(),
            completed: completed.clone(),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Periodic progress reporter, stopped and joined before statistics are read.
struct ProgressPoller {
    shutdown_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ProgressPoller {
    fn start(
        period: Duration,
        total: usize,
        active: Arc<AtomicUsize>,
        completed: Arc<AtomicUsize>,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        let shutdown_token = CancellationToken::new();
        let token = shutdown_token.clone();
        let handle = tokio::spawn(async move {
            let mut tick = interval(period.max(Duration::from_millis(1)));
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let progress = Progress {
                            active: active.load(Ordering::SeqCst),
                            completed: completed.load(Ordering::SeqCst),
                            total,
                        };
                        debug!(active = progress.active, completed = progress.completed, total, "progress");
                        observers.progress(progress);
                    }
                    _ = token.cancelled() => break,
                }
            }
        });

        Self {
            shutdown_token,
            handle,
        }
    }

    async fn stop(self) {
        self.shutdown_token.cancel();
        if let Err(e) = self.handle.await {
            warn!("Progress poller ended abnormally: {}", e);
        }
    }
}

pub struct WorkerHarness {
    strategy: Arc<dyn BookingStrategy>,
    venue: Arc<Venue>,
    observers: Arc<ObserverRegistry>,
    seed: Option<u64>,
    progress_interval: Duration,

    root_token: CancellationToken,
    run_token: CancellationToken,

    prepared: Vec<WorkerId>,
    tasks: JoinSet<ClaimResult>,
    task_workers: HashMap<tokio::task::Id, WorkerId>,
    poller: Option<ProgressPoller>,
    active: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    running: bool,
}

impl WorkerHarness {
    pub fn new(
        strategy: Arc<dyn BookingStrategy>,
        venue: Arc<Venue>,
        observers: Arc<ObserverRegistry>,
        config: &SimulationConfig,
        root_token: CancellationToken,
    ) -> Self {
        let run_token = root_token.child_token();
        Self {
            strategy,
            venue,
            observers,
            seed: config.seed,
            progress_interval: config.progress_interval,
            root_token,
            run_token,
            prepared: Vec::new(),
            tasks: JoinSet::new(),
            task_workers: HashMap::new(),
            poller: None,
            active: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
            running: false,
        }
    }

    /// Create `count` not-yet-started workers with ids `0..count`.
    ///
    /// Safe to call repeatedly: anything left from a previous population is
    /// cancelled and discarded first.
    pub fn prepare(&mut self, count: usize) {
        if !self.tasks.is_empty() {
            warn!(leftover = self.tasks.len(), "Discarding workers from an unfinished run");
            self.run_token.cancel();
            self.tasks.abort_all();
            self.tasks.detach_all();
        }
        if let Some(poller) = self.poller.take() {
            poller.shutdown_token.cancel();
        }

        self.run_token = self.root_token.child_token();
        self.task_workers.clear();
        self.active.store(0, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.running = false;
        self.prepared = (0..count).map(WorkerId).collect();
    }

    /// Launch every prepared worker. All of them run concurrently.
    pub fn start_all(&mut self) -> Result<(), SimulationError> {
        if self.running {
            return Err(SimulationError::AlreadyRunning);
        }
        if self.prepared.is_empty() {
            return Err(SimulationError::NotPrepared);
        }
        self.running = true;

        let total = self.prepared.len();
        info!(workers = total, strategy = %self.strategy.kind(), "Starting workers");

        for id in std::mem::take(&mut self.prepared) {
            let strategy = self.strategy.clone();
            let venue = self.venue.clone();
            let observers = self.observers.clone();
            let active = self.active.clone();
            let completed = self.completed.clone();
            let mut worker = WorkerContext::new(id, self.seed, self.run_token.clone(), observers.clone());

            let handle = self.tasks.spawn(async move {
                let _guard = ActiveGuard::enter(&active, &completed);
                observers.worker_started(id);

                let attempt = strategy.execute(&venue, &mut worker).await;
                let result = ClaimResult::from_attempt(id, &attempt);

                observers.worker_finished(&result);
                result
            });
            self.task_workers.insert(handle.id(), id);
        }

        self.poller = Some(ProgressPoller::start(
            self.progress_interval,
            total,
            self.active.clone(),
            self.completed.clone(),
            self.observers.clone(),
        ));
        Ok(())
    }

    /// Join every started worker and return their results in completion order.
    ///
    /// A worker task that panics still yields a failed [`ClaimResult`] so the
    /// tallies stay complete.
    pub async fn await_completion(&mut self) -> Vec<ClaimResult> {
        let mut results = Vec::with_capacity(self.task_workers.len());

        while let Some(joined) = self.tasks.join_next_with_id().await {
            match joined {
                Ok((_, result)) => results.push(result),
                Err(e) => {
                    let Some(&worker) = self.task_workers.get(&e.id()) else {
                        warn!("Joined a task the harness did not start: {}", e);
                        continue;
                    };
                    if e.is_panic() {
                        let failure = ClaimError::WorkerPanicked(e.to_string());
                        error!(worker_id = %worker, "{}", failure);
                    } else {
                        debug!(worker_id = %worker, "Worker task aborted");
                    }
                    self.observers.claim_failed(worker);
                    let result = ClaimResult::failed(worker, None);
                    self.observers.worker_finished(&result);
                    results.push(result);
                }
            }
        }

        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }
        self.observers.progress(self.progress());
        self.running = false;

        info!(joined = results.len(), "All workers joined");
        results
    }

    /// Signal every worker of the current population to stop at its next
    /// suspension point.
    pub fn cancel_all(&self) {
        if !self.run_token.is_cancelled() {
            info!("Cancelling all workers");
        }
        self.run_token.cancel();
    }

    pub fn progress(&self) -> Progress {
        Progress {
            active: self.active_count(),
            completed: self.completed.load(Ordering::SeqCst),
            total: self.task_workers.len().max(self.prepared.len()),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn prepared_count(&self) -> usize {
        self.prepared.len()
    }

    pub fn strategy(&self) -> &Arc<dyn BookingStrategy> {
        &self.strategy
    }
}

impl Drop for WorkerHarness {
    fn drop(&mut self) {
        self.run_token.cancel();
        if let Some(poller) = self.poller.take() {
            poller.shutdown_token.cancel();
        }
    }
}
