// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Simulation facade
//!
//! Owns the venue, the observer registry, the worker harness and the last
//! run's statistics. A run is: notify started, prepare workers, start them
//! (the harness starts the progress poller), join them, stop the poller,
//! compute statistics, notify completed.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::aggregator::StatisticsAggregator;
use crate::application::harness::WorkerHarness;
use crate::application::observer::{ObserverId, ObserverRegistry, SimulationObserver};
use crate::application::strategy::build_strategy;
use crate::domain::{ClaimResult, SimulationConfig, SimulationError, SimulationStats, StrategyKind, Venue};

pub struct Simulation {
    config: SimulationConfig,
    kind: StrategyKind,
    venue: Arc<Venue>,
    observers: Arc<ObserverRegistry>,
    harness: WorkerHarness,
    aggregator: StatisticsAggregator,
    stats: SimulationStats,
    results: Vec<ClaimResult>,
    shutdown_token: CancellationToken,
}

impl Simulation {
    pub fn new(config: SimulationConfig, kind: StrategyKind) -> Result<Self, SimulationError> {
        config.validate()?;

        let resources = config.resource_count();
        let venue = Arc::new(if kind.uses_pairs() {
            Venue::paired(resources)
        } else {
            Venue::seats_only(resources)
        });
        let observers = Arc::new(ObserverRegistry::new());
        let shutdown_token = CancellationToken::new();
        let harness = WorkerHarness::new(
            build_strategy(kind, &config),
            venue.clone(),
            observers.clone(),
            &config,
            shutdown_token.clone(),
        );

        Ok(Self {
            stats: SimulationStats::new(kind, resources, config.workers),
            aggregator: StatisticsAggregator::new(kind),
            results: Vec::new(),
            config,
            kind,
            venue,
            observers,
            harness,
            shutdown_token,
        })
    }

    /// `resources` seats in one row, `workers` workers, every other setting at its default.
    pub fn with_counts(
        resources: usize,
        workers: usize,
        kind: StrategyKind,
    ) -> Result<Self, SimulationError> {
        Self::new(SimulationConfig::with_size(resources, workers), kind)
    }

    /// Run every worker to completion and return the resulting statistics.
    ///
    /// Resource state left by a previous run is cleared first, so back-to-back
    /// runs are independent.
    pub async fn run_simulation(&mut self) -> Result<SimulationStats, SimulationError> {
        if self.harness.is_running() {
            return Err(SimulationError::AlreadyRunning);
        }
        self.reset();

        let workers = self.config.workers;
        info!(
            strategy = %self.kind,
            workers,
            resources = self.venue.len(),
            "Starting simulation run"
        );
        self.observers.run_started(self.kind, workers);

        let started = Instant::now();
        self.harness.prepare(workers);
        self.harness.start_all()?;
        self.results = self.harness.await_completion().await;

        self.stats = self.aggregator.compute(&self.venue, &self.results, started.elapsed());
        info!(
            strategy = %self.kind,
            elapsed_ms = self.stats.elapsed.as_millis() as u64,
            "{}",
            self.stats.summary()
        );
        self.observers.run_completed(&self.stats);

        Ok(self.stats.clone())
    }

    /// Clear resource state, statistics and per-worker results.
    pub fn reset(&mut self) {
        self.harness.prepare(0);
        self.venue.reset();
        self.stats.reset();
        self.results.clear();
    }

    pub fn add_observer(&self, observer: SimulationObserver) -> ObserverId {
        self.observers.register(observer)
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Token that cancels the current run (and every later one) when fired.
    /// Workers observe it at their next suspension point.
    pub fn cancel_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Per-worker records of the last run, in completion order.
    pub fn results(&self) -> &[ClaimResult] {
        &self.results
    }

    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn strategy(&self) -> StrategyKind {
        self.kind
    }

    /// Handler panics caught since this simulation was created.
    pub fn observer_failures(&self) -> usize {
        self.observers.failure_count()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("strategy", &self.kind)
            .field("resources", &self.venue.len())
            .field("workers", &self.config.workers)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SimulationConfig::with_size(10, 10);
        config.workers = 0;
        assert!(matches!(
            Simulation::new(config, StrategyKind::Race),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_pair_strategies_get_snacks() {
        assert!(Simulation::with_counts(4, 4, StrategyKind::Deadlock).unwrap().venue().has_snacks());
        assert!(!Simulation::with_counts(4, 4, StrategyKind::Race).unwrap().venue().has_snacks());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_notifies_start_and_completion() {
        let mut simulation = Simulation::new(SimulationConfig::with_size(5, 8), StrategyKind::Serialized).unwrap();
        let notifications = Arc::new(AtomicUsize::new(0));
        let (a, b) = (notifications.clone(), notifications.clone());
        simulation.add_observer(
            SimulationObserver::new()
                .on_run_started(move |kind, workers| {
                    assert_eq!(kind, StrategyKind::Serialized);
                    assert_eq!(workers, 8);
                    a.fetch_add(1, Ordering::SeqCst);
                })
                .on_run_completed(move |stats| {
                    assert_eq!(stats.resources_occupied, 5);
                    b.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let stats = simulation.run_simulation().await.unwrap();

        assert_eq!(notifications.load(Ordering::SeqCst), 2);
        assert_eq!(stats.failed_claims, 3);
        assert_eq!(simulation.results().len(), 8);
        assert_eq!(simulation.stats(), &stats);
        assert!(stats.elapsed > Duration::ZERO);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reset_clears_everything() {
        let mut simulation = Simulation::new(SimulationConfig::with_size(3, 6), StrategyKind::Serialized).unwrap();
        simulation.run_simulation().await.unwrap();

        simulation.reset();

        assert!(simulation.venue().seats().iter().all(|seat| !seat.is_occupied() && seat.holder_count() == 0));
        assert_eq!(simulation.stats(), &SimulationStats::new(StrategyKind::Serialized, 3, 6));
        assert!(simulation.results().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_removed_observer_is_not_called() {
        let mut simulation = Simulation::new(SimulationConfig::with_size(2, 2), StrategyKind::Serialized).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = simulation.add_observer(SimulationObserver::new().on_resource_claimed(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(simulation.remove_observer(id));
        simulation.run_simulation().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
