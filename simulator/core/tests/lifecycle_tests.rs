// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Run lifecycle tests: reset between runs, cancellation, observer fault
//! isolation, the event stream and config-driven construction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use threadrace_core::infrastructure::{EventBus, EventBusError};
use threadrace_core::{
    Simulation, SimulationConfig, SimulationEvent, SimulationObserver, StrategyKind,
};

fn quick(resources: usize, workers: usize) -> SimulationConfig {
    let mut config = SimulationConfig::with_size(resources, workers);
    config.progress_interval = Duration::from_millis(5);
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn test_repeat_runs_do_not_leak_state() {
    let mut simulation = Simulation::new(quick(20, 60), StrategyKind::Serialized).unwrap();

    let mut first = simulation.run_simulation().await.unwrap();
    simulation.reset();
    assert!(simulation.venue().seats().iter().all(|seat| !seat.is_occupied()));

    let mut second = simulation.run_simulation().await.unwrap();

    first.elapsed = Duration::ZERO;
    second.elapsed = Duration::ZERO;
    assert_eq!(first, second);
    assert_eq!(second.resources_occupied, 20);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_race_run_after_reset_starts_clean() {
    let mut simulation = Simulation::new(quick(10, 200), StrategyKind::Race).unwrap();
    simulation.run_simulation().await.unwrap();
    simulation.reset();

    assert_eq!(simulation.stats().collision_count, 0);
    assert!(simulation
        .venue()
        .seats()
        .iter()
        .all(|seat| seat.holder_count() == 0 && !seat.has_collision()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancellation_ends_run_promptly() {
    let mut config = quick(50, 500);
    config.race.base_delay = Duration::from_secs(60);
    let mut simulation = Simulation::new(config, StrategyKind::Race).unwrap();

    let token = simulation.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let stats = tokio::time::timeout(Duration::from_secs(10), simulation.run_simulation())
        .await
        .expect("cancelled run must not wait out the race window")
        .unwrap();

    assert_eq!(stats.resources_occupied, 0);
    assert_eq!(stats.failed_claims, 500);
    assert_eq!(simulation.results().len(), 500);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_pair_workers_release_their_locks() {
    let mut config = quick(5, 50);
    config.deadlock.hold_delay = Duration::from_secs(60);
    let mut simulation = Simulation::new(config, StrategyKind::DeadlockAvoidance).unwrap();

    let token = simulation.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let stats = tokio::time::timeout(Duration::from_secs(10), simulation.run_simulation())
        .await
        .expect("cancelled run must not wait out the hold delay")
        .unwrap();

    assert_eq!(stats.pairs_completed, 0);
    assert_eq!(stats.deadlocks_detected, 0);
    assert!(simulation.venue().seats().iter().all(|seat| seat.current_holder().is_none()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panicking_observer_is_isolated() {
    let mut simulation = Simulation::new(quick(10, 10), StrategyKind::Serialized).unwrap();
    let delivered = Arc::new(AtomicUsize::new(0));

    simulation.add_observer(SimulationObserver::new().on_resource_claimed(|_, _| {
        panic!("observer failure");
    }));
    let counter = delivered.clone();
    simulation.add_observer(SimulationObserver::new().on_resource_claimed(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let stats = simulation.run_simulation().await.unwrap();

    assert_eq!(stats.resources_occupied, 10);
    assert_eq!(delivered.load(Ordering::SeqCst), 10);
    assert_eq!(simulation.observer_failures(), 10);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_stream_reports_the_run() {
    let mut simulation = Simulation::new(quick(3, 5), StrategyKind::Serialized).unwrap();
    let bus = EventBus::new(1024);
    let mut receiver = bus.subscribe();
    simulation.add_observer(bus.observer());

    simulation.run_simulation().await.unwrap();

    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(EventBusError::Empty) => break,
            Err(e) => panic!("unexpected bus error: {e}"),
        }
    }

    let count = |name: &str| events.iter().filter(|e| e.name() == name).count();
    assert_eq!(events.first().map(SimulationEvent::name), Some("run_started"));
    assert_eq!(events.last().map(SimulationEvent::name), Some("run_completed"));
    assert_eq!(count("worker_started"), 5);
    assert_eq!(count("worker_finished"), 5);
    assert_eq!(count("resource_claimed"), 3);
    assert_eq!(count("claim_failed"), 2);
    assert!(count("progress") >= 1);

    let line = serde_json::to_string(events.last().unwrap()).unwrap();
    assert!(line.contains("\"type\":\"run_completed\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_simulation_from_yaml_config() {
    let config = SimulationConfig::from_yaml_str(
        r#"
grid:
  rows: 2
  columns: 5
workers: 30
race:
  base_delay: 1ms
  jitter: 500us
seed: 99
"#,
    )
    .unwrap();
    assert_eq!(config.resource_count(), 10);

    let mut simulation = Simulation::new(config, StrategyKind::Serialized).unwrap();
    let stats = simulation.run_simulation().await.unwrap();

    assert_eq!(stats.total_resources, 10);
    assert_eq!(stats.total_workers, 30);
    assert_eq!(stats.failed_claims, 20);
}
