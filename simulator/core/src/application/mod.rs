// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod observer;
pub mod worker;
pub mod strategy;
pub mod harness;
pub mod aggregator;
pub mod simulation;

pub use observer::{ObserverFailure, ObserverId, ObserverRegistry, Progress, SimulationObserver};
pub use worker::WorkerContext;
pub use strategy::{build_strategy, BookingStrategy};
pub use harness::WorkerHarness;
pub use aggregator::StatisticsAggregator;
pub use simulation::Simulation;
