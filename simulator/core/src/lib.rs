// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `threadrace-core` — Booking Contention Simulator
//!
//! A fixed pool of seats (and, for the two-resource scenarios, snacks paired
//! one-to-one with seats) is contended by a large population of concurrent
//! workers, each attempting exactly one booking.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Seat`, `Snack`, `Venue`, `SimulationStats`, `SimulationConfig` |
//! | [`application`] | Application | strategies, `WorkerHarness`, `StatisticsAggregator`, `Simulation` |
//! | [`infrastructure`] | Infrastructure | `EventBus`, metrics observer |
//!
//! ## Acquisition Disciplines
//!
//! - **Serialized**: one run-wide token, first free seat in index order.
//! - **Race**: no token, a widened snapshot→commit window, double bookings allowed.
//! - **Deadlock**: seat+snack locked in a random per-worker order, second lock bounded by a timeout.
//! - **Deadlock avoidance**: seat+snack always locked seat first.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::{ObserverId, Simulation, SimulationObserver};
