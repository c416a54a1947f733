// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Simulation Domain Layer
//!
//! Types for the booking simulation. The only I/O here is configuration
//! file loading; the only runtime type is the per-resource `tokio` lock.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`resource`] | `Seat`, `Snack`, `Venue`, `ResourceIndex` |
//! | [`claim`] | `WorkerId`, `ClaimResult`, `ClaimOutcome`, `ClaimError` |
//! | [`strategy`] | `StrategyKind` |
//! | [`stats`] | `SimulationStats` |
//! | [`config`] | `SimulationConfig` |
//! | [`events`] | `SimulationEvent` |
//! | [`error`] | `SimulationError` |

pub mod resource;
pub mod claim;
pub mod strategy;
pub mod stats;
pub mod config;
pub mod events;
pub mod error;

pub use resource::*;
pub use claim::*;
pub use strategy::*;
pub use stats::*;
pub use config::*;
pub use events::*;
pub use error::*;
