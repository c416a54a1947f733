// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Booking Strategies
//!
//! Each worker task runs exactly one [`BookingStrategy::execute`] call against
//! the shared [`Venue`]. Strategies are responsible for their own event
//! emission (claimed, failed, collision, deadlock, stuck, pair complete); the
//! harness only reports worker lifecycle and progress.
//!
//! | Kind | Type | Safe |
//! |------|------|------|
//! | `serialized` | [`SerializedStrategy`] | yes |
//! | `race` | [`RaceStrategy`] | no |
//! | `deadlock` | [`DeadlockStrategy`] | no |
//! | `deadlock-avoidance` | [`DeadlockAvoidanceStrategy`] | yes |

pub mod paired;
pub mod race;
pub mod serialized;

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::worker::WorkerContext;
use crate::domain::{ClaimError, ClaimOutcome, SimulationConfig, StrategyKind, Venue};

pub use paired::{DeadlockAvoidanceStrategy, DeadlockStrategy};
pub use race::RaceStrategy;
pub use serialized::SerializedStrategy;

#[async_trait]
pub trait BookingStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// One booking attempt by one worker. Must return promptly with
    /// [`ClaimError::Cancelled`] once the worker's token fires.
    async fn execute(
        &self,
        venue: &Venue,
        worker: &mut WorkerContext,
    ) -> Result<ClaimOutcome, ClaimError>;
}

/// Build the strategy for `kind`, tuned from `config`.
pub fn build_strategy(kind: StrategyKind, config: &SimulationConfig) -> Arc<dyn BookingStrategy> {
    match kind {
        StrategyKind::Serialized => Arc::new(SerializedStrategy::new()),
        StrategyKind::Race => Arc::new(RaceStrategy::new(&config.race)),
        StrategyKind::Deadlock => Arc::new(DeadlockStrategy::new(&config.deadlock)),
        StrategyKind::DeadlockAvoidance => {
            Arc::new(DeadlockAvoidanceStrategy::new(&config.deadlock))
        }
    }
}
