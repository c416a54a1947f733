// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use thiserror::Error;

/// Hard failures reported to the caller of the simulation.
///
/// Ordinary contention never produces one of these; see
/// [`ClaimError`](crate::domain::claim::ClaimError) for per-worker outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("Simulation already running")]
    AlreadyRunning,

    #[error("No workers prepared; call prepare() before start_all()")]
    NotPrepared,

    #[error("Invalid simulation configuration: {0}")]
    InvalidConfig(String),
}
