// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::strategy::StrategyKind;

/// Integrity snapshot of one run, derived from the final resource state.
///
/// Populated only by the statistics aggregator after every worker has joined;
/// zeroed again by [`SimulationStats::reset`] between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    pub strategy: StrategyKind,
    pub total_resources: usize,
    pub total_workers: usize,
    pub resources_occupied: usize,
    /// Occupied seats held by exactly one worker.
    pub successful_claims: usize,
    /// Sum of holder-log lengths across occupied seats.
    pub total_claim_attempts: usize,
    pub collision_count: usize,
    /// `max(0, total_claim_attempts - total_resources)`.
    pub oversold_count: usize,
    /// Workers whose single invocation ended without a booking.
    pub failed_claims: usize,

    // Two-resource scenarios only.
    pub pairs_completed: usize,
    pub deadlocks_detected: usize,
    pub workers_stuck: usize,
    pub snacks_reserved: usize,

    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl SimulationStats {
    pub fn new(strategy: StrategyKind, total_resources: usize, total_workers: usize) -> Self {
        Self {
            strategy,
            total_resources,
            total_workers,
            resources_occupied: 0,
            successful_claims: 0,
            total_claim_attempts: 0,
            collision_count: 0,
            oversold_count: 0,
            failed_claims: 0,
            pairs_completed: 0,
            deadlocks_detected: 0,
            workers_stuck: 0,
            snacks_reserved: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Zero every measured value, keeping the run's shape (strategy and totals).
    pub fn reset(&mut self) {
        *self = Self::new(self.strategy, self.total_resources, self.total_workers);
    }

    /// Oversell never goes negative: attempts at or below capacity oversell nothing.
    pub fn oversold(total_claim_attempts: usize, total_resources: usize) -> usize {
        total_claim_attempts.saturating_sub(total_resources)
    }

    pub fn is_safe_mode(&self) -> bool {
        self.strategy.is_safe()
    }

    /// No double bookings, no oversell and no deadlocks were observed.
    pub fn integrity_intact(&self) -> bool {
        self.collision_count == 0 && self.oversold_count == 0 && self.deadlocks_detected == 0
    }

    pub fn oversell_percentage(&self) -> f64 {
        if self.total_claim_attempts == 0 {
            return 0.0;
        }
        (self.oversold_count as f64 * 100.0) / self.total_claim_attempts as f64
    }

    pub fn verdict(&self) -> String {
        let mode = if self.is_safe_mode() { "SAFE MODE" } else { "UNSAFE MODE" };
        let integrity = if self.integrity_intact() { "INTACT" } else { "COMPROMISED" };

        if self.strategy.uses_pairs() {
            return format!(
                "{mode}\nPairs completed: {}\nDeadlocks detected: {}\nWorkers stuck: {}\nSystem integrity: {integrity}",
                self.pairs_completed, self.deadlocks_detected, self.workers_stuck
            );
        }

        if self.is_safe_mode() && self.integrity_intact() {
            format!(
                "{mode}\n{} seats booked safely.\nSystem integrity: {integrity}",
                self.resources_occupied
            )
        } else {
            format!(
                "{mode}\nActual Seats: {}\nClaimed Bookings: {}\nCollisions: {}\nSystem integrity: {integrity}",
                self.resources_occupied, self.total_claim_attempts, self.collision_count
            )
        }
    }

    pub fn summary(&self) -> String {
        let tag = if self.is_safe_mode() { "[SAFE]  " } else { "[UNSAFE]" };

        if self.strategy.uses_pairs() {
            return format!(
                "{tag} Pairs: {}/{} | Deadlocks: {} | Stuck: {}",
                self.pairs_completed, self.total_resources, self.deadlocks_detected, self.workers_stuck
            );
        }

        if self.integrity_intact() {
            format!(
                "{tag} Seats: {}/{} (Perfect)",
                self.resources_occupied, self.total_resources
            )
        } else {
            format!(
                "{tag} Seats: {}/{} | Claims: {} | Collisions: {}",
                self.resources_occupied,
                self.total_resources,
                self.total_claim_attempts,
                self.collision_count
            )
        }
    }
}
