// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;

use tracing::debug;

use crate::domain::{ClaimResult, SimulationStats, StrategyKind, Venue};

/// Derives [`SimulationStats`] from the final venue state.
///
/// Must only run after every worker has joined; nothing here takes a lock.
#[derive(Debug, Clone, Copy)]
pub struct StatisticsAggregator {
    strategy: StrategyKind,
}

impl StatisticsAggregator {
    pub fn new(strategy: StrategyKind) -> Self {
        Self { strategy }
    }

    pub fn compute(&self, venue: &Venue, results: &[ClaimResult], elapsed: Duration) -> SimulationStats {
        let mut stats = SimulationStats::new(self.strategy, venue.len(), results.len());

        for seat in venue.seats() {
            if seat.is_occupied() {
                stats.resources_occupied += 1;
                stats.total_claim_attempts += seat.holder_count();
                if seat.has_collision() {
                    stats.collision_count += 1;
                }
            }
        }
        stats.successful_claims = stats.resources_occupied - stats.collision_count;
        stats.oversold_count = SimulationStats::oversold(stats.total_claim_attempts, venue.len());

        if self.strategy.uses_pairs() {
            for seat in venue.seats() {
                if seat.is_deadlocked() {
                    stats.deadlocks_detected += 1;
                    stats.workers_stuck += seat.holder_count();
                } else if seat.is_occupied() {
                    stats.pairs_completed += 1;
                }
            }
            stats.snacks_reserved = venue.snacks().iter().filter(|snack| snack.is_reserved()).count();
        }

        stats.failed_claims = results.iter().filter(|result| !result.success).count();
        stats.elapsed = elapsed;

        debug!(
            strategy = %self.strategy,
            occupied = stats.resources_occupied,
            collisions = stats.collision_count,
            deadlocks = stats.deadlocks_detected,
            "Statistics computed"
        );
        stats
    }
}
