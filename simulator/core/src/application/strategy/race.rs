// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::application::strategy::BookingStrategy;
use crate::application::worker::WorkerContext;
use crate::domain::{ClaimError, ClaimOutcome, RaceConfig, Seat, StrategyKind, Venue};

/// Unsynchronized check-then-act: snapshot free seats, wait out a short
/// window, then commit without re-checking.
///
/// Overlapping windows produce double bookings. The later writer overwrites
/// the occupied flag and appends to the holder log; nothing is rolled back.
#[derive(Debug, Clone)]
pub struct RaceStrategy {
    base_delay: Duration,
    jitter: Duration,
}

impl RaceStrategy {
    pub fn new(config: &RaceConfig) -> Self {
        Self {
            base_delay: config.base_delay,
            jitter: config.jitter,
        }
    }

    fn window(&self, worker: &mut WorkerContext) -> Duration {
        let jitter_micros = self.jitter.as_micros().min(u64::MAX as u128) as u64;
        self.base_delay + Duration::from_micros(worker.rng.random_range(0..=jitter_micros))
    }

    fn commit(seat: &Seat, worker: &WorkerContext) -> bool {
        let was_occupied = seat.is_occupied();
        seat.set_occupied(true);
        let holders = seat.record_holder(worker.id);

        let collided = was_occupied || holders > 1;
        if collided {
            seat.mark_collision();
            debug!(worker_id = %worker.id, seat = %seat.index(), holders, "double booking");
            worker.observers.collision_detected(seat);
        }
        worker.observers.resource_claimed(seat, worker.id);
        collided
    }
}

#[async_trait]
impl BookingStrategy for RaceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Race
    }

    async fn execute(
        &self,
        venue: &Venue,
        worker: &mut WorkerContext,
    ) -> Result<ClaimOutcome, ClaimError> {
        let free: Vec<&Seat> = venue.seats().iter().filter(|seat| !seat.is_occupied()).collect();
        if free.is_empty() {
            return Err(worker.fail(ClaimError::NoResourceAvailable));
        }
        let seat = free[worker.rng.random_range(0..free.len())];
        drop(free);

        let window = self.window(worker);
        if let Err(err) = worker.suspend(window).await {
            return Err(worker.fail(err));
        }

        let collided = Self::commit(seat, worker);
        Ok(ClaimOutcome::Claimed {
            index: seat.index(),
            collided,
        })
    }
}
