// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use crate::application::strategy::BookingStrategy;
use crate::application::worker::WorkerContext;
use crate::domain::{ClaimError, ClaimOutcome, StrategyKind, Venue};

/// Scan-and-claim under one run-wide mutual-exclusion token.
///
/// The token is held for the whole scan and commit, and never across an
/// await point, so the sequence is atomic with respect to every other worker.
#[derive(Debug, Default)]
pub struct SerializedStrategy {
    token: Mutex<()>,
}

impl SerializedStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim_first_free(&self, venue: &Venue, worker: &WorkerContext) -> Result<ClaimOutcome, ClaimError> {
        let _token = self.token.lock();

        let Some(seat) = venue.seats().iter().find(|seat| !seat.is_occupied()) else {
            return Err(worker.fail(ClaimError::NoResourceAvailable));
        };

        seat.set_occupied(true);
        seat.record_holder(worker.id);
        trace!(worker_id = %worker.id, seat = %seat.index(), "seat claimed");
        worker.observers.resource_claimed(seat, worker.id);

        Ok(ClaimOutcome::Claimed {
            index: seat.index(),
            collided: false,
        })
    }
}

#[async_trait]
impl BookingStrategy for SerializedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Serialized
    }

    async fn execute(
        &self,
        venue: &Venue,
        worker: &mut WorkerContext,
    ) -> Result<ClaimOutcome, ClaimError> {
        if worker.cancel.is_cancelled() {
            return Err(worker.fail(ClaimError::Cancelled));
        }
        self.claim_first_free(venue, worker)
    }
}
