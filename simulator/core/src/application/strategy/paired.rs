// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Two-resource booking: every worker needs both the seat and the snack of
//! one pair, each behind its own lock.
//!
//! Lock acquisition order is the only difference between the two strategies.
//! [`DeadlockStrategy`] picks seat-first or snack-first at random per worker, so
//! opposite-order waiters on the same pair can block each other until the
//! bounded second-lock wait expires. [`DeadlockAvoidanceStrategy`] always takes
//! the seat first, which rules the cycle out.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::MutexGuard;
use tracing::{debug, warn};

use crate::application::strategy::BookingStrategy;
use crate::application::worker::WorkerContext;
use crate::domain::{
    ClaimError, ClaimOutcome, DeadlockConfig, PairHandle, PairSelection, ResourceIndex,
    StrategyKind, Venue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockOrdering {
    /// Coin flip per worker.
    Random,
    /// Seat, then snack. Always.
    SeatFirst,
}

/// Shared acquisition protocol behind both pair strategies.
#[derive(Debug, Clone)]
struct PairAcquisition {
    ordering: LockOrdering,
    hold_delay: Duration,
    lock_timeout: Duration,
    selection: PairSelection,
}

/// Locks held by one worker on one pair. Dropping it clears the holder
/// markers it set and releases the locks in reverse acquisition order, on
/// every exit path including cancellation.
struct PairLease<'a> {
    pair: PairHandle<'a>,
    seat_first: bool,
    first: Option<MutexGuard<'a, ()>>,
    second: Option<MutexGuard<'a, ()>>,
}

impl<'a> PairLease<'a> {
    fn new(pair: PairHandle<'a>, seat_first: bool) -> Self {
        Self {
            pair,
            seat_first,
            first: None,
            second: None,
        }
    }

    fn holds_seat(&self) -> bool {
        if self.seat_first {
            self.first.is_some()
        } else {
            self.second.is_some()
        }
    }

    fn holds_snack(&self) -> bool {
        if self.seat_first {
            self.second.is_some()
        } else {
            self.first.is_some()
        }
    }

    fn mark_held_by(&self, worker: &WorkerContext) {
        if self.holds_seat() {
            self.pair.seat.set_current_holder(Some(worker.id));
        }
        if self.holds_snack() {
            self.pair.snack.set_current_holder(Some(worker.id));
        }
    }
}

impl Drop for PairLease<'_> {
    fn drop(&mut self) {
        if self.holds_seat() {
            self.pair.seat.set_current_holder(None);
        }
        if self.holds_snack() {
            self.pair.snack.set_current_holder(None);
        }
        drop(self.second.take());
        drop(self.first.take());
    }
}

impl PairAcquisition {
    fn new(ordering: LockOrdering, config: &DeadlockConfig) -> Self {
        Self {
            ordering,
            hold_delay: config.hold_delay,
            lock_timeout: config.lock_timeout,
            selection: config.pair_selection,
        }
    }

    fn select_pair(&self, venue: &Venue, worker: &mut WorkerContext) -> ResourceIndex {
        let index = match self.selection {
            PairSelection::Random => worker.rng.random_range(0..venue.len()),
            PairSelection::RoundRobin => worker.id.as_usize() % venue.len(),
        };
        ResourceIndex(index)
    }

    async fn acquire(
        &self,
        venue: &Venue,
        worker: &mut WorkerContext,
    ) -> Result<ClaimOutcome, ClaimError> {
        if venue.is_empty() {
            return Err(worker.fail(ClaimError::NoResourceAvailable));
        }
        let index = self.select_pair(venue, worker);
        let Some(pair) = venue.pair(index) else {
            return Err(worker.fail(ClaimError::NoResourceAvailable));
        };
        if pair.is_deadlocked() || pair.is_taken() {
            return Err(worker.fail(ClaimError::PairUnavailable { index }));
        }

        let seat_first = match self.ordering {
            LockOrdering::Random => worker.rng.random_bool(0.5),
            LockOrdering::SeatFirst => true,
        };
        let (first_lock, second_lock) = if seat_first {
            (pair.seat_lock, pair.snack_lock)
        } else {
            (pair.snack_lock, pair.seat_lock)
        };

        let started = Instant::now();
        let mut lease = PairLease::new(pair, seat_first);

        lease.first = Some(tokio::select! {
            biased;
            _ = worker.cancel.cancelled() => return Err(worker.fail(ClaimError::Cancelled)),
            guard = first_lock.lock() => guard,
        });

        // State may have moved on while we queued for the first lock; a
        // completed pair must never be marked deadlocked afterwards.
        if pair.is_deadlocked() || pair.is_taken() {
            return Err(worker.fail(ClaimError::PairUnavailable { index }));
        }
        lease.mark_held_by(worker);

        if let Err(err) = worker.suspend(self.hold_delay).await {
            return Err(worker.fail(err));
        }

        let second = tokio::select! {
            biased;
            _ = worker.cancel.cancelled() => return Err(worker.fail(ClaimError::Cancelled)),
            attempt = tokio::time::timeout(self.lock_timeout, second_lock.lock()) => attempt,
        };

        let Ok(guard) = second else {
            let waited = started.elapsed();
            if self.ordering == LockOrdering::SeatFirst {
                warn!(worker_id = %worker.id, pair = %index, ?waited, "second lock timed out under fixed ordering");
            } else {
                debug!(worker_id = %worker.id, pair = %index, ?waited, "second lock timed out, marking pair deadlocked");
            }
            pair.mark_deadlocked();
            pair.seat.record_holder(worker.id);
            worker.observers.deadlock_detected(pair.seat, pair.snack, worker.id);
            worker.observers.worker_stuck(worker.id, waited);
            return Err(ClaimError::AcquisitionTimeout { index, waited });
        };
        lease.second = Some(guard);

        if pair.is_deadlocked() {
            let waited = started.elapsed();
            pair.seat.record_holder(worker.id);
            debug!(worker_id = %worker.id, pair = %index, "pair deadlocked while waiting");
            worker.observers.deadlock_detected(pair.seat, pair.snack, worker.id);
            worker.observers.worker_stuck(worker.id, waited);
            return Err(ClaimError::PairDeadlocked { index, waited });
        }
        if pair.is_taken() {
            return Err(worker.fail(ClaimError::PairUnavailable { index }));
        }
        lease.mark_held_by(worker);

        pair.seat.set_occupied(true);
        pair.seat.record_holder(worker.id);
        pair.snack.set_reserved(true);
        worker.observers.pair_complete(pair.seat, pair.snack, worker.id);
        worker.observers.resource_claimed(pair.seat, worker.id);

        Ok(ClaimOutcome::PairCompleted { index })
    }
}

/// Random lock order per worker; deadlocks are expected and recorded.
#[derive(Debug, Clone)]
pub struct DeadlockStrategy {
    inner: PairAcquisition,
}

impl DeadlockStrategy {
    pub fn new(config: &DeadlockConfig) -> Self {
        Self {
            inner: PairAcquisition::new(LockOrdering::Random, config),
        }
    }
}

#[async_trait]
impl BookingStrategy for DeadlockStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Deadlock
    }

    async fn execute(
        &self,
        venue: &Venue,
        worker: &mut WorkerContext,
    ) -> Result<ClaimOutcome, ClaimError> {
        self.inner.acquire(venue, worker).await
    }
}

/// Fixed global order (seat, then snack); no deadlock can form.
#[derive(Debug, Clone)]
pub struct DeadlockAvoidanceStrategy {
    inner: PairAcquisition,
}

impl DeadlockAvoidanceStrategy {
    pub fn new(config: &DeadlockConfig) -> Self {
        Self {
            inner: PairAcquisition::new(LockOrdering::SeatFirst, config),
        }
    }
}

#[async_trait]
impl BookingStrategy for DeadlockAvoidanceStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DeadlockAvoidance
    }

    async fn execute(
        &self,
        venue: &Venue,
        worker: &mut WorkerContext,
    ) -> Result<ClaimOutcome, ClaimError> {
        self.inner.acquire(venue, worker).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::observer::ObserverRegistry;
    use crate::domain::WorkerId;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn config(hold_ms: u64, timeout_ms: u64, selection: PairSelection) -> DeadlockConfig {
        DeadlockConfig {
            hold_delay: Duration::from_millis(hold_ms),
            lock_timeout: Duration::from_millis(timeout_ms),
            pair_selection: selection,
        }
    }

    fn worker(id: usize, observers: &Arc<ObserverRegistry>) -> WorkerContext {
        WorkerContext::new(WorkerId(id), Some(11), CancellationToken::new(), observers.clone())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_uncontended_pair_completes_and_releases() {
        let venue = Venue::paired(3);
        let observers = Arc::new(ObserverRegistry::new());
        let strategy = DeadlockAvoidanceStrategy::new(&config(1, 1000, PairSelection::RoundRobin));

        let result = strategy.execute(&venue, &mut worker(1, &observers)).await;

        assert_eq!(result, Ok(ClaimOutcome::PairCompleted { index: ResourceIndex(1) }));
        let pair = venue.pair(ResourceIndex(1)).unwrap();
        assert!(pair.seat.is_occupied());
        assert!(pair.snack.is_reserved());
        assert_eq!(pair.seat.holders(), vec![WorkerId(1)]);
        assert_eq!(pair.seat.current_holder(), None);
        assert_eq!(pair.snack.current_holder(), None);
        assert!(pair.seat_lock.try_lock().is_ok());
        assert!(pair.snack_lock.try_lock().is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_taken_pair_fails_fast() {
        let venue = Venue::paired(1);
        venue.seats()[0].set_occupied(true);
        let observers = Arc::new(ObserverRegistry::new());
        let strategy = DeadlockStrategy::new(&config(1, 1000, PairSelection::Random));

        let result = strategy.execute(&venue, &mut worker(0, &observers)).await;
        assert_eq!(result, Err(ClaimError::PairUnavailable { index: ResourceIndex(0) }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_held_second_lock_times_out_as_deadlock() {
        let venue = Venue::paired(1);
        let observers = Arc::new(ObserverRegistry::new());
        let pair = venue.pair(ResourceIndex(0)).unwrap();
        // Someone else sits on the snack; the seat-first worker can never finish.
        let _snack = pair.snack_lock.lock().await;

        let strategy = DeadlockAvoidanceStrategy::new(&config(1, 10, PairSelection::Random));
        let result = strategy.execute(&venue, &mut worker(0, &observers)).await;

        assert!(matches!(result, Err(ClaimError::AcquisitionTimeout { .. })));
        assert!(pair.is_deadlocked());
        assert!(!pair.seat.is_occupied());
        assert_eq!(pair.seat.holders(), vec![WorkerId(0)]);
        assert_eq!(pair.seat.current_holder(), None);
        assert!(pair.seat_lock.try_lock().is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fixed_order_completes_every_round_robin_pair() {
        let venue = Arc::new(Venue::paired(20));
        let observers = Arc::new(ObserverRegistry::new());
        let strategy = Arc::new(DeadlockAvoidanceStrategy::new(&config(
            1,
            5000,
            PairSelection::RoundRobin,
        )));

        let mut tasks = tokio::task::JoinSet::new();
        for id in 0..20 {
            let venue = venue.clone();
            let strategy = strategy.clone();
            let mut ctx = worker(id, &observers);
            tasks.spawn(async move { strategy.execute(&venue, &mut ctx).await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap().is_ok());
        }

        assert!(venue.seats().iter().all(|seat| seat.is_occupied() && !seat.is_deadlocked()));
        assert!(venue.snacks().iter().all(|snack| snack.is_reserved()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_while_holding_first_lock_releases_it() {
        let venue = Venue::paired(1);
        let observers = Arc::new(ObserverRegistry::new());
        let mut ctx = worker(0, &observers);
        let cancel = ctx.cancel.clone();
        let strategy = DeadlockAvoidanceStrategy::new(&config(10_000, 10_000, PairSelection::Random));

        let attempt = strategy.execute(&venue, &mut ctx);
        tokio::pin!(attempt);
        // Drive the attempt until it is parked in the hold delay.
        assert!(tokio::time::timeout(Duration::from_millis(20), &mut attempt).await.is_err());
        cancel.cancel();

        assert_eq!(attempt.await, Err(ClaimError::Cancelled));
        let pair = venue.pair(ResourceIndex(0)).unwrap();
        assert!(pair.seat_lock.try_lock().is_ok());
        assert_eq!(pair.seat.current_holder(), None);
        assert!(!pair.is_deadlocked());
    }
}
