// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Contended Resources
//!
//! - [`Seat`] — the exclusive unit of contention.
//! - [`Snack`] — secondary unit paired 1:1 with the seat of the same index,
//!   present only in two-resource scenarios.
//! - [`Venue`] — owns every seat, snack and the per-resource locks used by
//!   the two-resource strategies.
//!
//! State flags are atomics and holder logs sit behind their own small mutex,
//! so a strategy that deliberately skips broader synchronization still races
//! on the check-then-act window rather than on memory.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::domain::claim::WorkerId;

const NO_HOLDER: usize = usize::MAX;

/// Index of a seat (and of its paired snack) in `[0, resourceCount)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIndex(pub usize);

impl ResourceIndex {
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn load_holder(slot: &AtomicUsize) -> Option<WorkerId> {
    match slot.load(Ordering::Acquire) {
        NO_HOLDER => None,
        id => Some(WorkerId(id)),
    }
}

fn store_holder(slot: &AtomicUsize, holder: Option<WorkerId>) {
    slot.store(holder.map_or(NO_HOLDER, WorkerId::as_usize), Ordering::Release);
}

/// A bookable seat.
///
/// # Invariants
///
/// - `holder_log.len() > 1` implies `has_collision()`.
/// - The holder log is append-only between resets.
#[derive(Debug)]
pub struct Seat {
    index: ResourceIndex,
    occupied: AtomicBool,
    collision: AtomicBool,
    deadlocked: AtomicBool,
    current_holder: AtomicUsize,
    holder_log: Mutex<Vec<WorkerId>>,
}

impl Seat {
    pub fn new(index: ResourceIndex) -> Self {
        Self {
            index,
            occupied: AtomicBool::new(false),
            collision: AtomicBool::new(false),
            deadlocked: AtomicBool::new(false),
            current_holder: AtomicUsize::new(NO_HOLDER),
            holder_log: Mutex::new(Vec::new()),
        }
    }

    pub fn index(&self) -> ResourceIndex {
        self.index
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }

    pub fn set_occupied(&self, occupied: bool) {
        self.occupied.store(occupied, Ordering::Release);
    }

    pub fn has_collision(&self) -> bool {
        self.collision.load(Ordering::Acquire)
    }

    pub fn mark_collision(&self) {
        self.collision.store(true, Ordering::Release);
    }

    pub fn is_deadlocked(&self) -> bool {
        self.deadlocked.load(Ordering::Acquire)
    }

    pub fn mark_deadlocked(&self) {
        self.deadlocked.store(true, Ordering::Release);
    }

    /// Worker currently holding this seat's lock; only meaningful while the lock is held.
    pub fn current_holder(&self) -> Option<WorkerId> {
        load_holder(&self.current_holder)
    }

    pub fn set_current_holder(&self, holder: Option<WorkerId>) {
        store_holder(&self.current_holder, holder);
    }

    /// Append `worker` to the holder log and return the new log length.
    /// A second entry flags the seat as collided.
    pub fn record_holder(&self, worker: WorkerId) -> usize {
        let mut log = self.holder_log.lock();
        log.push(worker);
        let len = log.len();
        if len > 1 {
            self.mark_collision();
        }
        len
    }

    pub fn holders(&self) -> Vec<WorkerId> {
        self.holder_log.lock().clone()
    }

    pub fn holder_count(&self) -> usize {
        self.holder_log.lock().len()
    }

    /// Human readable occupancy, e.g. `COLLISION!\nBooked by workers: #3, #8 and #11`.
    pub fn describe(&self) -> String {
        let holders = self.holders();
        match holders.as_slice() {
            [] => "Empty seat".to_string(),
            [only] if !self.has_collision() => format!("Seat booked by Worker #{}", only),
            _ => {
                let mut text = String::from("COLLISION!\nBooked by workers: ");
                let last = holders.len() - 1;
                for (i, worker) in holders.iter().enumerate() {
                    if i > 0 {
                        text.push_str(if i == last { " and " } else { ", " });
                    }
                    text.push('#');
                    text.push_str(&worker.to_string());
                }
                text
            }
        }
    }

    pub fn reset(&self) {
        self.occupied.store(false, Ordering::Release);
        self.collision.store(false, Ordering::Release);
        self.deadlocked.store(false, Ordering::Release);
        self.set_current_holder(None);
        self.holder_log.lock().clear();
    }
}

/// The snack paired with the seat of the same index.
#[derive(Debug)]
pub struct Snack {
    index: ResourceIndex,
    reserved: AtomicBool,
    deadlocked: AtomicBool,
    current_holder: AtomicUsize,
}

impl Snack {
    pub fn new(index: ResourceIndex) -> Self {
        Self {
            index,
            reserved: AtomicBool::new(false),
            deadlocked: AtomicBool::new(false),
            current_holder: AtomicUsize::new(NO_HOLDER),
        }
    }

    pub fn index(&self) -> ResourceIndex {
        self.index
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved.load(Ordering::Acquire)
    }

    pub fn set_reserved(&self, reserved: bool) {
        self.reserved.store(reserved, Ordering::Release);
    }

    pub fn is_deadlocked(&self) -> bool {
        self.deadlocked.load(Ordering::Acquire)
    }

    pub fn mark_deadlocked(&self) {
        self.deadlocked.store(true, Ordering::Release);
    }

    pub fn current_holder(&self) -> Option<WorkerId> {
        load_holder(&self.current_holder)
    }

    pub fn set_current_holder(&self, holder: Option<WorkerId>) {
        store_holder(&self.current_holder, holder);
    }

    pub fn reset(&self) {
        self.reserved.store(false, Ordering::Release);
        self.deadlocked.store(false, Ordering::Release);
        self.set_current_holder(None);
    }
}

/// Every contended resource of one simulation, plus the per-resource locks
/// used by the two-resource strategies.
#[derive(Debug)]
pub struct Venue {
    seats: Vec<Seat>,
    snacks: Vec<Snack>,
    seat_locks: Vec<tokio::sync::Mutex<()>>,
    snack_locks: Vec<tokio::sync::Mutex<()>>,
}

impl Venue {
    /// Single-resource venue: seats only.
    pub fn seats_only(count: usize) -> Self {
        Self {
            seats: (0..count).map(|i| Seat::new(ResourceIndex(i))).collect(),
            snacks: Vec::new(),
            seat_locks: Vec::new(),
            snack_locks: Vec::new(),
        }
    }

    /// Two-resource venue: `count` seat/snack pairs, each member behind its own lock.
    pub fn paired(count: usize) -> Self {
        Self {
            seats: (0..count).map(|i| Seat::new(ResourceIndex(i))).collect(),
            snacks: (0..count).map(|i| Snack::new(ResourceIndex(i))).collect(),
            seat_locks: (0..count).map(|_| tokio::sync::Mutex::new(())).collect(),
            snack_locks: (0..count).map(|_| tokio::sync::Mutex::new(())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn has_snacks(&self) -> bool {
        !self.snacks.is_empty()
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn snacks(&self) -> &[Snack] {
        &self.snacks
    }

    pub fn seat(&self, index: ResourceIndex) -> Option<&Seat> {
        self.seats.get(index.0)
    }

    /// Seat, snack and their two locks for `index`. `None` for a seats-only venue.
    pub fn pair(&self, index: ResourceIndex) -> Option<PairHandle<'_>> {
        Some(PairHandle {
            index,
            seat: self.seats.get(index.0)?,
            snack: self.snacks.get(index.0)?,
            seat_lock: self.seat_locks.get(index.0)?,
            snack_lock: self.snack_locks.get(index.0)?,
        })
    }

    /// Clear every flag, holder and holder log.
    pub fn reset(&self) {
        self.seats.iter().for_each(Seat::reset);
        self.snacks.iter().for_each(Snack::reset);
    }
}

/// Borrowed view of one seat/snack pair and its locks.
#[derive(Debug, Clone, Copy)]
pub struct PairHandle<'a> {
    pub index: ResourceIndex,
    pub seat: &'a Seat,
    pub snack: &'a Snack,
    pub seat_lock: &'a tokio::sync::Mutex<()>,
    pub snack_lock: &'a tokio::sync::Mutex<()>,
}

impl PairHandle<'_> {
    pub fn is_deadlocked(&self) -> bool {
        self.seat.is_deadlocked() || self.snack.is_deadlocked()
    }

    pub fn is_taken(&self) -> bool {
        self.seat.is_occupied() || self.snack.is_reserved()
    }

    pub fn mark_deadlocked(&self) {
        self.seat.mark_deadlocked();
        self.snack.mark_deadlocked();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_holder_flags_collision() {
        let seat = Seat::new(ResourceIndex(0));
        assert_eq!(seat.record_holder(WorkerId(1)), 1);
        assert!(!seat.has_collision());

        assert_eq!(seat.record_holder(WorkerId(2)), 2);
        assert!(seat.has_collision());
        assert_eq!(seat.holders(), vec![WorkerId(1), WorkerId(2)]);
    }

    #[test]
    fn test_describe() {
        let seat = Seat::new(ResourceIndex(4));
        assert_eq!(seat.describe(), "Empty seat");

        seat.record_holder(WorkerId(3));
        assert_eq!(seat.describe(), "Seat booked by Worker #3");

        seat.record_holder(WorkerId(8));
        assert_eq!(seat.describe(), "COLLISION!\nBooked by workers: #3 and #8");

        seat.record_holder(WorkerId(11));
        assert_eq!(
            seat.describe(),
            "COLLISION!\nBooked by workers: #3, #8 and #11"
        );
    }

    #[test]
    fn test_current_holder_roundtrip() {
        let snack = Snack::new(ResourceIndex(2));
        assert_eq!(snack.current_holder(), None);
        snack.set_current_holder(Some(WorkerId(42)));
        assert_eq!(snack.current_holder(), Some(WorkerId(42)));
        snack.set_current_holder(None);
        assert_eq!(snack.current_holder(), None);
    }

    #[test]
    fn test_venue_reset_clears_everything() {
        let venue = Venue::paired(3);
        let pair = venue.pair(ResourceIndex(1)).unwrap();
        pair.seat.set_occupied(true);
        pair.seat.record_holder(WorkerId(5));
        pair.seat.record_holder(WorkerId(6));
        pair.snack.set_reserved(true);
        pair.mark_deadlocked();

        venue.reset();

        assert!(!pair.is_taken());
        assert!(!pair.is_deadlocked());
        assert!(!pair.seat.has_collision());
        assert_eq!(pair.seat.holder_count(), 0);
    }

    #[test]
    fn test_seats_only_venue_has_no_pairs() {
        let venue = Venue::seats_only(5);
        assert_eq!(venue.len(), 5);
        assert!(!venue.has_snacks());
        assert!(venue.pair(ResourceIndex(0)).is_none());
        assert!(venue.seat(ResourceIndex(4)).is_some());
        assert!(venue.seat(ResourceIndex(5)).is_none());
    }
}
