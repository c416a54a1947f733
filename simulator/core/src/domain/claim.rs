// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Claim Value Objects
//!
//! - [`WorkerId`] — identity of one simulated claimant.
//! - [`ClaimOutcome`] — what a strategy invocation achieved.
//! - [`ClaimError`] — why a strategy invocation did not achieve a booking.
//! - [`ClaimResult`] — the per-worker record kept after the worker exits.
//!
//! None of the [`ClaimError`] variants abort a run: every one of them is
//! reported as a failed claim for the worker that hit it.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::resource::ResourceIndex;

/// Identity of a simulated worker, in `[0, workerCount)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

impl WorkerId {
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Successful result of a single strategy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// A seat was marked occupied. `collided` is set when another worker was
    /// already recorded as holder (race strategy only).
    Claimed { index: ResourceIndex, collided: bool },
    /// Both members of a seat/snack pair were committed.
    PairCompleted { index: ResourceIndex },
}

impl ClaimOutcome {
    pub fn index(&self) -> ResourceIndex {
        match self {
            ClaimOutcome::Claimed { index, .. } | ClaimOutcome::PairCompleted { index } => *index,
        }
    }
}

/// Reasons a worker ends without a booking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("no free seat left to claim")]
    NoResourceAvailable,

    #[error("seat/snack pair {index} is already taken or deadlocked")]
    PairUnavailable { index: ResourceIndex },

    #[error("timed out after {waited:?} waiting for the second lock of pair {index}")]
    AcquisitionTimeout { index: ResourceIndex, waited: Duration },

    #[error("pair {index} was marked deadlocked while waiting ({waited:?})")]
    PairDeadlocked { index: ResourceIndex, waited: Duration },

    #[error("worker cancelled")]
    Cancelled,

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

impl ClaimError {
    /// Pair or seat the worker was targeting, when one had been chosen.
    pub fn index(&self) -> Option<ResourceIndex> {
        match self {
            ClaimError::PairUnavailable { index }
            | ClaimError::AcquisitionTimeout { index, .. }
            | ClaimError::PairDeadlocked { index, .. } => Some(*index),
            ClaimError::NoResourceAvailable
            | ClaimError::Cancelled
            | ClaimError::WorkerPanicked(_) => None,
        }
    }

    /// True for the outcomes that leave the worker "stuck" in a detected deadlock.
    pub fn is_deadlock(&self) -> bool {
        matches!(
            self,
            ClaimError::AcquisitionTimeout { .. } | ClaimError::PairDeadlocked { .. }
        )
    }
}

/// Record left behind by a worker after its single strategy invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResult {
    pub worker_id: WorkerId,
    /// Seat (or pair) index the worker ended up on, if any.
    pub resource: Option<ResourceIndex>,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl ClaimResult {
    pub fn from_attempt(worker_id: WorkerId, attempt: &Result<ClaimOutcome, ClaimError>) -> Self {
        match attempt {
            Ok(outcome) => Self {
                worker_id,
                resource: Some(outcome.index()),
                success: true,
                timestamp: Utc::now(),
            },
            Err(err) => Self::failed(worker_id, err.index()),
        }
    }

    pub fn failed(worker_id: WorkerId, resource: Option<ResourceIndex>) -> Self {
        Self {
            worker_id,
            resource,
            success: false,
            timestamp: Utc::now(),
        }
    }

    /// One-line audit entry, e.g. `[1700000000000] Worker #4 -> Seat 17 (SUCCESS)`.
    pub fn to_log_entry(&self) -> String {
        let seat = self
            .resource
            .map(|index| index.to_string())
            .unwrap_or_else(|| "none".to_string());
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        format!(
            "[{}] Worker #{} -> Seat {} ({})",
            self.timestamp.timestamp_millis(),
            self.worker_id,
            seat,
            status
        )
    }
}

impl fmt::Display for ClaimResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.success, self.resource) {
            (true, Some(index)) => write!(f, "Worker #{} booked seat {}", self.worker_id, index),
            _ => write!(f, "Worker #{} failed to book", self.worker_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_from_successful_attempt() {
        let attempt = Ok(ClaimOutcome::Claimed {
            index: ResourceIndex(7),
            collided: false,
        });
        let result = ClaimResult::from_attempt(WorkerId(3), &attempt);

        assert!(result.success);
        assert_eq!(result.resource, Some(ResourceIndex(7)));
        assert_eq!(result.to_string(), "Worker #3 booked seat 7");
        assert!(result.to_log_entry().ends_with("Worker #3 -> Seat 7 (SUCCESS)"));
    }

    #[test]
    fn test_result_from_failed_attempt_keeps_pair_index() {
        let attempt = Err(ClaimError::AcquisitionTimeout {
            index: ResourceIndex(12),
            waited: Duration::from_millis(40),
        });
        let result = ClaimResult::from_attempt(WorkerId(9), &attempt);

        assert!(!result.success);
        assert_eq!(result.resource, Some(ResourceIndex(12)));
        assert_eq!(result.to_string(), "Worker #9 failed to book");
        assert!(result.to_log_entry().ends_with("(FAILED)"));
    }

    #[test]
    fn test_no_resource_failure_has_no_seat() {
        let result = ClaimResult::from_attempt(WorkerId(1), &Err(ClaimError::NoResourceAvailable));
        assert_eq!(result.resource, None);
        assert!(result.to_log_entry().contains("-> Seat none"));
    }

    #[test]
    fn test_deadlock_classification() {
        let index = ResourceIndex(0);
        let waited = Duration::ZERO;
        assert!(ClaimError::AcquisitionTimeout { index, waited }.is_deadlock());
        assert!(ClaimError::PairDeadlocked { index, waited }.is_deadlock());
        assert!(!ClaimError::PairUnavailable { index }.is_deadlock());
        assert!(!ClaimError::Cancelled.is_deadlock());
    }
}
