// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::claim::WorkerId;
use crate::domain::resource::ResourceIndex;
use crate::domain::stats::SimulationStats;
use crate::domain::strategy::StrategyKind;

/// Serializable form of every observer notification, used by the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    RunStarted {
        strategy: StrategyKind,
        total_workers: usize,
        started_at: DateTime<Utc>,
    },
    RunCompleted {
        stats: SimulationStats,
        completed_at: DateTime<Utc>,
    },
    Progress {
        active: usize,
        completed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },
    WorkerStarted {
        worker_id: WorkerId,
        timestamp: DateTime<Utc>,
    },
    WorkerFinished {
        worker_id: WorkerId,
        timestamp: DateTime<Utc>,
    },
    ResourceClaimed {
        worker_id: WorkerId,
        index: ResourceIndex,
        holders: usize,
        timestamp: DateTime<Utc>,
    },
    ClaimFailed {
        worker_id: WorkerId,
        timestamp: DateTime<Utc>,
    },
    CollisionDetected {
        index: ResourceIndex,
        holders: Vec<WorkerId>,
        timestamp: DateTime<Utc>,
    },
    DeadlockDetected {
        worker_id: WorkerId,
        index: ResourceIndex,
        timestamp: DateTime<Utc>,
    },
    PairComplete {
        worker_id: WorkerId,
        index: ResourceIndex,
        timestamp: DateTime<Utc>,
    },
    WorkerStuck {
        worker_id: WorkerId,
        waited_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl SimulationEvent {
    /// Snake-case event name, matching the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            SimulationEvent::RunStarted { .. } => "run_started",
            SimulationEvent::RunCompleted { .. } => "run_completed",
            SimulationEvent::Progress { .. } => "progress",
            SimulationEvent::WorkerStarted { .. } => "worker_started",
            SimulationEvent::WorkerFinished { .. } => "worker_finished",
            SimulationEvent::ResourceClaimed { .. } => "resource_claimed",
            SimulationEvent::ClaimFailed { .. } => "claim_failed",
            SimulationEvent::CollisionDetected { .. } => "collision_detected",
            SimulationEvent::DeadlockDetected { .. } => "deadlock_detected",
            SimulationEvent::PairComplete { .. } => "pair_complete",
            SimulationEvent::WorkerStuck { .. } => "worker_stuck",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag_matches_name() {
        let event = SimulationEvent::CollisionDetected {
            index: ResourceIndex(3),
            holders: vec![WorkerId(1), WorkerId(2)],
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(json["index"], 3);
        assert_eq!(json["holders"], serde_json::json!([1, 2]));
    }
}
