// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Simulation Events
//
// Bridges the synchronous observer fan-out to tokio broadcast channels so the
// CLI (or any async consumer) can stream a run as serializable events.
//
// In-memory only: a subscriber that falls behind by more than the channel
// capacity loses the oldest events and is told how many it missed.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::application::SimulationObserver;
use crate::domain::{SimulationEvent, WorkerId};

/// Event bus for publishing and subscribing to simulation events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<SimulationEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (4096)
    pub fn with_default_capacity() -> Self {
        Self::new(4096)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SimulationEvent) {
        trace!(event = event.name(), "Publishing event");

        // send() only fails when nobody is subscribed
        if self.sender.send(event).is_err() {
            trace!("No subscribers listening to event");
        }
    }

    /// Observer that republishes every notification on this bus
    pub fn observer(&self) -> SimulationObserver {
        let stuck = self.clone();
        let claimed = self.clone();
        let failed = self.clone();
        let collision = self.clone();
        let started = self.clone();
        let finished = self.clone();
        let run_started = self.clone();
        let run_completed = self.clone();
        let progress = self.clone();
        let deadlock = self.clone();
        let pair = self.clone();

        SimulationObserver::new()
            .on_resource_claimed(move |seat, worker_id| {
                claimed.publish(SimulationEvent::ResourceClaimed {
                    worker_id,
                    index: seat.index(),
                    holders: seat.holder_count(),
                    timestamp: Utc::now(),
                })
            })
            .on_claim_failed(move |worker_id| {
                failed.publish(SimulationEvent::ClaimFailed {
                    worker_id,
                    timestamp: Utc::now(),
                })
            })
            .on_collision_detected(move |seat| {
                collision.publish(SimulationEvent::CollisionDetected {
                    index: seat.index(),
                    holders: seat.holders(),
                    timestamp: Utc::now(),
                })
            })
            .on_worker_started(move |worker_id| {
                started.publish(SimulationEvent::WorkerStarted {
                    worker_id,
                    timestamp: Utc::now(),
                })
            })
            .on_worker_finished(move |result| {
                finished.publish(SimulationEvent::WorkerFinished {
                    worker_id: result.worker_id,
                    timestamp: result.timestamp,
                })
            })
            .on_run_started(move |strategy, total_workers| {
                run_started.publish(SimulationEvent::RunStarted {
                    strategy,
                    total_workers,
                    started_at: Utc::now(),
                })
            })
            .on_run_completed(move |stats| {
                run_completed.publish(SimulationEvent::RunCompleted {
                    stats: stats.clone(),
                    completed_at: Utc::now(),
                })
            })
            .on_progress(move |p| {
                progress.publish(SimulationEvent::Progress {
                    active: p.active,
                    completed: p.completed,
                    total: p.total,
                    timestamp: Utc::now(),
                })
            })
            .on_deadlock_detected(move |seat, _snack, worker_id| {
                deadlock.publish(SimulationEvent::DeadlockDetected {
                    worker_id,
                    index: seat.index(),
                    timestamp: Utc::now(),
                })
            })
            .on_pair_complete(move |seat, _snack, worker_id| {
                pair.publish(SimulationEvent::PairComplete {
                    worker_id,
                    index: seat.index(),
                    timestamp: Utc::now(),
                })
            })
            .on_worker_stuck(move |worker_id, waited| {
                stuck.publish(SimulationEvent::WorkerStuck {
                    worker_id,
                    waited_ms: waited.as_millis() as u64,
                    timestamp: Utc::now(),
                })
            })
    }

    /// Subscribe to all simulation events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe and filter for a single worker
    pub fn subscribe_worker(&self, worker_id: WorkerId) -> WorkerEventReceiver {
        WorkerEventReceiver {
            receiver: self.sender.subscribe(),
            worker_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all simulation events
pub struct EventReceiver {
    receiver: broadcast::Receiver<SimulationEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<SimulationEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<SimulationEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for one worker's events (filtered)
pub struct WorkerEventReceiver {
    receiver: broadcast::Receiver<SimulationEvent>,
    worker_id: WorkerId,
}

impl WorkerEventReceiver {
    /// Receive the next event concerning this worker, skipping all others
    pub async fn recv(&mut self) -> Result<SimulationEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if self.matches_worker(&event) {
                return Ok(event);
            }
        }
    }

    fn matches_worker(&self, event: &SimulationEvent) -> bool {
        match event {
            SimulationEvent::WorkerStarted { worker_id, .. }
            | SimulationEvent::WorkerFinished { worker_id, .. }
            | SimulationEvent::ResourceClaimed { worker_id, .. }
            | SimulationEvent::ClaimFailed { worker_id, .. }
            | SimulationEvent::DeadlockDetected { worker_id, .. }
            | SimulationEvent::PairComplete { worker_id, .. }
            | SimulationEvent::WorkerStuck { worker_id, .. } => *worker_id == self.worker_id,
            SimulationEvent::CollisionDetected { holders, .. } => holders.contains(&self.worker_id),
            SimulationEvent::RunStarted { .. }
            | SimulationEvent::RunCompleted { .. }
            | SimulationEvent::Progress { .. } => false,
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
