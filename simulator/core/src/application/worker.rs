// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

use crate::application::observer::ObserverRegistry;
use crate::domain::{ClaimError, WorkerId};

/// Everything one worker carries into its single strategy invocation.
pub struct WorkerContext {
    pub id: WorkerId,
    pub rng: StdRng,
    pub cancel: CancellationToken,
    pub observers: Arc<ObserverRegistry>,
}

impl WorkerContext {
    /// With a run seed the worker's choices are reproducible: the rng is
    /// seeded from `seed ^ worker_id`.
    pub fn new(
        id: WorkerId,
        seed: Option<u64>,
        cancel: CancellationToken,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ id.as_usize() as u64),
            None => StdRng::from_os_rng(),
        };
        Self {
            id,
            rng,
            cancel,
            observers,
        }
    }

    /// Sleep for `duration` unless the run is cancelled first.
    pub async fn suspend(&self, duration: Duration) -> Result<(), ClaimError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClaimError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Emit `claim_failed` and hand the error back, for `return Err(worker.fail(..))`.
    pub fn fail(&self, error: ClaimError) -> ClaimError {
        tracing::trace!(worker_id = %self.id, %error, "claim failed");
        self.observers.claim_failed(self.id);
        error
    }
}

impl std::fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
