//! Periodic staleness checks.
//!
//! The scheduler runs [`MeshManager::check`] once immediately and then on a
//! fixed interval until its cancellation token fires. The check itself does
//! blocking file I/O and runs on the blocking pool. Cancellation is only
//! observed between checks, so a rename that has started always finishes.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{MeshError, MeshResult};
use crate::policy::{CheckOutcome, MeshManager};

/// Drives the staleness policy on a fixed interval.
#[derive(Debug, Clone)]
pub struct Scheduler {
    manager: Arc<MeshManager>,
    interval: Duration,
}

impl Scheduler {
    /// Scheduler for `manager`, checking every `interval`.
    ///
    /// # Panics
    ///
    /// [`run`](Self::run) panics if `interval` is zero; settings loaded
    /// through [`MeshGuardConfig::validate`](crate::config::MeshGuardConfig::validate)
    /// never are.
    pub fn new(manager: Arc<MeshManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single check on the blocking pool.
    pub async fn run_once(&self) -> MeshResult<CheckOutcome> {
        let manager = Arc::clone(&self.manager);
        tokio::task::spawn_blocking(move || manager.check())
            .await
            .map_err(|e| MeshError::TaskFailed(e.to_string()))?
    }

    /// Check now and then every interval until `shutdown` is cancelled.
    ///
    /// Errors from individual checks are logged and the loop carries on.
    /// Returns the number of checks performed.
    pub async fn run(self, shutdown: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            "Scheduler started"
        );

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            cycles += 1;
            match self.run_once().await {
                Ok(outcome) => info!(cycle = cycles, %outcome, "Mesh check complete"),
                Err(e) => error!(cycle = cycles, error = %e, "Mesh check failed, retrying next interval"),
            }
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}
