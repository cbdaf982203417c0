//! Service lifecycle.
//!
//! [`MeshGuardService`] wires the components together for the lifetime of
//! the process:
//!
//! 1. Validate settings
//! 2. Start the change watcher (fatal if the directory cannot be watched)
//! 3. Run the scheduler until the shutdown token fires
//! 4. Stop the watcher
//!
//! The watcher and the scheduler share no channel. They meet only on disk
//! (timestamp file, `printer.cfg`) and through the write ledger.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::MeshGuardConfig;
use crate::error::MeshResult;
use crate::policy::MeshManager;
use crate::scheduler::Scheduler;
use crate::watcher::ChangeWatcher;

/// A running meshguard instance: change watcher plus periodic checks.
#[derive(Debug)]
pub struct MeshGuardService {
    manager: Arc<MeshManager>,
    watcher: Option<ChangeWatcher>,
}

impl MeshGuardService {
    /// Start with the system clock and `flock` probe.
    pub fn start(config: MeshGuardConfig) -> MeshResult<Self> {
        Self::start_with(MeshManager::with_defaults(config))
    }

    /// Start around an existing manager.
    ///
    /// # Errors
    ///
    /// Fails if the settings are invalid or the watcher cannot be started.
    pub fn start_with(manager: MeshManager) -> MeshResult<Self> {
        let config = manager.config();
        config.validate()?;

        info!("Mesh manager service started");
        info!(
            printer_cfg = %config.printer_cfg.display(),
            timestamp_file = %config.timestamp_file.display(),
            max_age_secs = config.max_age_secs(),
            "Monitoring printer config"
        );

        let watcher = ChangeWatcher::start(config, manager.clock(), manager.ledger())?;

        Ok(Self {
            manager: Arc::new(manager),
            watcher: Some(watcher),
        })
    }

    pub fn manager(&self) -> Arc<MeshManager> {
        Arc::clone(&self.manager)
    }

    /// Whether the change watcher is still running.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Run checks until `shutdown` is cancelled, then stop the watcher.
    ///
    /// Returns the number of checks performed.
    pub async fn run(mut self, shutdown: CancellationToken) -> u64 {
        let interval = self.manager.config().check_interval;
        let cycles = Scheduler::new(Arc::clone(&self.manager), interval)
            .run(shutdown)
            .await;
        self.stop_watcher();
        info!("Mesh manager service stopped");
        cycles
    }

    /// Stop the watcher without running the scheduler.
    pub fn shutdown(mut self) {
        self.stop_watcher();
        info!("Mesh manager service stopped");
    }

    fn stop_watcher(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
    }
}
