//! Mesh manager: runs one staleness check against the files on disk.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::{assess, CheckOutcome, Freshness};
use crate::clock::{Clock, SystemClock};
use crate::config::MeshGuardConfig;
use crate::error::{MeshError, MeshResult};
use crate::ledger::WriteLedger;
use crate::lock::{FlockProbe, UsageProbe};
use crate::section;
use crate::timestamp::TimestampStore;

/// Snapshot of the mesh state, read without modifying anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshStatus {
    /// Current time used for the assessment.
    pub now: i64,

    /// Stored freshness timestamp.
    pub timestamp: Option<i64>,

    /// Freshness of the live mesh.
    pub freshness: Freshness,

    /// Bed mesh profiles present in `printer.cfg`, or `None` if the file is missing.
    pub profiles: Option<Vec<String>>,
}

impl MeshStatus {
    /// Whether `printer.cfg` contains a section called `name`.
    pub fn has_profile(&self, name: &str) -> bool {
        self.profiles
            .as_ref()
            .is_some_and(|p| p.iter().any(|n| n == name))
    }
}

/// Applies the staleness policy to `printer.cfg` and the timestamp file.
///
/// Holds no document state between calls; each [`check`](Self::check) reads
/// the files fresh.
pub struct MeshManager {
    config: MeshGuardConfig,
    store: TimestampStore,
    probe: Arc<dyn UsageProbe>,
    clock: Arc<dyn Clock>,
    ledger: Arc<WriteLedger>,
}

impl std::fmt::Debug for MeshManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshManager")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl MeshManager {
    /// Create a manager with explicit collaborators.
    pub fn new(
        config: MeshGuardConfig,
        probe: Arc<dyn UsageProbe>,
        clock: Arc<dyn Clock>,
        ledger: Arc<WriteLedger>,
    ) -> Self {
        let store = TimestampStore::new(config.timestamp_file.clone());
        Self {
            config,
            store,
            probe,
            clock,
            ledger,
        }
    }

    /// Create a manager using the system clock and the `flock` probe.
    pub fn with_defaults(config: MeshGuardConfig) -> Self {
        Self::new(
            config,
            Arc::new(FlockProbe),
            Arc::new(SystemClock),
            Arc::new(WriteLedger::new()),
        )
    }

    pub fn config(&self) -> &MeshGuardConfig {
        &self.config
    }

    pub fn store(&self) -> &TimestampStore {
        &self.store
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn ledger(&self) -> Arc<WriteLedger> {
        Arc::clone(&self.ledger)
    }

    /// Run one staleness check.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp cannot be written or `printer.cfg`
    /// is missing or unreadable when a demotion is due. An in-use file is not
    /// an error; it yields [`CheckOutcome::Deferred`].
    pub fn check(&self) -> MeshResult<CheckOutcome> {
        let now = self.clock.now();
        let stored = self.store.read();

        match assess(now, stored, self.config.max_age_secs()) {
            Freshness::NoTimestamp => {
                info!(timestamp = now, "No timestamp found, creating new timestamp");
                self.store.write(now)?;
                Ok(CheckOutcome::TimestampCreated { timestamp: now })
            }
            Freshness::Fresh { age_secs } => {
                info!(age_secs, "Mesh is up to date");
                Ok(CheckOutcome::UpToDate { age_secs })
            }
            Freshness::Stale { age_secs } => {
                info!(
                    age_secs,
                    max_age_secs = self.config.max_age_secs(),
                    from = %self.config.active_profile,
                    to = %self.config.outdated_profile,
                    "Mesh is stale, attempting to rename"
                );
                self.demote(age_secs)
            }
        }
    }

    /// Rename the live mesh to the outdated profile, unless the file is busy.
    fn demote(&self, age_secs: i64) -> MeshResult<CheckOutcome> {
        let path = &self.config.printer_cfg;
        let active = self.config.active_profile.as_str();
        let outdated = self.config.outdated_profile.as_str();

        if self.probe.is_in_use(path)? {
            warn!(path = %path.display(), "Printer config is in use, will try again later");
            return Ok(CheckOutcome::Deferred { age_secs });
        }

        let original = read_document(path)?;
        if section::extract(&original, active).is_none() {
            info!(profile = active, "No live mesh to rename");
            return Ok(CheckOutcome::NothingToDemote { age_secs });
        }

        let cleared = section::delete(&original, outdated);
        let demoted = section::rename(&cleared, active, outdated);

        self.write_back(path, &demoted)?;

        info!(from = active, to = outdated, "Renamed stale mesh");
        Ok(CheckOutcome::Demoted { age_secs })
    }

    /// Write `contents` to `path`, on record in the ledger while it lands.
    ///
    /// The record goes in first so events raised by the write itself are
    /// recognised, and is dropped again if the write fails.
    fn write_back(&self, path: &Path, contents: &str) -> MeshResult<()> {
        self.ledger.record(contents);
        fs::write(path, contents).map_err(|e| {
            self.ledger.clear();
            MeshError::write(path, e)
        })
    }

    /// Read the current state without changing anything.
    pub fn status(&self) -> MeshResult<MeshStatus> {
        let now = self.clock.now();
        let timestamp = self.store.read();
        let freshness = assess(now, timestamp, self.config.max_age_secs());

        let profiles = match read_document(&self.config.printer_cfg) {
            Ok(doc) => Some(
                section::sections(&doc)
                    .iter()
                    .map(|s| s.name.to_string())
                    .collect(),
            ),
            Err(MeshError::ConfigMissing { .. }) => None,
            Err(e) => return Err(e),
        };

        Ok(MeshStatus {
            now,
            timestamp,
            freshness,
            profiles,
        })
    }
}

fn read_document(path: &Path) -> MeshResult<String> {
    fs::read_to_string(path).map_err(|e| MeshError::read(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    const MAX_AGE: i64 = 12 * 3600;

    /// Probe with a switchable answer that counts how often it was asked.
    #[derive(Default)]
    struct StubProbe {
        in_use: AtomicBool,
        calls: AtomicUsize,
    }

    impl UsageProbe for StubProbe {
        fn is_in_use(&self, _path: &Path) -> MeshResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.in_use.load(Ordering::SeqCst))
        }
    }

    struct Fixture {
        temp: TempDir,
        clock: Arc<ManualClock>,
        probe: Arc<StubProbe>,
        manager: MeshManager,
    }

    impl Fixture {
        fn new(now: i64) -> Self {
            let temp = TempDir::new().unwrap();
            let clock = Arc::new(ManualClock::new(now));
            let probe = Arc::new(StubProbe::default());
            let manager = MeshManager::new(
                MeshGuardConfig::in_dir(temp.path()),
                probe.clone(),
                clock.clone(),
                Arc::new(WriteLedger::new()),
            );
            Self {
                temp,
                clock,
                probe,
                manager,
            }
        }

        fn write_cfg(&self, contents: &str) {
            fs::write(self.temp.path().join("printer.cfg"), contents).unwrap();
        }

        fn read_cfg(&self) -> String {
            fs::read_to_string(self.temp.path().join("printer.cfg")).unwrap()
        }
    }

    #[test]
    fn test_first_run_creates_timestamp() {
        let fx = Fixture::new(1000);
        fx.write_cfg("#*# [bed_mesh session_mesh]\nA\n");

        let outcome = fx.manager.check().unwrap();

        assert_eq!(outcome, CheckOutcome::TimestampCreated { timestamp: 1000 });
        assert_eq!(fx.manager.store().read(), Some(1000));
        assert_eq!(fx.read_cfg(), "#*# [bed_mesh session_mesh]\nA\n");
        assert_eq!(fx.probe.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_first_run_does_not_need_printer_cfg() {
        let fx = Fixture::new(1000);
        assert!(fx.manager.check().is_ok());
    }

    #[test]
    fn test_malformed_timestamp_bootstraps() {
        let fx = Fixture::new(5000);
        fs::write(fx.manager.store().path(), "garbage").unwrap();
        assert_eq!(
            fx.manager.check().unwrap(),
            CheckOutcome::TimestampCreated { timestamp: 5000 }
        );
    }

    #[test]
    fn test_fresh_mesh_is_left_alone() {
        let fx = Fixture::new(1000 + MAX_AGE);
        fx.manager.store().write(1000).unwrap();
        fx.write_cfg("#*# [bed_mesh session_mesh]\nA\n");

        assert_eq!(
            fx.manager.check().unwrap(),
            CheckOutcome::UpToDate { age_secs: MAX_AGE }
        );
        assert_eq!(fx.read_cfg(), "#*# [bed_mesh session_mesh]\nA\n");
        assert_eq!(fx.probe.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_mesh_is_demoted() {
        let fx = Fixture::new(1000 + MAX_AGE + 1);
        fx.manager.store().write(1000).unwrap();
        fx.write_cfg("#*# [bed_mesh session_mesh]\nA\nB\n");

        assert_eq!(
            fx.manager.check().unwrap(),
            CheckOutcome::Demoted {
                age_secs: MAX_AGE + 1
            }
        );
        assert_eq!(fx.read_cfg(), "#*# [bed_mesh outdated_session_mesh]\nA\nB\n");
        // Demotion does not reset the clock.
        assert_eq!(fx.manager.store().read(), Some(1000));
    }

    #[test]
    fn test_stale_mesh_replaces_previous_backup() {
        let fx = Fixture::new(100_000);
        fx.manager.store().write(0).unwrap();
        fx.write_cfg(
            "[printer]\n\
             #*# [bed_mesh outdated_session_mesh]\n#*# old\n\
             #*# [bed_mesh session_mesh]\n#*# new\n\
             #*# [probe]\n#*# z_offset = 1\n",
        );

        fx.manager.check().unwrap();

        assert_eq!(
            fx.read_cfg(),
            "[printer]\n\
             #*# [bed_mesh outdated_session_mesh]\n#*# new\n\
             #*# [probe]\n#*# z_offset = 1\n"
        );
    }

    #[test]
    fn test_in_use_file_defers() {
        let fx = Fixture::new(1000 + MAX_AGE + 1);
        fx.manager.store().write(1000).unwrap();
        fx.write_cfg("#*# [bed_mesh session_mesh]\nA\nB\n");
        fx.probe.in_use.store(true, Ordering::SeqCst);

        assert_eq!(
            fx.manager.check().unwrap(),
            CheckOutcome::Deferred {
                age_secs: MAX_AGE + 1
            }
        );
        assert_eq!(fx.read_cfg(), "#*# [bed_mesh session_mesh]\nA\nB\n");

        // Next cycle, file released: demotion goes ahead.
        fx.probe.in_use.store(false, Ordering::SeqCst);
        fx.clock.advance(3600);
        assert!(matches!(
            fx.manager.check().unwrap(),
            CheckOutcome::Demoted { .. }
        ));
        assert_eq!(fx.read_cfg(), "#*# [bed_mesh outdated_session_mesh]\nA\nB\n");
    }

    #[test]
    fn test_repeated_demotion_keeps_backup() {
        let fx = Fixture::new(100_000);
        fx.manager.store().write(0).unwrap();
        fx.write_cfg("#*# [bed_mesh session_mesh]\nA\n");

        fx.manager.check().unwrap();
        fx.clock.advance(3600);
        let outcome = fx.manager.check().unwrap();

        assert!(matches!(outcome, CheckOutcome::NothingToDemote { .. }));
        assert_eq!(fx.read_cfg(), "#*# [bed_mesh outdated_session_mesh]\nA\n");
    }

    #[test]
    fn test_missing_printer_cfg_is_an_error_when_stale() {
        let temp = TempDir::new().unwrap();
        let manager = MeshManager::new(
            MeshGuardConfig::in_dir(temp.path()),
            Arc::new(FlockProbe),
            Arc::new(ManualClock::new(100_000)),
            Arc::new(WriteLedger::new()),
        );
        manager.store().write(0).unwrap();

        assert!(matches!(
            manager.check(),
            Err(MeshError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn test_demotion_is_recorded_in_ledger() {
        let fx = Fixture::new(100_000);
        fx.manager.store().write(0).unwrap();
        fx.write_cfg("#*# [bed_mesh session_mesh]\nA\n");

        fx.manager.check().unwrap();

        let ledger = fx.manager.ledger();
        let later = Instant::now() + Duration::from_secs(3600);
        assert!(ledger.is_own_write(Some(&fx.read_cfg()), later, Duration::from_secs(5)));
    }

    #[test]
    fn test_failed_write_leaves_no_ledger_record() {
        let fx = Fixture::new(100_000);
        let path = fx.temp.path().join("missing").join("printer.cfg");

        let result = fx.manager.write_back(&path, "#*# [bed_mesh outdated_session_mesh]\n");

        assert!(matches!(result, Err(MeshError::WriteFailed { .. })));
        assert!(!fx.manager.ledger().has_record());
    }

    #[test]
    fn test_status_reports_profiles() {
        let fx = Fixture::new(2000);
        fx.manager.store().write(1000).unwrap();
        fx.write_cfg("#*# [bed_mesh default]\n#*# a\n#*# [bed_mesh session_mesh]\n#*# b\n");

        let status = fx.manager.status().unwrap();

        assert_eq!(status.timestamp, Some(1000));
        assert_eq!(status.freshness, Freshness::Fresh { age_secs: 1000 });
        assert!(status.has_profile("session_mesh"));
        assert!(!status.has_profile("outdated_session_mesh"));
        assert_eq!(
            status.profiles,
            Some(vec!["default".to_string(), "session_mesh".to_string()])
        );
    }

    #[test]
    fn test_status_without_files() {
        let fx = Fixture::new(2000);
        let status = fx.manager.status().unwrap();
        assert_eq!(status.freshness, Freshness::NoTimestamp);
        assert_eq!(status.profiles, None);
        // Status never writes.
        assert_eq!(fx.manager.store().read(), None);
    }
}
