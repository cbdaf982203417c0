//! Runtime settings for meshguard.
//!
//! [`MeshGuardConfig`] carries every path, profile name and timing constant
//! the components need. It is built once at startup (from defaults or from a
//! settings file via [`ConfigFile`]) and handed to each component, so tests
//! can point everything at temporary paths.

mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub use file::{config_file_path, ConfigFile};

/// How often the staleness check runs (1 hour).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60 * 60;

/// Age after which the active mesh is considered stale (12 hours).
pub const DEFAULT_MAX_AGE_SECS: u64 = 12 * 60 * 60;

/// Minimum gap between two timestamp resets from the watcher.
///
/// The firmware writes `printer.cfg` in bursts when saving; only the first
/// write of a burst resets the clock.
pub const DEFAULT_DEBOUNCE_SECS: u64 = 5;

/// Profile name of the mesh the firmware loads on startup.
pub const ACTIVE_PROFILE: &str = "session_mesh";

/// Profile name the stale mesh is parked under.
pub const OUTDATED_PROFILE: &str = "outdated_session_mesh";

/// File name of the printer configuration inside the config directory.
pub const PRINTER_CFG_FILENAME: &str = "printer.cfg";

/// File name of the freshness timestamp inside the config directory.
pub const TIMESTAMP_FILENAME: &str = "mesh_timestamp.txt";

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read or written.
    #[error("settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The settings file is not valid INI.
    #[error("failed to parse settings file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A key holds a value of the wrong type.
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    /// The combination of settings is unusable.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Settings shared by every meshguard component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshGuardConfig {
    /// Path of the firmware's `printer.cfg`.
    pub printer_cfg: PathBuf,

    /// Path of the freshness timestamp side file.
    pub timestamp_file: PathBuf,

    /// Section name of the live mesh.
    pub active_profile: String,

    /// Section name the live mesh is renamed to once stale.
    pub outdated_profile: String,

    /// Interval between scheduled staleness checks.
    pub check_interval: Duration,

    /// Maximum age of the live mesh before it is demoted.
    pub max_age: Duration,

    /// Debounce window for filesystem change events.
    pub debounce: Duration,

    /// Optional directory for a log file in addition to stdout.
    pub log_dir: Option<PathBuf>,
}

impl Default for MeshGuardConfig {
    fn default() -> Self {
        Self::in_dir(default_printer_config_dir())
    }
}

impl MeshGuardConfig {
    /// Settings with both files placed inside `dir` and default timings.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            printer_cfg: dir.join(PRINTER_CFG_FILENAME),
            timestamp_file: dir.join(TIMESTAMP_FILENAME),
            active_profile: ACTIVE_PROFILE.to_string(),
            outdated_profile: OUTDATED_PROFILE.to_string(),
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            max_age: Duration::from_secs(DEFAULT_MAX_AGE_SECS),
            debounce: Duration::from_secs(DEFAULT_DEBOUNCE_SECS),
            log_dir: None,
        }
    }

    /// Set the printer configuration path.
    pub fn with_printer_cfg(mut self, path: impl Into<PathBuf>) -> Self {
        self.printer_cfg = path.into();
        self
    }

    /// Set the timestamp file path.
    pub fn with_timestamp_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.timestamp_file = path.into();
        self
    }

    /// Set the live and outdated profile names.
    pub fn with_profiles(
        mut self,
        active: impl Into<String>,
        outdated: impl Into<String>,
    ) -> Self {
        self.active_profile = active.into();
        self.outdated_profile = outdated.into();
        self
    }

    /// Set the check interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Set the maximum mesh age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the watcher debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the log directory.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Maximum age in whole seconds, as compared against epoch timestamps.
    pub fn max_age_secs(&self) -> i64 {
        i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX)
    }

    /// Check that the settings can drive the service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active_profile.trim().is_empty() || self.outdated_profile.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "profile names must not be empty".to_string(),
            ));
        }
        if self.active_profile == self.outdated_profile {
            return Err(ConfigError::Invalid(format!(
                "active and outdated profile are both '{}'",
                self.active_profile
            )));
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "check interval must be greater than zero".to_string(),
            ));
        }
        if self.printer_cfg.file_name().is_none() {
            return Err(ConfigError::Invalid(format!(
                "printer config path {} has no file name",
                self.printer_cfg.display()
            )));
        }
        Ok(())
    }
}

/// `~/printer_data/config`, the directory Klipper installs keep their config in.
pub fn default_printer_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("printer_data")
        .join("config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_printer_data() {
        let config = MeshGuardConfig::default();
        assert!(config.printer_cfg.ends_with("printer_data/config/printer.cfg"));
        assert!(config
            .timestamp_file
            .ends_with("printer_data/config/mesh_timestamp.txt"));
        assert_eq!(config.active_profile, "session_mesh");
        assert_eq!(config.outdated_profile, "outdated_session_mesh");
        assert_eq!(config.check_interval, Duration::from_secs(3600));
        assert_eq!(config.max_age, Duration::from_secs(43200));
        assert_eq!(config.debounce, Duration::from_secs(5));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = MeshGuardConfig::in_dir("/tmp/printer")
            .with_printer_cfg("/tmp/other.cfg")
            .with_profiles("default", "stale")
            .with_check_interval(Duration::from_secs(60))
            .with_max_age(Duration::from_secs(120))
            .with_debounce(Duration::from_secs(1))
            .with_log_dir("/tmp/logs");

        assert_eq!(config.printer_cfg, PathBuf::from("/tmp/other.cfg"));
        assert_eq!(
            config.timestamp_file,
            PathBuf::from("/tmp/printer/mesh_timestamp.txt")
        );
        assert_eq!(config.active_profile, "default");
        assert_eq!(config.outdated_profile, "stale");
        assert_eq!(config.max_age_secs(), 120);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_identical_profiles() {
        let config = MeshGuardConfig::in_dir("/tmp").with_profiles("mesh", "mesh");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = MeshGuardConfig::in_dir("/tmp").with_check_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_profile() {
        let config = MeshGuardConfig::in_dir("/tmp").with_profiles(" ", "outdated");
        assert!(config.validate().is_err());
    }
}
