//! INI settings file.
//!
//! ```ini
//! [paths]
//! printer_cfg = /home/pi/printer_data/config/printer.cfg
//! timestamp_file = /home/pi/printer_data/config/mesh_timestamp.txt
//!
//! [mesh]
//! active_profile = session_mesh
//! outdated_profile = outdated_session_mesh
//!
//! [timing]
//! check_interval_secs = 3600
//! max_age_secs = 43200
//! debounce_secs = 5
//!
//! [logging]
//! directory = /home/pi/printer_data/logs
//! ```
//!
//! Every key is optional; anything missing keeps its default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use super::{ConfigError, MeshGuardConfig};

/// Default location of the settings file: `<config_dir>/meshguard/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meshguard")
        .join("config.ini")
}

/// Loader and writer for the settings file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new(config_file_path())
    }
}

impl ConfigFile {
    /// Settings file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the settings file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load(&self) -> Result<MeshGuardConfig, ConfigError> {
        if !self.exists() {
            return Ok(MeshGuardConfig::default());
        }

        let ini = Ini::load_from_file(&self.path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: self.path.clone(),
                source,
            },
            ini::Error::Parse(parse) => ConfigError::Parse {
                path: self.path.clone(),
                message: parse.to_string(),
            },
        })?;

        let config = apply(&ini, MeshGuardConfig::default())?;
        config.validate()?;
        Ok(config)
    }

    /// Write `config` to the settings file, creating parent directories.
    pub fn save(&self, config: &MeshGuardConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("paths"))
            .set("printer_cfg", config.printer_cfg.to_string_lossy())
            .set("timestamp_file", config.timestamp_file.to_string_lossy());
        ini.with_section(Some("mesh"))
            .set("active_profile", config.active_profile.as_str())
            .set("outdated_profile", config.outdated_profile.as_str());
        ini.with_section(Some("timing"))
            .set(
                "check_interval_secs",
                config.check_interval.as_secs().to_string(),
            )
            .set("max_age_secs", config.max_age.as_secs().to_string())
            .set("debounce_secs", config.debounce.as_secs().to_string());
        if let Some(ref dir) = config.log_dir {
            ini.with_section(Some("logging"))
                .set("directory", dir.to_string_lossy());
        }

        ini.write_to_file(&self.path)
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

/// Overlay the values present in `ini` on top of `config`.
fn apply(ini: &Ini, mut config: MeshGuardConfig) -> Result<MeshGuardConfig, ConfigError> {
    if let Some(paths) = ini.section(Some("paths")) {
        if let Some(v) = non_empty(paths.get("printer_cfg")) {
            config.printer_cfg = expand_home(v);
        }
        if let Some(v) = non_empty(paths.get("timestamp_file")) {
            config.timestamp_file = expand_home(v);
        }
    }

    if let Some(mesh) = ini.section(Some("mesh")) {
        if let Some(v) = non_empty(mesh.get("active_profile")) {
            config.active_profile = v.to_string();
        }
        if let Some(v) = non_empty(mesh.get("outdated_profile")) {
            config.outdated_profile = v.to_string();
        }
    }

    if let Some(timing) = ini.section(Some("timing")) {
        if let Some(secs) = parse_secs(timing.get("check_interval_secs"), "timing.check_interval_secs")? {
            config.check_interval = secs;
        }
        if let Some(secs) = parse_secs(timing.get("max_age_secs"), "timing.max_age_secs")? {
            config.max_age = secs;
        }
        if let Some(secs) = parse_secs(timing.get("debounce_secs"), "timing.debounce_secs")? {
            config.debounce = secs;
        }
    }

    if let Some(logging) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(logging.get("directory")) {
            config.log_dir = Some(expand_home(v));
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_secs(value: Option<&str>, key: &str) -> Result<Option<Duration>, ConfigError> {
    match non_empty(value) {
        None => Ok(None),
        Some(v) => v
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: v.to_string(),
            }),
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
