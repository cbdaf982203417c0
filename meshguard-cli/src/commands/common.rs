//! Helpers shared across CLI commands.

use std::path::PathBuf;

use meshguard::{ConfigFile, MeshGuardConfig};

use crate::error::CliError;

/// Settings file from `--config`, or the default location.
pub fn settings_file(path: Option<PathBuf>) -> ConfigFile {
    path.map(ConfigFile::new).unwrap_or_default()
}

/// Load settings, falling back to defaults when the file does not exist.
pub fn load_settings(file: &ConfigFile) -> Result<MeshGuardConfig, CliError> {
    Ok(file.load()?)
}

/// Print where settings and mesh files live.
pub fn print_paths(file: &ConfigFile, config: &MeshGuardConfig) {
    let origin = if file.exists() { "" } else { " (not found, using defaults)" };
    println!("Settings:   {}{}", file.path().display(), origin);
    println!("Printer:    {}", config.printer_cfg.display());
    println!("Timestamp:  {}", config.timestamp_file.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_settings_file_uses_explicit_path() {
        let file = settings_file(Some(PathBuf::from("/tmp/meshguard.ini")));
        assert_eq!(file.path(), PathBuf::from("/tmp/meshguard.ini").as_path());
    }

    #[test]
    fn test_load_settings_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let file = settings_file(Some(temp.path().join("absent.ini")));
        assert_eq!(load_settings(&file).unwrap(), MeshGuardConfig::default());
    }

    #[test]
    fn test_load_settings_reads_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[timing]\nmax_age_secs = 600\n").unwrap();

        let config = load_settings(&settings_file(Some(path))).unwrap();

        assert_eq!(config.max_age, Duration::from_secs(600));
    }

    #[test]
    fn test_load_settings_rejects_bad_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[timing]\ncheck_interval_secs = hourly\n").unwrap();

        assert!(matches!(
            load_settings(&settings_file(Some(path))),
            Err(CliError::Config(_))
        ));
    }
}
