//! Init command - write a settings file with the defaults.

use meshguard::{ConfigFile, MeshGuardConfig};

use crate::error::CliError;

/// Run the init command.
pub fn run(settings: &ConfigFile, force: bool) -> Result<(), CliError> {
    if write_defaults(settings, force)? {
        println!("Configuration file: {}", settings.path().display());
        println!();
        println!("Edit this file to point meshguard at your printer.cfg.");
    } else {
        println!(
            "Configuration file already exists: {}",
            settings.path().display()
        );
        println!("Use --force to overwrite it with the defaults.");
    }
    Ok(())
}

/// Write default settings unless a file exists and `force` is unset.
/// Returns whether the file was written.
fn write_defaults(settings: &ConfigFile, force: bool) -> Result<bool, CliError> {
    if settings.exists() && !force {
        return Ok(false);
    }
    settings.save(&MeshGuardConfig::default())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_writes_loadable_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = ConfigFile::new(temp.path().join("meshguard").join("config.ini"));

        assert!(write_defaults(&settings, false).unwrap());
        assert_eq!(settings.load().unwrap(), MeshGuardConfig::default());
    }

    #[test]
    fn test_keeps_existing_file_without_force() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[timing]\nmax_age_secs = 60\n").unwrap();
        let settings = ConfigFile::new(&path);

        assert!(!write_defaults(&settings, false).unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[timing]\nmax_age_secs = 60\n"
        );
    }

    #[test]
    fn test_force_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[timing]\nmax_age_secs = 60\n").unwrap();
        let settings = ConfigFile::new(&path);

        assert!(write_defaults(&settings, true).unwrap());
        assert_eq!(settings.load().unwrap(), MeshGuardConfig::default());
    }
}
