//! CLI error type.

use std::fmt;

use meshguard::config::ConfigError;
use meshguard::MeshError;

/// Errors reported by CLI commands. Any of them ends the process with exit code 1.
#[derive(Debug)]
pub enum CliError {
    /// Settings could not be loaded or written.
    Config(ConfigError),
    /// A mesh operation failed.
    Mesh(MeshError),
    /// The async runtime could not be created.
    Runtime(std::io::Error),
    /// The interrupt handler could not be installed.
    Signal(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Mesh(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::Signal(msg) => write!(f, "Failed to set signal handler: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Mesh(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Signal(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<MeshError> for CliError {
    fn from(e: MeshError) -> Self {
        CliError::Mesh(e)
    }
}
