//! Error types for mesh freshness management.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Result type for meshguard operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors that can occur while checking or rewriting the printer config.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The printer configuration file does not exist.
    #[error("printer config not found: {}", path.display())]
    ConfigMissing { path: PathBuf },

    /// Failed to read a file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The configured printer config path does not name a file.
    #[error("printer config path has no file name: {}", path.display())]
    NoFileName { path: PathBuf },

    /// The filesystem notification backend could not be started.
    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// A blocking check task panicked or was cancelled.
    #[error("check task failed: {0}")]
    TaskFailed(String),

    /// The tracing subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),

    /// Invalid settings.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl MeshError {
    /// Map an I/O error from reading `path`, turning `NotFound` into
    /// [`MeshError::ConfigMissing`].
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::ConfigMissing { path }
        } else {
            Self::ReadFailed { path, source }
        }
    }

    /// Map an I/O error from writing `path`.
    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }
}
