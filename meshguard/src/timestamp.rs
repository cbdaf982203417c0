//! Freshness timestamp side file.
//!
//! A single decimal Unix timestamp recording when the live mesh was last known
//! to be fresh. Anything that cannot be read back as a non-negative integer
//! counts as "no timestamp", which makes the next check bootstrap a new one.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MeshError, MeshResult};

/// Reads and writes the freshness timestamp file.
#[derive(Debug, Clone)]
pub struct TimestampStore {
    path: PathBuf,
}

impl TimestampStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored timestamp, or `None` if missing or malformed.
    pub fn read(&self) -> Option<i64> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No readable timestamp file");
                return None;
            }
        };

        match raw.trim().parse::<i64>() {
            Ok(ts) if ts >= 0 => Some(ts),
            _ => {
                debug!(path = %self.path.display(), contents = %raw.trim(), "Ignoring malformed timestamp");
                None
            }
        }
    }

    /// Overwrite the stored timestamp.
    pub fn write(&self, ts: i64) -> MeshResult<()> {
        fs::write(&self.path, ts.to_string()).map_err(|e| MeshError::write(&self.path, e))
    }
}
