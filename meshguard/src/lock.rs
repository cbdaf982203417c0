//! In-use detection for the printer configuration file.
//!
//! Before rewriting `printer.cfg` the policy asks a [`UsageProbe`] whether
//! another process currently holds the file. [`FlockProbe`] opens the file
//! read-write (without truncating) and tries a non-blocking exclusive advisory
//! lock, releasing it straight away. The check is advisory: a writer that
//! never locks the file cannot be detected, and nothing stops a writer from
//! grabbing the file between the probe and our write.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};

/// Reports whether a file is held by another process.
pub trait UsageProbe: Send + Sync {
    /// `Ok(true)` if the file is in use, `Ok(false)` if it may be rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::ConfigMissing`] if the file does not exist.
    fn is_in_use(&self, path: &Path) -> MeshResult<bool>;
}

/// Probe backed by `flock`-style exclusive locks (via `fs2`).
#[derive(Debug, Default, Clone, Copy)]
pub struct FlockProbe;

impl UsageProbe for FlockProbe {
    fn is_in_use(&self, path: &Path) -> MeshResult<bool> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MeshError::ConfigMissing {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot open printer config for writing");
                return Ok(true);
            }
        };

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                if let Err(e) = FileExt::unlock(&file) {
                    debug!(error = %e, "Explicit unlock failed, lock released on close");
                }
                Ok(false)
            }
            Err(e) if is_contended(&e) => {
                debug!(path = %path.display(), "Printer config is locked by another process");
                Ok(true)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Lock attempt failed");
                Ok(true)
            }
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
