//! meshguard - keeps Klipper bed mesh calibration from going stale.
//!
//! Klipper stores the mesh probed at the start of a session as
//! `[bed_mesh session_mesh]` in the `SAVE_CONFIG` block of `printer.cfg`.
//! meshguard tracks when that file was last edited and, once the mesh is older
//! than the configured maximum age, renames the section to
//! `outdated_session_mesh` so the printer falls back to its default profile
//! instead of printing on an expired mesh.
//!
//! # Components
//!
//! - [`section`] - locate, rename and delete `#*# [bed_mesh <name>]` blocks
//! - [`timestamp`] - freshness timestamp side file
//! - [`lock`] - in-use probe for `printer.cfg`
//! - [`policy`] - staleness assessment and the demotion sequence
//! - [`watcher`] - resets the timestamp on external edits
//! - [`scheduler`] - periodic checks
//! - [`service`] - wires it all together for the process lifetime

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod logging;
pub mod policy;
pub mod scheduler;
pub mod section;
pub mod service;
pub mod timestamp;
pub mod watcher;

pub use config::{ConfigFile, MeshGuardConfig};
pub use error::{MeshError, MeshResult};
pub use policy::{CheckOutcome, Freshness, MeshManager, MeshStatus};
pub use service::MeshGuardService;

/// Crate version, as reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
