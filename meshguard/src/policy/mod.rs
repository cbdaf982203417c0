//! Staleness policy.
//!
//! # State Machine
//!
//! ```text
//! stored timestamp absent            --> NoTimestamp --> write now
//! now - stored >  max_age            --> Stale       --> demote session_mesh
//! now - stored <= max_age            --> Fresh       --> nothing
//! ```
//!
//! Demotion never touches the timestamp. A stale mesh stays stale on every
//! later check until an external edit of `printer.cfg` resets the clock.

mod manager;

use std::fmt;

pub use manager::{MeshManager, MeshStatus};

/// Freshness of the live mesh at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No usable timestamp has been recorded yet.
    NoTimestamp,
    /// The mesh is younger than the maximum age.
    Fresh { age_secs: i64 },
    /// The mesh is older than the maximum age.
    Stale { age_secs: i64 },
}

impl Freshness {
    /// Age in seconds, if a timestamp exists.
    pub fn age_secs(&self) -> Option<i64> {
        match self {
            Freshness::NoTimestamp => None,
            Freshness::Fresh { age_secs } | Freshness::Stale { age_secs } => Some(*age_secs),
        }
    }
}

/// Classify the mesh given the current time and the stored timestamp.
///
/// A timestamp in the future counts as fresh.
pub fn assess(now: i64, stored: Option<i64>, max_age_secs: i64) -> Freshness {
    match stored {
        None => Freshness::NoTimestamp,
        Some(stored) => {
            let age_secs = now.saturating_sub(stored);
            if age_secs > max_age_secs {
                Freshness::Stale { age_secs }
            } else {
                Freshness::Fresh { age_secs }
            }
        }
    }
}

/// What a single staleness check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// No timestamp existed; `timestamp` was written.
    TimestampCreated { timestamp: i64 },
    /// The mesh is fresh; nothing was done.
    UpToDate { age_secs: i64 },
    /// The live mesh was renamed to the outdated profile.
    Demoted { age_secs: i64 },
    /// The mesh is stale but `printer.cfg` was in use; retried next cycle.
    Deferred { age_secs: i64 },
    /// The mesh is stale but there is no live mesh section left to rename.
    NothingToDemote { age_secs: i64 },
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::TimestampCreated { timestamp } => {
                write!(f, "no timestamp found, created {}", timestamp)
            }
            CheckOutcome::UpToDate { age_secs } => {
                write!(f, "mesh is up to date ({})", format_age(*age_secs))
            }
            CheckOutcome::Demoted { age_secs } => {
                write!(f, "stale mesh renamed ({})", format_age(*age_secs))
            }
            CheckOutcome::Deferred { age_secs } => {
                write!(
                    f,
                    "mesh is stale ({}) but printer config is in use, will retry",
                    format_age(*age_secs)
                )
            }
            CheckOutcome::NothingToDemote { age_secs } => {
                write!(f, "mesh is stale ({}) but there is no live mesh to rename", format_age(*age_secs))
            }
        }
    }
}

/// Human-readable age, e.g. `3h 12m old`.
pub fn format_age(age_secs: i64) -> String {
    if age_secs < 0 {
        return "timestamp in the future".to_string();
    }
    let hours = age_secs / 3600;
    let minutes = (age_secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m old", hours, minutes)
    } else if minutes > 0 {
        format!("{}m old", minutes)
    } else {
        format!("{}s old", age_secs)
    }
}
