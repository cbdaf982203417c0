//! Record of the demotion's own writes to `printer.cfg`.
//!
//! Renaming the stale mesh rewrites `printer.cfg`, which the change watcher
//! sees like any other modification. Resetting the freshness timestamp on
//! that event would restart the clock the demotion was reacting to, so the
//! policy records every document it writes and the watcher drops events whose
//! file contents are still ours.
//!
//! Shortly after the write the file may be caught half written, so any
//! prefix of the written document counts as ours. Once the grace window has
//! passed only an exact match (by SHA-256 digest) does, and the document text
//! itself is no longer kept.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
struct OwnWrite {
    digest: Vec<u8>,
    /// Full document, kept only while partial writes can still be observed.
    written: Option<String>,
    at: Instant,
}

/// The last document written by meshguard itself.
#[derive(Debug, Default)]
pub struct WriteLedger {
    last: Mutex<Option<OwnWrite>>,
}

impl WriteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `contents` as written by us now.
    pub fn record(&self, contents: &str) {
        self.record_at(contents, Instant::now());
    }

    /// Remember `contents` as written by us at `at`.
    pub fn record_at(&self, contents: &str, at: Instant) {
        let entry = OwnWrite {
            digest: digest(contents),
            written: Some(contents.to_string()),
            at,
        };
        *self.lock() = Some(entry);
    }

    /// Forget the recorded write, e.g. because it never reached the disk.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Whether an event observed at `observed_at` was caused by our own write.
    ///
    /// Within `grace` of our write the event is ours if `current` is a prefix
    /// of what we wrote (the file may still be half written). After that it
    /// is ours only if `current` matches what we wrote exactly. Anything else
    /// is an external edit and clears the record.
    pub fn is_own_write(&self, current: Option<&str>, observed_at: Instant, grace: Duration) -> bool {
        let mut last = self.lock();
        let Some(entry) = last.as_mut() else {
            return false;
        };

        let ours = if observed_at.saturating_duration_since(entry.at) < grace {
            match (current, entry.written.as_deref()) {
                (Some(c), Some(written)) => written.starts_with(c),
                (Some(c), None) => digest(c) == entry.digest,
                (None, _) => false,
            }
        } else {
            entry.written = None;
            current.is_some_and(|c| digest(c) == entry.digest)
        };

        if !ours {
            *last = None;
        }
        ours
    }

    /// Whether a write is currently on record.
    pub fn has_record(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<OwnWrite>> {
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn digest(contents: &str) -> Vec<u8> {
    Sha256::digest(contents.as_bytes()).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_secs(5);

    #[test]
    fn test_empty_ledger_owns_nothing() {
        let ledger = WriteLedger::new();
        assert!(!ledger.is_own_write(Some("anything"), Instant::now(), GRACE));
        assert!(!ledger.has_record());
    }

    #[test]
    fn test_event_within_grace_is_ours() {
        let ledger = WriteLedger::new();
        let t0 = Instant::now();
        ledger.record_at("demoted", t0);
        // Half-written file, still within grace.
        assert!(ledger.is_own_write(Some(""), t0 + Duration::from_secs(1), GRACE));
        assert!(ledger.has_record());
    }

    #[test]
    fn test_different_contents_within_grace_is_external() {
        let ledger = WriteLedger::new();
        let t0 = Instant::now();
        ledger.record_at("#*# [bed_mesh outdated_session_mesh]\nA\n", t0);

        let saved = "#*# [bed_mesh session_mesh]\nNEW\n";
        assert!(!ledger.is_own_write(Some(saved), t0 + Duration::from_secs(2), GRACE));
        assert!(!ledger.has_record());
    }

    #[test]
    fn test_partial_write_within_grace_is_ours() {
        let ledger = WriteLedger::new();
        let t0 = Instant::now();
        ledger.record_at("#*# [bed_mesh outdated_session_mesh]\nA\n", t0);
        assert!(ledger.is_own_write(Some("#*# [bed_mesh outd"), t0 + Duration::from_secs(1), GRACE));
        assert!(ledger.is_own_write(
            Some("#*# [bed_mesh outdated_session_mesh]\nA\n"),
            t0 + Duration::from_secs(2),
            GRACE
        ));
    }

    #[test]
    fn test_unreadable_file_within_grace_is_external() {
        let ledger = WriteLedger::new();
        let t0 = Instant::now();
        ledger.record_at("demoted", t0);
        assert!(!ledger.is_own_write(None, t0 + Duration::from_secs(1), GRACE));
    }

    #[test]
    fn test_clear_forgets_write() {
        let ledger = WriteLedger::new();
        ledger.record("demoted");
        ledger.clear();
        assert!(!ledger.has_record());
        assert!(!ledger.is_own_write(Some("demoted"), Instant::now(), GRACE));
    }

    #[test]
    fn test_matching_contents_after_grace_is_ours() {
        let ledger = WriteLedger::new();
        let t0 = Instant::now();
        ledger.record_at("demoted", t0);
        assert!(ledger.is_own_write(Some("demoted"), t0 + Duration::from_secs(60), GRACE));
    }

    #[test]
    fn test_changed_contents_after_grace_is_external() {
        let ledger = WriteLedger::new();
        let t0 = Instant::now();
        ledger.record_at("demoted", t0);

        assert!(!ledger.is_own_write(Some("edited"), t0 + Duration::from_secs(60), GRACE));
        assert!(!ledger.has_record());
        // Once cleared, even the original contents count as external.
        assert!(!ledger.is_own_write(Some("demoted"), t0 + Duration::from_secs(61), GRACE));
    }

    #[test]
    fn test_unreadable_file_after_grace_is_external() {
        let ledger = WriteLedger::new();
        let t0 = Instant::now();
        ledger.record_at("demoted", t0);
        assert!(!ledger.is_own_write(None, t0 + Duration::from_secs(60), GRACE));
    }
}
