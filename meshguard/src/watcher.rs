//! Change watcher for `printer.cfg`.
//!
//! Watches the directory containing `printer.cfg` (non-recursive) and resets
//! the freshness timestamp whenever the file is edited by someone else.
//!
//! ```text
//! notify event ──► path == printer.cfg? ──no──► ignored
//!                        │ yes
//!                        ▼
//!                  our own write? ──yes──► ignored
//!                        │ no
//!                        ▼
//!                  within debounce? ──yes──► dropped
//!                        │ no
//!                        ▼
//!                  write timestamp = now
//! ```
//!
//! The firmware tends to write the file several times while saving, so only
//! the first event of a burst resets the clock.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::MeshGuardConfig;
use crate::error::{MeshError, MeshResult};
use crate::ledger::WriteLedger;
use crate::timestamp::TimestampStore;

/// Drops events that follow the last accepted one too closely.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_acted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_acted: None,
        }
    }

    /// Whether an event at `at` falls outside the window of the last action.
    pub fn is_ready(&self, at: Instant) -> bool {
        match self.last_acted {
            None => true,
            Some(last) => at.saturating_duration_since(last) > self.window,
        }
    }

    /// Record that the handler acted at `at`.
    pub fn mark(&mut self, at: Instant) {
        self.last_acted = Some(at);
    }
}

/// What the handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    /// Not a modification of the watched file.
    Ignored,
    /// Caused by our own demotion write.
    OwnWrite,
    /// Inside the debounce window of the previous reset.
    Debounced,
    /// The timestamp was reset.
    TimestampReset { timestamp: i64 },
    /// The timestamp could not be written; the next event retries.
    WriteFailed,
}

/// Decides what to do with filesystem events for `printer.cfg`.
///
/// Separate from [`ChangeWatcher`] so it can be fed events directly.
pub struct ChangeHandler {
    target: PathBuf,
    store: TimestampStore,
    clock: Arc<dyn Clock>,
    ledger: Arc<WriteLedger>,
    debounce: Duration,
    debouncer: Mutex<Debouncer>,
}

impl std::fmt::Debug for ChangeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeHandler")
            .field("target", &self.target)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl ChangeHandler {
    /// Handler reacting to events on `target`.
    pub fn new(
        target: impl Into<PathBuf>,
        store: TimestampStore,
        clock: Arc<dyn Clock>,
        ledger: Arc<WriteLedger>,
        debounce: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            store,
            clock,
            ledger,
            debounce,
            debouncer: Mutex::new(Debouncer::new(debounce)),
        }
    }

    /// Path of the watched file.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Process one event observed at `observed_at`.
    pub fn handle(&self, event: &Event, observed_at: Instant) -> EventDecision {
        if !is_modification(&event.kind) || !event.paths.iter().any(|p| p == &self.target) {
            return EventDecision::Ignored;
        }

        if self.ledger.has_record() {
            let current = fs::read_to_string(&self.target).ok();
            if self
                .ledger
                .is_own_write(current.as_deref(), observed_at, self.debounce)
            {
                debug!(kind = ?event.kind, "Ignoring change caused by mesh rename");
                return EventDecision::OwnWrite;
            }
        }

        let mut debouncer = self
            .debouncer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !debouncer.is_ready(observed_at) {
            debug!(kind = ?event.kind, "Debounced printer config change");
            return EventDecision::Debounced;
        }

        let now = self.clock.now();
        match self.store.write(now) {
            Ok(()) => {
                debouncer.mark(observed_at);
                info!(timestamp = now, path = %self.target.display(), "Printer config modified, updating timestamp");
                EventDecision::TimestampReset { timestamp: now }
            }
            Err(e) => {
                error!(error = %e, "Failed to update mesh timestamp");
                EventDecision::WriteFailed
            }
        }
    }
}

fn is_modification(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Live filesystem subscription feeding a [`ChangeHandler`].
///
/// Dropping the watcher (or calling [`stop`](Self::stop)) ends the
/// subscription and joins the backend thread.
pub struct ChangeWatcher {
    watcher: RecommendedWatcher,
    dir: PathBuf,
    handler: Arc<ChangeHandler>,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("dir", &self.dir)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

impl ChangeWatcher {
    /// Start watching the directory of `config.printer_cfg`.
    ///
    /// # Errors
    ///
    /// Fails if the path names no file, the directory cannot be resolved, or
    /// the notification backend refuses to watch it.
    pub fn start(
        config: &MeshGuardConfig,
        clock: Arc<dyn Clock>,
        ledger: Arc<WriteLedger>,
    ) -> MeshResult<Self> {
        let cfg_path = &config.printer_cfg;
        let file_name = cfg_path.file_name().ok_or_else(|| MeshError::NoFileName {
            path: cfg_path.clone(),
        })?;
        let parent = match cfg_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let watch_error = |source: notify::Error| MeshError::Watch {
            path: parent.to_path_buf(),
            source,
        };

        // Event paths are reported relative to the watched path, so resolve it
        // once and build the target from the same base.
        let dir = parent
            .canonicalize()
            .map_err(|e| watch_error(notify::Error::io(e)))?;

        let handler = Arc::new(ChangeHandler::new(
            dir.join(file_name),
            TimestampStore::new(config.timestamp_file.clone()),
            clock,
            ledger,
            config.debounce,
        ));

        let callback_handler = Arc::clone(&handler);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    callback_handler.handle(&event, Instant::now());
                }
                Err(e) => warn!(error = %e, "File watcher error"),
            },
            notify::Config::default(),
        )
        .map_err(watch_error)?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        info!(
            path = %handler.target().display(),
            debounce_secs = config.debounce.as_secs(),
            "Watching printer config for changes"
        );

        Ok(Self {
            watcher,
            dir,
            handler,
        })
    }

    /// The handler receiving this watcher's events.
    pub fn handler(&self) -> Arc<ChangeHandler> {
        Arc::clone(&self.handler)
    }

    /// Stop watching and release the backend.
    pub fn stop(mut self) {
        if let Err(e) = self.watcher.unwatch(&self.dir) {
            debug!(error = %e, "Unwatch failed during shutdown");
        }
        info!("File watcher stopped");
    }
}
