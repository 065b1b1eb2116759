//! Change Watcher
//!
//! Subscribes to recursive filesystem notifications for one root and turns bursts of
//! raw events into coalesced [`WatchSignal`]s.
//!
//! The `notify` callback runs on the backend's own thread. It filters ignored paths and
//! bridges what is left into a bounded tokio channel with `try_send`. A full channel
//! drops the event and flags the next emission as [`ChangeScope::Multiple`]. The
//! coalescing task on the other end owns all timing decisions (see [`coalesce`]).

pub mod coalesce;
pub mod session;

use crate::error::WatchError;
use crate::ignore::IgnoreSet;
use crate::tree::path::relative_path_string;
use chrono::{DateTime, Utc};
use coalesce::{Bridge, CoalesceConfig, RawEvent, SessionContext};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

pub use session::{SessionProbe, WatchSession};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique watch session identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// What a coalesced window touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeScope {
    /// Every event in the window hit this root-relative path
    Path(String),
    /// Events hit more than one path, or some were dropped
    Multiple,
}

impl ChangeScope {
    /// Wire form: the path, or `*` for multiple changes.
    pub fn as_wire_path(&self) -> &str {
        match self {
            ChangeScope::Path(path) => path,
            ChangeScope::Multiple => "*",
        }
    }
}

impl std::fmt::Display for ChangeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire_path())
    }
}

/// One coalesced change window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSignal {
    pub session: SessionId,
    pub root: PathBuf,
    pub scope: ChangeScope,
    pub window_opened: DateTime<Utc>,
    pub event_count: usize,
}

/// Output of a watch session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    Changed(ChangeSignal),
    /// The OS watch failed; the session is inactive after this
    Error {
        session: SessionId,
        root: PathBuf,
        message: String,
    },
}

impl WatchSignal {
    pub fn session(&self) -> SessionId {
        match self {
            WatchSignal::Changed(change) => change.session,
            WatchSignal::Error { session, .. } => *session,
        }
    }
}

/// Watch configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Idle gap that closes a coalescing window
    pub debounce: Duration,
    /// Longest a window stays open during a continuous storm
    pub max_wait: Duration,
    /// Capacity of the callback-to-coalescer bridge channel
    pub channel_capacity: usize,
    /// Names filtered out of notifications
    pub ignore: IgnoreSet,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let coalesce = CoalesceConfig::default();
        Self {
            debounce: coalesce.debounce,
            max_wait: coalesce.max_wait,
            channel_capacity: 1024,
            ignore: IgnoreSet::default(),
        }
    }
}

/// Starts watch sessions. Holds configuration only; enforcing a single active
/// session is the caller's job.
#[derive(Debug, Clone, Default)]
pub struct ChangeWatcher {
    config: WatchConfig,
}

impl ChangeWatcher {
    pub fn new(config: WatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Start a recursive watch on `root`, emitting coalesced signals into `signals`.
    ///
    /// `root` should be canonical so event paths strip cleanly. Must be called from
    /// within a tokio runtime.
    pub fn start(
        &self,
        root: &Path,
        signals: mpsc::Sender<WatchSignal>,
    ) -> Result<WatchSession, WatchError> {
        let id = SessionId::next();
        let root = root.to_path_buf();
        let active = Arc::new(AtomicBool::new(true));
        let bridge = Arc::new(Bridge::default());
        let (raw_tx, raw_rx) = mpsc::channel(self.config.channel_capacity.max(1));

        let mut watcher = {
            let root = root.clone();
            let ignore = self.config.ignore.clone();
            let bridge = Arc::clone(&bridge);
            notify::recommended_watcher(move |res: notify::Result<Event>| {
                bridge_event(res, &root, &ignore, &raw_tx, &bridge);
            })
            .map_err(|e| WatchError::Create(e.to_string()))?
        };

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Subscribe {
                path: root.clone(),
                message: e.to_string(),
            })?;

        let ctx = SessionContext {
            session: id,
            root: root.clone(),
            active: Arc::clone(&active),
            bridge,
        };
        let config = CoalesceConfig {
            debounce: self.config.debounce,
            max_wait: self.config.max_wait,
        };
        let task = tokio::spawn(coalesce::run(raw_rx, signals, ctx, config));

        info!(session = %id, root = %root.display(), "Watch session started");
        Ok(WatchSession::new(id, root, active, watcher, task))
    }

    /// Stop `session`. Returns once the OS watch is released.
    pub fn stop(&self, session: &mut WatchSession) {
        session.stop();
    }
}

/// Runs on the notify thread: filter, relativize, and forward without blocking.
fn bridge_event(
    res: notify::Result<Event>,
    root: &Path,
    ignore: &IgnoreSet,
    raw: &mpsc::Sender<RawEvent>,
    bridge: &Bridge,
) {
    match res {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            for path in &event.paths {
                if ignore.is_ignored_under(root, path) {
                    continue;
                }
                let Some(relative) = relative_path_string(root, path) else {
                    continue;
                };
                match raw.try_send(RawEvent::Change(relative)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        bridge.overflowed.store(true, Ordering::Release);
                    }
                    Err(TrySendError::Closed(_)) => return,
                }
            }
        }
        Err(e) => {
            let message = e.to_string();
            warn!(root = %root.display(), error = %message, "Filesystem watcher error");
            if raw.try_send(RawEvent::Error(message.clone())).is_err() {
                *bridge.error.lock() = Some(message);
            }
        }
    }
}
