//! Watch session lifecycle

use crate::watch::SessionId;
use notify::{RecommendedWatcher, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// One live subscription on a root directory.
///
/// Dropping the session stops it. The underlying `notify` watcher must be kept alive for
/// as long as events are wanted.
pub struct WatchSession {
    id: SessionId,
    root: PathBuf,
    active: Arc<AtomicBool>,
    watcher: Option<RecommendedWatcher>,
    task: Option<JoinHandle<()>>,
}

impl WatchSession {
    pub(crate) fn new(
        id: SessionId,
        root: PathBuf,
        active: Arc<AtomicBool>,
        watcher: RecommendedWatcher,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            root,
            active,
            watcher: Some(watcher),
            task: Some(task),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// False once stopped, superseded, or failed.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Read-only handle for observing this session's state after it is moved or dropped.
    pub fn probe(&self) -> SessionProbe {
        SessionProbe {
            id: self.id,
            root: self.root.clone(),
            active: Arc::clone(&self.active),
        }
    }

    /// Release the OS watch and stop the coalescing task. Idempotent.
    ///
    /// The active flag is cleared first, so the coalescing task starts no new send. A send
    /// already in flight on another worker may still land after this returns; receivers
    /// drop it by session id.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(mut watcher) = self.watcher.take() {
            let _ = watcher.unwatch(&self.root);
            drop(watcher);
        }
        if let Some(task) = self.task.take() {
            task.abort();
            info!(session = %self.id, root = %self.root.display(), "Watch session stopped");
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Observer of a session's active flag
#[derive(Debug, Clone)]
pub struct SessionProbe {
    pub id: SessionId,
    pub root: PathBuf,
    active: Arc<AtomicBool>,
}

impl SessionProbe {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
