//! Root Manager
//!
//! A single actor task owns the active root, its watch session and the recent-roots list.
//! Switch requests, refreshes and coalesced watch signals are all handled inside that task,
//! one at a time. So a root switch can never interleave with a rebuild, and at most one
//! watch session is ever active. Signals carrying a session id other than the current
//! one come from a superseded session and are discarded.
//!
//! Tree walks run on the blocking pool. A slow walk stalls only this actor; the
//! [`BroadcastHub`] keeps registering clients and delivering messages meanwhile.

pub mod recent;

use crate::error::{RootError, TreeError};
use crate::hub::{BroadcastHub, ClientId, SnapshotProvider};
use crate::protocol::ServerMessage;
use crate::tree::{path, Snapshot, TreeBuilder};
use crate::watch::{ChangeWatcher, SessionId, SessionProbe, WatchSession, WatchSignal};
use recent::RecentRoots;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use recent::DEFAULT_CAPACITY as RECENT_CAPACITY;

/// Root manager configuration
#[derive(Debug, Clone)]
pub struct RootConfig {
    /// Restart the watch once in place after an OS watch error
    pub retry_on_error: bool,
    pub recent_capacity: usize,
    /// Capacity of the watch-signal channel
    pub signal_capacity: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            retry_on_error: true,
            recent_capacity: RECENT_CAPACITY,
            signal_capacity: 64,
        }
    }
}

enum Command {
    SwitchRoot {
        path: PathBuf,
        reply: oneshot::Sender<Result<PathBuf, RootError>>,
    },
    CurrentRoot {
        reply: oneshot::Sender<Option<PathBuf>>,
    },
    Recent {
        reply: oneshot::Sender<Vec<PathBuf>>,
    },
    /// Rebuild and send to one client, or broadcast when `target` is None
    Refresh { target: Option<ClientId> },
    ActiveSession {
        reply: oneshot::Sender<Option<SessionProbe>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable command interface to the root manager actor
#[derive(Clone)]
pub struct RootHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl RootHandle {
    /// Validate, stop the old watch, start the new one, rebuild, record, broadcast.
    ///
    /// Returns the canonical new root. `InvalidRoot` leaves the current root untouched.
    pub async fn switch_root(&self, path: impl Into<PathBuf>) -> Result<PathBuf, RootError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SwitchRoot {
            path: path.into(),
            reply,
        })?;
        rx.await.map_err(|_| RootError::ManagerStopped)?
    }

    pub async fn current_root(&self) -> Result<Option<PathBuf>, RootError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CurrentRoot { reply })?;
        rx.await.map_err(|_| RootError::ManagerStopped)
    }

    /// Recent roots, most recent first
    pub async fn recent(&self) -> Result<Vec<PathBuf>, RootError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Recent { reply })?;
        rx.await.map_err(|_| RootError::ManagerStopped)
    }

    /// Rebuild and broadcast the current root to every client.
    pub fn refresh(&self) -> Result<(), RootError> {
        self.send(Command::Refresh { target: None })
    }

    /// Rebuild and send the current root to one client.
    pub fn refresh_client(&self, client: ClientId) -> Result<(), RootError> {
        self.send(Command::Refresh {
            target: Some(client),
        })
    }

    /// Probe of the currently active watch session, if any
    pub async fn active_session(&self) -> Result<Option<SessionProbe>, RootError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ActiveSession { reply })?;
        rx.await.map_err(|_| RootError::ManagerStopped)
    }

    /// Stop the active watch and end the actor.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, command: Command) -> Result<(), RootError> {
        self.tx.send(command).map_err(|_| RootError::ManagerStopped)
    }
}

impl SnapshotProvider for RootHandle {
    fn request_snapshot(&self, client: ClientId) {
        if self.refresh_client(client).is_err() {
            warn!(client = %client, "Root manager stopped, no initial snapshot");
        }
    }
}

enum RootState {
    NoRootSelected,
    RootActive {
        root: PathBuf,
        session: Option<WatchSession>,
    },
}

/// The actor. Construct with [`RootManager::new`], then [`spawn`](RootManager::spawn).
pub struct RootManager {
    hub: Arc<BroadcastHub>,
    builder: TreeBuilder,
    watcher: ChangeWatcher,
    config: RootConfig,
    state: RootState,
    recent: RecentRoots,
    /// Set once the watch was restarted in place after an error; cleared by a switch or
    /// a refresh-triggered restart
    watch_retried: bool,
    signals_tx: mpsc::Sender<WatchSignal>,
    signals_rx: mpsc::Receiver<WatchSignal>,
}

impl RootManager {
    pub fn new(
        hub: Arc<BroadcastHub>,
        builder: TreeBuilder,
        watcher: ChangeWatcher,
        config: RootConfig,
    ) -> Self {
        let (signals_tx, signals_rx) = mpsc::channel(config.signal_capacity.max(1));
        Self {
            hub,
            builder,
            watcher,
            recent: RecentRoots::with_capacity(config.recent_capacity),
            config,
            state: RootState::NoRootSelected,
            watch_retried: false,
            signals_tx,
            signals_rx,
        }
    }

    /// Start the actor and install it as the hub's snapshot provider.
    pub fn spawn(self) -> (RootHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = RootHandle { tx };
        self.hub.set_snapshot_provider(Arc::new(handle.clone()));
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.stop_session();
                        let _ = reply.send(());
                        info!("Root manager stopped");
                        return;
                    }
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                Some(signal) = self.signals_rx.recv() => self.on_signal(signal).await,
            }
        }
        self.stop_session();
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::SwitchRoot { path, reply } => {
                let result = self.switch_root(path).await;
                let _ = reply.send(result);
            }
            Command::CurrentRoot { reply } => {
                let _ = reply.send(self.current_root().map(Path::to_path_buf));
            }
            Command::Recent { reply } => {
                let _ = reply.send(self.recent.to_vec());
            }
            Command::Refresh { target } => self.refresh(target).await,
            Command::ActiveSession { reply } => {
                let probe = match &self.state {
                    RootState::RootActive {
                        session: Some(session),
                        ..
                    } if session.is_active() => Some(session.probe()),
                    _ => None,
                };
                let _ = reply.send(probe);
            }
            Command::Shutdown { .. } => {}
        }
    }

    fn current_root(&self) -> Option<&Path> {
        match &self.state {
            RootState::NoRootSelected => None,
            RootState::RootActive { root, .. } => Some(root),
        }
    }

    fn current_session(&self) -> Option<SessionId> {
        match &self.state {
            RootState::RootActive {
                session: Some(session),
                ..
            } => Some(session.id()),
            _ => None,
        }
    }

    async fn switch_root(&mut self, requested: PathBuf) -> Result<PathBuf, RootError> {
        let root = path::validate_root(&requested).map_err(|source| {
            warn!(path = %requested.display(), error = %source, "Rejected root switch");
            RootError::InvalidRoot {
                path: requested.clone(),
                source,
            }
        })?;

        self.stop_session();
        self.watch_retried = false;
        let session = self.start_session(&root);
        info!(
            root = %root.display(),
            session = ?session.as_ref().map(WatchSession::id),
            "Root switched"
        );
        self.state = RootState::RootActive {
            root: root.clone(),
            session,
        };

        match self.build_snapshot(&root).await {
            Ok(snapshot) => {
                self.recent.promote(&root);
                self.hub.broadcast(ServerMessage::snapshot(snapshot));
                Ok(root)
            }
            Err(e) => {
                error!(root = %root.display(), error = %e, "Snapshot after switch failed");
                self.hub
                    .broadcast(ServerMessage::error(format!("Failed to read {}: {}", root.display(), e)));
                Err(RootError::Build(e))
            }
        }
    }

    async fn refresh(&mut self, target: Option<ClientId>) {
        let Some(root) = self.current_root().map(Path::to_path_buf) else {
            if let Some(client) = target {
                let _ = self.hub.send_to(client, ServerMessage::error(RootError::NoRootSelected.to_string()));
            }
            return;
        };

        // A refresh is also the retry point for a watch that failed earlier.
        if self.current_session().is_none() {
            self.watch_retried = false;
            self.restart_watch(&root);
        }

        let message = match self.build_snapshot(&root).await {
            Ok(snapshot) => ServerMessage::snapshot(snapshot),
            Err(e) => ServerMessage::error(format!("Failed to read {}: {}", root.display(), e)),
        };
        match target {
            Some(client) => {
                if let Err(failure) = self.hub.send_to(client, message) {
                    debug!(client = %client, error = %failure, "Snapshot not delivered");
                }
            }
            None => {
                self.hub.broadcast(message);
            }
        }
    }

    async fn on_signal(&mut self, signal: WatchSignal) {
        let session = signal.session();
        if self.current_session() != Some(session) {
            debug!(session = %session, "Discarding signal from superseded session");
            return;
        }
        let Some(root) = self.current_root().map(Path::to_path_buf) else {
            return;
        };

        match signal {
            WatchSignal::Changed(change) => {
                let snapshot = self.build_snapshot(&root).await;
                if self.current_session() != Some(change.session) {
                    return;
                }
                self.hub.broadcast(ServerMessage::change(&change.scope));
                match snapshot {
                    Ok(snapshot) => {
                        self.hub.broadcast(ServerMessage::snapshot(snapshot));
                    }
                    Err(e) => {
                        warn!(root = %root.display(), error = %e, "Rebuild after change failed");
                        self.hub.broadcast(ServerMessage::error(format!(
                            "Failed to read {}: {}",
                            root.display(),
                            e
                        )));
                    }
                }
            }
            WatchSignal::Error { message, .. } => {
                self.hub.broadcast(ServerMessage::error(format!(
                    "Watch error on {}: {}",
                    root.display(),
                    message
                )));
                self.stop_session();
                if self.config.retry_on_error && !self.watch_retried {
                    self.watch_retried = true;
                    self.restart_watch(&root);
                } else {
                    warn!(root = %root.display(), "Root stays active without a watch");
                }
            }
        }
    }

    fn start_session(&self, root: &Path) -> Option<WatchSession> {
        match self.watcher.start(root, self.signals_tx.clone()) {
            Ok(session) => Some(session),
            Err(e) => {
                error!(root = %root.display(), error = %e, "Failed to start watch");
                self.hub
                    .broadcast(ServerMessage::error(format!("Watching {} failed: {}", root.display(), e)));
                None
            }
        }
    }

    fn restart_watch(&mut self, root: &Path) {
        self.stop_session();
        let session = self.start_session(root);
        if let RootState::RootActive { session: slot, .. } = &mut self.state {
            *slot = session;
        }
    }

    /// Stop and release the active session. Idempotent.
    fn stop_session(&mut self) {
        if let RootState::RootActive { session, .. } = &mut self.state {
            if let Some(mut old) = session.take() {
                self.watcher.stop(&mut old);
            }
        }
    }

    async fn build_snapshot(&self, root: &Path) -> Result<Snapshot, TreeError> {
        let builder = self.builder.clone();
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || builder.snapshot(&root))
            .await
            .map_err(|e| TreeError::IoError(std::io::Error::other(e.to_string())))?
    }
}
