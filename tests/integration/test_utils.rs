//! Shared test utilities for integration tests

use dirmirror::hub::{BroadcastHub, ChannelSink, ClientId, Outbound};
use dirmirror::ignore::IgnoreSet;
use dirmirror::root::{RootConfig, RootHandle, RootManager};
use dirmirror::tree::TreeBuilder;
use dirmirror::watch::{ChangeWatcher, WatchConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Upper bound on waiting for anything driven by real filesystem events
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Temp directory plus its canonical path (macOS tempdirs live behind a symlink)
pub fn canonical_tempdir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dunce::canonicalize(dir.path()).unwrap();
    (dir, path)
}

pub fn fast_watch_config() -> WatchConfig {
    WatchConfig {
        debounce: Duration::from_millis(50),
        max_wait: Duration::from_millis(500),
        ignore: IgnoreSet::new([".git"]),
        ..WatchConfig::default()
    }
}

/// Hub and root manager wired together with short coalescing windows
pub fn start_manager() -> (Arc<BroadcastHub>, RootHandle) {
    let hub = Arc::new(BroadcastHub::new());
    let manager = RootManager::new(
        Arc::clone(&hub),
        TreeBuilder::new().with_ignore(IgnoreSet::new([".git"])),
        ChangeWatcher::new(fast_watch_config()),
        RootConfig::default(),
    );
    let (handle, _task) = manager.spawn();
    (hub, handle)
}

pub fn connect(hub: &BroadcastHub) -> (ClientId, mpsc::Receiver<Outbound>) {
    let (sink, rx) = ChannelSink::channel(64);
    let id = hub.register(Arc::new(sink));
    (id, rx)
}

/// Next message, or panic after [`EVENT_TIMEOUT`].
pub async fn next_message(rx: &mut mpsc::Receiver<Outbound>) -> Outbound {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("client channel closed")
}

/// Skip messages until one of kind `kind` arrives.
pub async fn next_of_kind(rx: &mut mpsc::Receiver<Outbound>, kind: &str) -> Outbound {
    loop {
        let message = next_message(rx).await;
        if message.kind() == kind {
            return message;
        }
    }
}

/// Everything already queued, without waiting.
pub fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}
