//! Integration tests for the change watcher against the real filesystem

use super::test_utils::{canonical_tempdir, fast_watch_config, EVENT_TIMEOUT};
use dirmirror::watch::{ChangeScope, ChangeWatcher, WatchSignal};
use std::fs;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_file_write_produces_one_signal() {
    let (_dir, root) = canonical_tempdir();
    let watcher = ChangeWatcher::new(fast_watch_config());
    let (tx, mut rx) = mpsc::channel(16);
    let session = watcher.start(&root, tx).unwrap();

    // Give the backend a moment to arm before touching files.
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(root.join("new.txt"), "hello").unwrap();

    let signal = tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("no signal after a write")
        .unwrap();

    match signal {
        WatchSignal::Changed(change) => {
            assert_eq!(change.session, session.id());
            assert_eq!(change.root, root);
            assert!(change.event_count >= 1);
            if let ChangeScope::Path(path) = &change.scope {
                assert_eq!(path, "new.txt");
            }
        }
        other => panic!("expected a change, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ignored_paths_do_not_signal() {
    let (_dir, root) = canonical_tempdir();
    fs::create_dir(root.join(".git")).unwrap();
    let watcher = ChangeWatcher::new(fast_watch_config());
    let (tx, mut rx) = mpsc::channel(16);
    let _session = watcher.start(&root, tx).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(root.join(".git/index"), "x").unwrap();

    let received = tokio::time::timeout(Duration::from_millis(700), rx.recv()).await;
    assert!(received.is_err(), "ignored write should not produce a signal");
}

#[tokio::test]
async fn test_stopped_session_stays_silent() {
    let (_dir, root) = canonical_tempdir();
    let watcher = ChangeWatcher::new(fast_watch_config());
    let (tx, mut rx) = mpsc::channel(16);
    let mut session = watcher.start(&root, tx).unwrap();
    let probe = session.probe();

    watcher.stop(&mut session);
    assert!(!session.is_active());
    assert!(!probe.is_active());
    // Stopping twice is harmless.
    watcher.stop(&mut session);

    fs::write(root.join("after-stop.txt"), "x").unwrap();
    let received = tokio::time::timeout(Duration::from_millis(700), rx.recv()).await;
    assert!(
        !matches!(received, Ok(Some(_))),
        "stopped session delivered a signal"
    );
}

#[tokio::test]
async fn test_start_on_missing_root_fails() {
    let (dir, root) = canonical_tempdir();
    let missing = root.join("gone");
    let watcher = ChangeWatcher::new(fast_watch_config());
    let (tx, _rx) = mpsc::channel(16);

    assert!(watcher.start(&missing, tx).is_err());
    drop(dir);
}
