//! Integration tests for root switching, recent roots and snapshot ordering

use super::test_utils::{canonical_tempdir, connect, drain, next_message, next_of_kind, start_manager};
use dirmirror::error::RootError;
use dirmirror::protocol::ServerMessage;
use std::fs;
use std::time::Duration;

fn snapshot_root(message: &ServerMessage) -> std::path::PathBuf {
    match message {
        ServerMessage::Snapshot(snapshot) => snapshot.root.clone(),
        other => panic!("expected a snapshot, got {}", other.kind()),
    }
}

#[tokio::test]
async fn test_switch_root_returns_canonical_path_and_updates_recent() {
    let (_a, root_a) = canonical_tempdir();
    let (_b, root_b) = canonical_tempdir();
    let (_hub, root) = start_manager();

    assert_eq!(root.current_root().await.unwrap(), None);
    assert_eq!(root.switch_root(&root_a).await.unwrap(), root_a);
    assert_eq!(root.switch_root(root_b.join(".")).await.unwrap(), root_b);
    assert_eq!(root.switch_root(&root_a).await.unwrap(), root_a);

    assert_eq!(root.current_root().await.unwrap(), Some(root_a.clone()));
    assert_eq!(root.recent().await.unwrap(), vec![root_a, root_b]);
    root.shutdown().await;
}

#[tokio::test]
async fn test_recent_roots_are_capped_at_ten() {
    let dirs: Vec<_> = (0..12).map(|_| canonical_tempdir()).collect();
    let (_hub, root) = start_manager();

    for (_, path) in &dirs {
        root.switch_root(path).await.unwrap();
    }

    let recent = root.recent().await.unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0], dirs[11].1);
    assert_eq!(recent[9], dirs[2].1);
    root.shutdown().await;
}

#[tokio::test]
async fn test_invalid_root_leaves_state_unchanged() {
    let (_a, root_a) = canonical_tempdir();
    fs::write(root_a.join("plain.txt"), "x").unwrap();
    let (_hub, root) = start_manager();
    root.switch_root(&root_a).await.unwrap();
    let before = root.active_session().await.unwrap().unwrap();

    let missing = root.switch_root(root_a.join("missing")).await;
    assert!(matches!(missing, Err(RootError::InvalidRoot { .. })));
    let file = root.switch_root(root_a.join("plain.txt")).await;
    assert!(matches!(file, Err(RootError::InvalidRoot { .. })));

    assert_eq!(root.current_root().await.unwrap(), Some(root_a.clone()));
    assert_eq!(root.recent().await.unwrap(), vec![root_a]);
    let after = root.active_session().await.unwrap().unwrap();
    assert_eq!(before.id, after.id);
    assert!(after.is_active());
    root.shutdown().await;
}

/// After any number of switches exactly one session is live, for the last root.
#[tokio::test]
async fn test_at_most_one_active_watch_session() {
    let dirs: Vec<_> = (0..5).map(|_| canonical_tempdir()).collect();
    let (_hub, root) = start_manager();
    let mut probes = Vec::new();

    for (_, path) in &dirs {
        root.switch_root(path).await.unwrap();
        probes.push(root.active_session().await.unwrap().unwrap());
    }

    let live: Vec<_> = probes.iter().filter(|p| p.is_active()).collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].root, dirs[4].1);

    root.shutdown().await;
    assert!(probes.iter().all(|p| !p.is_active()));
}

#[tokio::test]
async fn test_client_without_root_gets_error_then_snapshot_on_switch() {
    let (_a, root_a) = canonical_tempdir();
    let (hub, root) = start_manager();
    let (_id, mut rx) = connect(&hub);

    assert_eq!(next_message(&mut rx).await.kind(), "error");

    root.switch_root(&root_a).await.unwrap();
    let message = next_message(&mut rx).await;
    assert_eq!(snapshot_root(&message), root_a);
    root.shutdown().await;
}

/// A viewer on /proj sees the initial snapshot, then the /other snapshot after a switch,
/// and no change notice for /proj once the switch has happened.
#[tokio::test]
async fn test_switch_scenario() {
    let (_p, proj) = canonical_tempdir();
    let (_o, other) = canonical_tempdir();
    fs::write(proj.join("a.txt"), "a").unwrap();
    fs::write(other.join("b.txt"), "b").unwrap();

    let (hub, root) = start_manager();
    root.switch_root(&proj).await.unwrap();

    let (_id, mut rx) = connect(&hub);
    let first = next_message(&mut rx).await;
    assert_eq!(snapshot_root(&first), proj);

    root.switch_root(&other).await.unwrap();
    let second = next_of_kind(&mut rx, "structure").await;
    assert_eq!(snapshot_root(&second), other);

    // Writes under the old root after the switch must not reach the viewer.
    fs::write(proj.join("late.txt"), "late").unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    for message in drain(&mut rx) {
        if let ServerMessage::Snapshot(snapshot) = &*message {
            assert_eq!(snapshot.root, other);
        }
        assert_ne!(message.kind(), "fileChange", "change leaked from the previous root");
    }
    root.shutdown().await;
}

/// A write under the active root produces a change notice followed by a fresh snapshot.
#[tokio::test]
async fn test_change_notice_then_snapshot() {
    let (_p, proj) = canonical_tempdir();
    let (hub, root) = start_manager();
    root.switch_root(&proj).await.unwrap();
    let (_id, mut rx) = connect(&hub);
    assert_eq!(next_message(&mut rx).await.kind(), "structure");

    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(proj.join("fresh.txt"), "fresh").unwrap();

    assert_eq!(next_of_kind(&mut rx, "fileChange").await.kind(), "fileChange");
    let message = next_message(&mut rx).await;
    match &*message {
        ServerMessage::Snapshot(snapshot) => {
            assert!(snapshot.tree.find("fresh.txt").is_some());
        }
        other => panic!("expected a snapshot after the notice, got {}", other.kind()),
    }
    root.shutdown().await;
}
