//! Integration tests for per-client failure isolation

use super::test_utils::{canonical_tempdir, connect, next_message, start_manager};
use dirmirror::error::DeliveryFailure;
use dirmirror::hub::{BroadcastHub, ChannelSink, ClientSink, ConnectionState, Outbound};
use dirmirror::protocol::ServerMessage;
use parking_lot::Mutex;
use std::sync::Arc;

/// Sink that accepts `budget` messages and then reports a closed connection
struct FlakySink {
    budget: Mutex<usize>,
}

impl FlakySink {
    fn new(budget: usize) -> Self {
        Self {
            budget: Mutex::new(budget),
        }
    }
}

impl ClientSink for FlakySink {
    fn deliver(&self, _message: Outbound) -> Result<(), DeliveryFailure> {
        let mut budget = self.budget.lock();
        if *budget == 0 {
            return Err(DeliveryFailure::Closed);
        }
        *budget -= 1;
        Ok(())
    }
}

#[tokio::test]
async fn test_failing_client_does_not_affect_others() {
    let (_a, root_a) = canonical_tempdir();
    let (_b, root_b) = canonical_tempdir();
    let (hub, root) = start_manager();
    root.switch_root(&root_a).await.unwrap();

    let (c1, mut rx1) = connect(&hub);
    // Accepts the initial snapshot, fails on the next delivery.
    let c2 = hub.register(Arc::new(FlakySink::new(1)));
    let (c3, mut rx3) = connect(&hub);

    assert_eq!(next_message(&mut rx1).await.kind(), "structure");
    assert_eq!(next_message(&mut rx3).await.kind(), "structure");

    root.switch_root(&root_b).await.unwrap();

    for rx in [&mut rx1, &mut rx3] {
        match &*next_message(rx).await {
            ServerMessage::Snapshot(snapshot) => assert_eq!(snapshot.root, root_b),
            other => panic!("expected a snapshot, got {}", other.kind()),
        }
    }
    assert!(!hub.contains(c2));
    assert_eq!(hub.state(c2), ConnectionState::Closed);
    assert_eq!(hub.client_ids(), vec![c1, c3]);
    root.shutdown().await;
}

#[test]
fn test_slow_consumer_is_dropped_without_blocking_others() {
    let hub = BroadcastHub::new();
    let (slow, _slow_rx) = ChannelSink::channel(2);
    let (fast, mut fast_rx) = ChannelSink::channel(64);
    let slow_id = hub.register(Arc::new(slow));
    let fast_id = hub.register(Arc::new(fast));

    for i in 0..10 {
        hub.broadcast(ServerMessage::ChangeNotice {
            path: format!("file{}.txt", i),
        });
    }

    assert!(!hub.contains(slow_id));
    assert!(hub.contains(fast_id));
    let mut received = 0;
    while fast_rx.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 10);
}

#[test]
fn test_concurrent_register_and_broadcast() {
    let hub = Arc::new(BroadcastHub::new());
    let mut receivers = Vec::new();

    std::thread::scope(|scope| {
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let hub = Arc::clone(&hub);
                scope.spawn(move || {
                    let mut local = Vec::new();
                    for _ in 0..25 {
                        let (sink, rx) = ChannelSink::channel(1024);
                        hub.register(Arc::new(sink));
                        local.push(rx);
                    }
                    local
                })
            })
            .collect();
        let broadcaster = {
            let hub = Arc::clone(&hub);
            scope.spawn(move || {
                for _ in 0..50 {
                    hub.broadcast(ServerMessage::error("tick"));
                }
            })
        };
        for producer in producers {
            receivers.extend(producer.join().unwrap());
        }
        broadcaster.join().unwrap();
    });

    assert_eq!(hub.len(), 100);
    let ids = hub.client_ids();
    let mut deduped = ids.clone();
    deduped.dedup();
    assert_eq!(ids, deduped, "client ids must be unique");
}
