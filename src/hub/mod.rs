//! Broadcast Hub
//!
//! Owns the set of connected clients. Registration, unregistration, targeted sends and
//! broadcasts may come from any task at any time. Every delivery is a non-blocking hand-off
//! to the client's [`ClientSink`] made under one registry lock, so each client sees
//! messages in the order the hub accepted them.
//!
//! A newly registered client is *unprimed* until a snapshot has been delivered to it,
//! normally the initial one requested from the [`SnapshotProvider`]. Broadcasts other
//! than snapshots skip unprimed clients, so a viewer never sees a change notice before
//! a snapshot.

pub mod client;

use crate::error::DeliveryFailure;
use crate::protocol::ServerMessage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

pub use client::{ChannelSink, ClientId, ClientSink, ConnectionState, Outbound};

/// Supplies a freshly built snapshot for a newly registered client.
///
/// Implementations must answer asynchronously via [`BroadcastHub::send_to`] and must not
/// block the caller.
pub trait SnapshotProvider: Send + Sync {
    fn request_snapshot(&self, client: ClientId);
}

struct ClientEntry {
    sink: Arc<dyn ClientSink>,
    state: ConnectionState,
    primed: bool,
}

/// Concurrency-safe client registry with fan-out delivery
pub struct BroadcastHub {
    clients: Mutex<HashMap<ClientId, ClientEntry>>,
    next_id: AtomicU64,
    provider: OnceLock<Arc<dyn SnapshotProvider>>,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            provider: OnceLock::new(),
        }
    }

    /// Install the snapshot provider. Only the first call takes effect.
    pub fn set_snapshot_provider(&self, provider: Arc<dyn SnapshotProvider>) -> bool {
        self.provider.set(provider).is_ok()
    }

    /// Register a client and request its initial snapshot.
    ///
    /// Without a provider the client is primed immediately.
    pub fn register(&self, sink: Arc<dyn ClientSink>) -> ClientId {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let provider = self.provider.get().cloned();
        {
            let mut clients = self.clients.lock();
            clients.insert(
                id,
                ClientEntry {
                    sink,
                    state: ConnectionState::Open,
                    primed: provider.is_none(),
                },
            );
            info!(client = %id, clients = clients.len(), "Client registered");
        }
        if let Some(provider) = provider {
            provider.request_snapshot(id);
        }
        id
    }

    /// Remove a client. Returns false if it was not registered.
    pub fn unregister(&self, id: ClientId) -> bool {
        let mut clients = self.clients.lock();
        let removed = clients.remove(&id).is_some();
        if removed {
            info!(client = %id, clients = clients.len(), "Client unregistered");
        }
        removed
    }

    /// Stop broadcasting to a client whose connection is shutting down.
    pub fn mark_closing(&self, id: ClientId) {
        if let Some(entry) = self.clients.lock().get_mut(&id) {
            entry.state = ConnectionState::Closing;
        }
    }

    /// Deliver to one client. A failed delivery unregisters the client.
    pub fn send_to(&self, id: ClientId, message: ServerMessage) -> Result<(), DeliveryFailure> {
        let mut clients = self.clients.lock();
        let Some(entry) = clients.get_mut(&id) else {
            return Err(DeliveryFailure::UnknownClient(id));
        };
        if entry.state != ConnectionState::Open {
            return Err(DeliveryFailure::Closed);
        }
        let kind = message.kind();
        let primes = matches!(message, ServerMessage::Snapshot(_));
        match entry.sink.deliver(Arc::new(message)) {
            Ok(()) => {
                entry.primed |= primes;
                debug!(client = %id, kind, "Delivered");
                Ok(())
            }
            Err(failure) => {
                clients.remove(&id);
                warn!(client = %id, kind, error = %failure, "Delivery failed, client dropped");
                Err(failure)
            }
        }
    }

    /// Deliver to every open client, skipping unprimed ones unless the message is a
    /// snapshot. Returns the number of successful deliveries.
    ///
    /// Clients whose delivery fails are unregistered; the rest still receive the message.
    pub fn broadcast(&self, message: ServerMessage) -> usize {
        let kind = message.kind();
        let primes = matches!(message, ServerMessage::Snapshot(_));
        let message: Outbound = Arc::new(message);
        let mut delivered = 0usize;
        let mut dropped = Vec::new();

        let mut clients = self.clients.lock();
        clients.retain(|id, entry| {
            if entry.state != ConnectionState::Open || !(entry.primed || primes) {
                return true;
            }
            match entry.sink.deliver(Arc::clone(&message)) {
                Ok(()) => {
                    entry.primed |= primes;
                    delivered += 1;
                    true
                }
                Err(failure) => {
                    dropped.push((*id, failure));
                    false
                }
            }
        });
        let remaining = clients.len();
        drop(clients);

        for (id, failure) in dropped {
            warn!(client = %id, kind, error = %failure, "Broadcast delivery failed, client dropped");
        }
        debug!(kind, delivered, clients = remaining, "Broadcast");
        delivered
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.lock().contains_key(&id)
    }

    pub fn state(&self, id: ClientId) -> ConnectionState {
        self.clients
            .lock()
            .get(&id)
            .map(|entry| entry.state)
            .unwrap_or(ConnectionState::Closed)
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.clients.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
