//! Client identity and delivery sinks

use crate::error::DeliveryFailure;
use crate::protocol::ServerMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Message as queued for delivery; shared between all recipients of a broadcast
pub type Outbound = Arc<ServerMessage>;

/// Opaque identity of one connection, never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub(crate) u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    /// Close handshake in progress; no further broadcasts
    Closing,
    Closed,
}

/// Where the hub hands messages for one client.
///
/// `deliver` must not block: the hub calls it while holding its registry lock.
pub trait ClientSink: Send + Sync {
    fn deliver(&self, message: Outbound) -> Result<(), DeliveryFailure>;
}

/// Sink backed by a bounded queue drained by the connection's writer task.
///
/// A full queue counts as a delivery failure: a viewer that cannot keep up is dropped
/// rather than buffered without bound.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Outbound>,
}

impl ChannelSink {
    /// Create a sink and the receiver its writer task drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ClientSink for ChannelSink {
    fn deliver(&self, message: Outbound) -> Result<(), DeliveryFailure> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::Full,
            TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }
}
