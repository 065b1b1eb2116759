//! WebSocket transport
//!
//! One task per connection. Each connection registers a [`ChannelSink`] with the hub;
//! a writer task drains it into the socket while the reader loop dispatches client
//! requests to the root manager.

use crate::error::{RootError, ServerError};
use crate::hub::{BroadcastHub, ChannelSink, ClientId};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::root::RootHandle;
use futures::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Listener plus the shared state every connection needs
pub struct Server {
    listener: TcpListener,
    hub: Arc<BroadcastHub>,
    root: RootHandle,
    client_buffer: usize,
}

impl Server {
    pub async fn bind(
        addr: &str,
        hub: Arc<BroadcastHub>,
        root: RootHandle,
        client_buffer: usize,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self::from_listener(listener, hub, root, client_buffer))
    }

    /// Wrap an already bound listener.
    pub fn from_listener(
        listener: TcpListener,
        hub: Arc<BroadcastHub>,
        root: RootHandle,
        client_buffer: usize,
    ) -> Self {
        Self {
            listener,
            hub,
            root,
            client_buffer,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::Accept)
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(addr = ?self.listener.local_addr().ok(), "Listening");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            // Per-connection accept errors (e.g. EMFILE) are not fatal.
                            warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };
                    let hub = Arc::clone(&self.hub);
                    let root = self.root.clone();
                    let buffer = self.client_buffer;
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, peer, hub, root, buffer).await {
                            debug!(peer = %peer, error = %e, "Connection ended with error");
                        }
                    });
                }
            }
        }
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<BroadcastHub>,
    root: RootHandle,
    client_buffer: usize,
) -> Result<(), ServerError> {
    let socket = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, mut read) = socket.split();

    let (sink, mut rx) = ChannelSink::channel(client_buffer);
    let id = hub.register(Arc::new(sink));
    info!(client = %id, peer = %peer, "WebSocket connected");

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!(kind = message.kind(), error = %e, "Failed to encode message");
                    continue;
                }
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = write.close().await;
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_request(&text, id, &hub, &root).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(client = %id, error = %e, "Read failed");
                break;
            }
        }
    }

    hub.mark_closing(id);
    hub.unregister(id);
    // Dropping the hub's sink closes the queue; the writer drains what is left and exits.
    let _ = writer.await;
    info!(client = %id, "WebSocket disconnected");
    Ok(())
}

async fn handle_request(text: &str, id: ClientId, hub: &BroadcastHub, root: &RootHandle) {
    let request = match ClientMessage::parse(text) {
        Ok(request) => request,
        Err(e) => {
            debug!(client = %id, error = %e, "Unparseable request");
            reply(hub, id, ServerMessage::error(format!("Invalid request: {}", e)));
            return;
        }
    };

    match request {
        ClientMessage::GetStructure => {
            if let Err(e) = root.refresh_client(id) {
                reply(hub, id, ServerMessage::error(e.to_string()));
            }
        }
        ClientMessage::SwitchRoot { path } => {
            // Success and build failures are both broadcast by the root manager.
            match root.switch_root(path).await {
                Ok(_) | Err(RootError::Build(_)) => {}
                Err(e) => reply(hub, id, ServerMessage::error(e.to_string())),
            }
        }
        ClientMessage::GetRecent => match root.recent().await {
            Ok(paths) => reply(hub, id, ServerMessage::RecentRoots { paths }),
            Err(e) => reply(hub, id, ServerMessage::error(e.to_string())),
        },
    }
}

fn reply(hub: &BroadcastHub, id: ClientId, message: ServerMessage) {
    if let Err(failure) = hub.send_to(id, message) {
        debug!(client = %id, error = %failure, "Reply not delivered");
    }
}
