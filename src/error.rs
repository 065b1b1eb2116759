//! Error types for the dirmirror live synchronization core.

use crate::hub::ClientId;
use std::path::PathBuf;
use thiserror::Error;

/// Tree build errors
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Root not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Tree I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Filesystem watch errors
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to create watcher: {0}")]
    Create(String),

    #[error("Failed to watch {path}: {message}")]
    Subscribe { path: PathBuf, message: String },

    #[error("Watcher runtime error: {0}")]
    Runtime(String),
}

/// Root manager errors
#[derive(Debug, Error)]
pub enum RootError {
    #[error("Invalid root {path}: {source}")]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: TreeError,
    },

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("Snapshot build failed: {0}")]
    Build(TreeError),

    #[error("No root selected")]
    NoRootSelected,

    #[error("Root manager has stopped")]
    ManagerStopped,
}

/// Per-client delivery failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    #[error("Client connection closed")]
    Closed,

    #[error("Client buffer full")]
    Full,

    #[error("Unknown client: {0}")]
    UnknownClient(ClientId),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Server transport errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Accept failed: {0}")]
    Accept(#[source] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
