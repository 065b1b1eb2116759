//! Wire protocol
//!
//! JSON text frames with a `type` discriminator.
//!
//! Server to client: `structure`, `fileChange`, `error`, `recentRoots`.
//! Client to server: `getStructure`, `switchRoot`, `getRecent`.

use crate::tree::Snapshot;
use crate::watch::ChangeScope;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Messages pushed to viewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full tree of the current root
    #[serde(rename = "structure")]
    Snapshot(Arc<Snapshot>),

    /// A coalesced change; `path` is root-relative, `*` when several paths changed
    #[serde(rename = "fileChange")]
    ChangeNotice { path: String },

    #[serde(rename = "error")]
    Error { message: String },

    /// Reply to `getRecent`, most recent first
    #[serde(rename = "recentRoots")]
    RecentRoots { paths: Vec<PathBuf> },
}

impl ServerMessage {
    pub fn snapshot(snapshot: Snapshot) -> Self {
        ServerMessage::Snapshot(Arc::new(snapshot))
    }

    pub fn change(scope: &ChangeScope) -> Self {
        ServerMessage::ChangeNotice {
            path: scope.as_wire_path().to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Short kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Snapshot(_) => "structure",
            ServerMessage::ChangeNotice { .. } => "fileChange",
            ServerMessage::Error { .. } => "error",
            ServerMessage::RecentRoots { .. } => "recentRoots",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Requests from viewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Send me a fresh snapshot now
    GetStructure,
    /// Switch the watched root for everyone
    SwitchRoot { path: PathBuf },
    /// Send me the recent roots list
    GetRecent,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
