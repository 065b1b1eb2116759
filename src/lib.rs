//! dirmirror: live directory tree mirroring
//!
//! Builds a JSON-serializable snapshot of a directory tree, watches it for changes,
//! coalesces bursts of filesystem events into single notifications and fans snapshots
//! and change notices out to every connected WebSocket viewer.

pub mod cli;
pub mod config;
pub mod error;
pub mod hub;
pub mod ignore;
pub mod logging;
pub mod protocol;
pub mod root;
pub mod server;
pub mod tree;
pub mod watch;
