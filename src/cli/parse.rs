//! CLI parse: clap types for dirmirror. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dirmirror - live directory tree mirroring over WebSocket
#[derive(Debug, Parser)]
#[command(name = "dirmirror")]
#[command(about = "Serve a live JSON mirror of a directory tree over WebSocket")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path (layered over the global config file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true, default_value = "false", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the WebSocket server until Ctrl-C
    Serve {
        /// Directory mirrored at startup
        #[arg(long)]
        root: Option<PathBuf>,
        /// Listen address, e.g. 127.0.0.1:3000
        #[arg(long)]
        bind: Option<String>,
        /// Idle gap in milliseconds that closes a coalescing window
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
    /// Build one snapshot and print it as JSON
    Tree {
        /// Directory to build (defaults to the configured root)
        #[arg(long)]
        root: Option<PathBuf>,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}
