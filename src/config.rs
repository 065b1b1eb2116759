//! Configuration System
//!
//! Layered configuration: built-in defaults, the global config file, an explicit
//! `--config` file, then `DIRMIRROR__SECTION__KEY` environment variables. CLI flags are
//! applied on top by the binary.

use crate::error::ConfigError;
use crate::ignore::{IgnoreSet, BUILTIN_DEFAULTS};
use crate::logging::LoggingConfig;
use crate::root::{RootConfig, RECENT_CAPACITY};
use crate::tree::walker::WalkerConfig;
use crate::watch::WatchConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub root: RootSection,
    pub watch: WatchSection,
    pub ignore: IgnoreSection,
    pub tree: TreeSection,
    pub logging: LoggingConfig,
}

/// WebSocket listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// Outbound messages buffered per client before it counts as failed
    pub client_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            client_buffer: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RootSection {
    /// Root selected at startup
    pub default_root: PathBuf,
    pub recent_capacity: usize,
}

impl Default for RootSection {
    fn default() -> Self {
        Self {
            default_root: PathBuf::from("."),
            recent_capacity: RECENT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Idle gap in milliseconds that closes a coalescing window
    pub debounce_ms: u64,
    /// Upper bound in milliseconds on one coalescing window
    pub max_wait_ms: u64,
    pub channel_capacity: usize,
    pub retry_on_error: bool,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            max_wait_ms: 1000,
            channel_capacity: 1024,
            retry_on_error: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreSection {
    pub names: Vec<String>,
}

impl Default for IgnoreSection {
    fn default() -> Self {
        Self {
            names: BUILTIN_DEFAULTS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSection {
    /// Maximum traversal depth; unset means unlimited
    pub max_depth: Option<usize>,
}

impl AppConfig {
    /// Validate the configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.bind.trim().is_empty() {
            errors.push("server.bind cannot be empty".to_string());
        }
        if self.server.client_buffer == 0 {
            errors.push("server.client_buffer must be at least 1".to_string());
        }
        if self.watch.debounce_ms == 0 {
            errors.push("watch.debounce_ms must be at least 1".to_string());
        }
        if self.watch.max_wait_ms < self.watch.debounce_ms {
            errors.push(format!(
                "watch.max_wait_ms ({}) must not be below watch.debounce_ms ({})",
                self.watch.max_wait_ms, self.watch.debounce_ms
            ));
        }
        if self.watch.channel_capacity == 0 {
            errors.push("watch.channel_capacity must be at least 1".to_string());
        }
        if self.root.recent_capacity == 0 {
            errors.push("root.recent_capacity must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            )))
        }
    }

    pub fn ignore_set(&self) -> IgnoreSet {
        IgnoreSet::new(self.ignore.names.iter().cloned())
    }

    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: true,
            ignore: self.ignore_set(),
            max_depth: self.tree.max_depth,
        }
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            debounce: Duration::from_millis(self.watch.debounce_ms),
            max_wait: Duration::from_millis(self.watch.max_wait_ms),
            channel_capacity: self.watch.channel_capacity,
            ignore: self.ignore_set(),
        }
    }

    pub fn root_config(&self) -> RootConfig {
        RootConfig {
            retry_on_error: self.watch.retry_on_error,
            recent_capacity: self.root.recent_capacity,
            ..RootConfig::default()
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
