//! CLI domain: clap definitions and the mapping of flags onto [`AppConfig`].

mod parse;

pub use parse::{Cli, Command};

use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::logging::LoggingConfig;

impl Cli {
    /// Apply subcommand flags on top of the loaded configuration, then revalidate.
    pub fn apply_overrides(&self, mut config: AppConfig) -> Result<AppConfig, ConfigError> {
        match &self.command {
            Command::Serve {
                root,
                bind,
                debounce_ms,
            } => {
                if let Some(root) = root {
                    config.root.default_root = root.clone();
                }
                if let Some(bind) = bind {
                    config.server.bind = bind.clone();
                }
                if let Some(ms) = debounce_ms {
                    config.watch.debounce_ms = *ms;
                    // An explicit debounce above the cap lifts the cap with it.
                    config.watch.max_wait_ms = config.watch.max_wait_ms.max(*ms);
                }
            }
            Command::Tree { root, .. } => {
                if let Some(root) = root {
                    config.root.default_root = root.clone();
                }
            }
            Command::Config => {}
        }
        config.validate()?;
        Ok(config)
    }

    /// Logging configuration with flag precedence: `--log-*` over `--verbose`/`--quiet`
    /// over the config file.
    pub fn logging_config(&self, base: LoggingConfig) -> LoggingConfig {
        let mut config = base;
        if self.quiet {
            config.enabled = false;
        }
        if self.verbose {
            config.level = "debug".to_string();
        }
        if let Some(ref level) = self.log_level {
            config.level = level.clone();
        }
        if let Some(ref format) = self.log_format {
            config.format = format.clone();
        }
        config
    }
}
