//! Configuration loading facade

use super::sources::{environment, explicit_file, global_file};
use super::AppConfig;
use crate::error::ConfigError;
use config::Config;
use std::path::Path;

/// Loads and validates [`AppConfig`] from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, the global file, an optional explicit file and the environment.
    pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut builder = global_file::add_to_builder(Config::builder());
        if let Some(path) = explicit {
            builder = explicit_file::add_to_builder(builder, path);
        }
        builder = environment::add_to_builder(builder);

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single file on top of defaults, with no global file or environment.
    pub fn load_from_file(path: &Path) -> Result<AppConfig, ConfigError> {
        let builder = explicit_file::add_to_builder(Config::builder(), path);
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults only.
    pub fn defaults() -> AppConfig {
        AppConfig::default()
    }
}
