//! Global config file source: `<config dir>/dirmirror/config.toml`

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::File;
use std::path::PathBuf;
use tracing::debug;

/// Path to the global config file (`$XDG_CONFIG_HOME/dirmirror/config.toml` on Linux).
pub fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "dirmirror")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Add global config file source to builder if it exists.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    match global_config_path() {
        Some(path) if path.is_file() => builder.add_source(File::from(path).required(false)),
        Some(path) => {
            debug!(config_path = %path.display(), "No global configuration file");
            builder
        }
        None => builder,
    }
}
