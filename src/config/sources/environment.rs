//! Environment source: `DIRMIRROR__SECTION__KEY=value`

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub const ENV_PREFIX: &str = "DIRMIRROR";

/// Add the process environment. `DIRMIRROR__IGNORE__NAMES` is a comma separated list.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("ignore.names")
            .try_parsing(true),
    )
}
