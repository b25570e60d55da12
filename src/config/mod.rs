//! Native configuration and its layered loading
//!
//! The native configuration is a flat key/value bag built from:
//! 1. Built-in lane defaults
//! 2. Host config (`$CLUSTER_LANE_CONF` or ~/.config/cluster-lane/config.toml)
//! 3. An explicitly named config file
//! 4. CLI `-D key=value` overrides

mod configuration;
mod defaults;
mod effective;
mod merge;
pub mod options;

pub use configuration::{ConfigError, Configuration};
pub use defaults::BuiltinDefaults;
pub use effective::{default_host_config_path, parse_override, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{flatten_toml, merge_layers};
