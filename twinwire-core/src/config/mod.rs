//! Board configuration
//!
//! Pins, bus timing, sensor behavior and console settings. The firmware
//! embeds a small TOML file and parses it at boot with [`parse_config`].

mod parse;
pub mod types;

pub use parse::{parse_config, ConfigError};
pub use types::*;
