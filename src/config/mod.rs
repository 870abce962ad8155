//! Static startup configuration
//!
//! The engine is configured once, before any switch connects: the
//! subnet/gateway table, the switch-role table, and the designated
//! router. Invalid configuration is rejected before the engine
//! starts; nothing here is reloadable at runtime.

mod types;
mod validation;

pub use types::{Config, RoleConfig, SubnetConfig};
pub use validation::{validate, ValidationResult};

use crate::{Error, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    let config: Config = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
    Ok(config)
}
