//! Callwire configuration system.
//!
//! Provides TOML-based configuration for the realtime call event client.
//! All config sections use sensible defaults so partial configs work out
//! of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use callwire_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{CallwireConfig, CONFIG_SCHEMA_VERSION};

use callwire_common::ConfigError;
use std::path::Path;

/// Load config from `CALLWIRE_CONFIG` or the platform default path and
/// validate it.
///
/// Creates a commented default `config.toml` in the OS config directory
/// when none exists there.
pub fn load_config() -> Result<CallwireConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit path and validate it.
pub fn load_config_from(path: &Path) -> Result<CallwireConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &CallwireConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
