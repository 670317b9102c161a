//! Reading and parsing config files.

use crate::schema::CallwireConfig;
use crate::validation;
use callwire_common::ConfigError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

use super::paths::{config_location, create_default_config, ConfigLocation};

/// Load config from a specific TOML file path.
///
/// Missing fields take their serde defaults. Validation failures are only
/// logged here; [`crate::load_config_from`] is the strict variant.
pub fn load_from_path(path: &Path) -> Result<CallwireConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let config = parse_toml(&content, path)?;
    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "Config validation warning: {e}");
    }

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse config text, naming `origin` in the error.
pub(super) fn parse_toml(content: &str, origin: &Path) -> Result<CallwireConfig, ConfigError> {
    toml::from_str(content).map_err(|e| {
        ConfigError::ParseError(format!("{}: {}", origin.display(), e.to_string().trim_end()))
    })
}

/// Load config from `CALLWIRE_CONFIG` or the platform default path.
///
/// On macOS: `~/Library/Application Support/callwire/config.toml`
/// On Linux: `~/.config/callwire/config.toml`
///
/// A missing platform file is created with commented defaults. A missing
/// `CALLWIRE_CONFIG` file is an error.
pub fn load_default() -> Result<CallwireConfig, ConfigError> {
    match config_location()? {
        ConfigLocation::Env(path) => load_from_path(&path),
        ConfigLocation::Platform(path) => match load_from_path(&path) {
            Err(ConfigError::FileNotFound(_)) => {
                info!(path = %path.display(), "No config found, creating default");
                create_default_config(&path)?;
                Ok(CallwireConfig::default())
            }
            other => other,
        },
    }
}
