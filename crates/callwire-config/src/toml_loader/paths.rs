//! Where the config file lives, and writing the commented default.

use callwire_common::ConfigError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

use super::template::default_config_toml;

/// Environment variable naming a config file to use instead of the
/// platform default.
pub const CONFIG_PATH_ENV: &str = "CALLWIRE_CONFIG";

/// A resolved config file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Named by `CALLWIRE_CONFIG`. Must exist; never created.
    Env(PathBuf),
    /// `<config dir>/callwire/config.toml`. Created with defaults when absent.
    Platform(PathBuf),
}

impl ConfigLocation {
    pub fn path(&self) -> &Path {
        match self {
            ConfigLocation::Env(path) | ConfigLocation::Platform(path) => path,
        }
    }
}

/// Resolve the config location from the process environment.
pub fn config_location() -> Result<ConfigLocation, ConfigError> {
    resolve_location(std::env::var_os(CONFIG_PATH_ENV), dirs::config_dir())
}

/// Path of the config file `load_config` reads.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    config_location().map(|location| location.path().to_path_buf())
}

/// An empty override is treated as unset.
pub(super) fn resolve_location(
    env_override: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<ConfigLocation, ConfigError> {
    if let Some(raw) = env_override.filter(|raw| !raw.is_empty()) {
        return Ok(ConfigLocation::Env(PathBuf::from(raw)));
    }
    let config_dir = config_dir.ok_or_else(|| {
        ConfigError::ParseError(format!(
            "could not determine config directory; set {CONFIG_PATH_ENV} to a config file"
        ))
    })?;
    Ok(ConfigLocation::Platform(
        config_dir.join("callwire").join("config.toml"),
    ))
}

/// Write the commented default config, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_error = |action: &str, target: &Path, e: std::io::Error| {
        ConfigError::ParseError(format!("failed to {action} {}: {e}", target.display()))
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create config directory", parent, e))?;
    }
    std::fs::write(path, default_config_toml())
        .map_err(|e| io_error("write default config to", path, e))?;

    info!(path = %path.display(), "Created default config");
    Ok(())
}
