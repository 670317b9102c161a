//! TOML config file loading and creation.

mod loader;
mod paths;
mod template;


pub use loader::{load_default, load_from_path};
pub use paths::{
    config_location, create_default_config, default_config_path, ConfigLocation, CONFIG_PATH_ENV,
};
