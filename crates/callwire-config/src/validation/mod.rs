//! Full configuration validation.
//!
//! Validates numeric ranges and URL shapes. Each domain has its own
//! submodule; this orchestrator calls them all and collects errors into a
//! single `ConfigError`.

mod connection;
mod helpers;


use crate::schema::CallwireConfig;
use callwire_common::ConfigError;
use helpers::FieldErrors;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &CallwireConfig) -> Result<(), ConfigError> {
    let mut errors = FieldErrors::default();

    connection::validate_connection(&mut errors, config);
    connection::validate_reconnect(&mut errors, config);
    connection::validate_heartbeat(&mut errors, config);

    errors.into_result()
}
