//! Validation for the connection, reconnect, and heartbeat sections.

use crate::schema::CallwireConfig;

use super::helpers::FieldErrors;

/// Either an explicit `ws(s)://` endpoint, or an `http(s)://` origin plus an
/// absolute path.
pub(crate) fn validate_connection(errors: &mut FieldErrors, config: &CallwireConfig) {
    let connection = &config.connection;
    match &connection.endpoint {
        Some(endpoint) => errors.has_prefix("connection.endpoint", endpoint, &["ws://", "wss://"]),
        None => {
            errors.has_prefix("connection.origin", &connection.origin, &["http://", "https://"]);
            errors.has_prefix("connection.path", &connection.path, &["/"]);
        }
    }
    errors.in_range(
        "connection.connect_timeout_secs",
        connection.connect_timeout_secs,
        0..=300,
    );
}

pub(crate) fn validate_reconnect(errors: &mut FieldErrors, config: &CallwireConfig) {
    errors.in_range("reconnect.base_delay_ms", config.reconnect.base_delay_ms, 10..=60_000);
    errors.in_range("reconnect.max_attempts", config.reconnect.max_attempts, 0..=100);
}

/// The interval only matters while the heartbeat is enabled.
pub(crate) fn validate_heartbeat(errors: &mut FieldErrors, config: &CallwireConfig) {
    if config.heartbeat.enabled {
        errors.in_range("heartbeat.interval_secs", config.heartbeat.interval_secs, 1..=3600);
    }
}
