//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Callwire Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[connection]
# origin = "http://localhost:3000"   # https origins connect over wss
# path = "/api/jive-webrtc/ws"
# endpoint = "wss://crm.example.com/api/jive-webrtc/ws"   # overrides origin + path
# connect_timeout_secs = 15          # 0-300, 0 disables

[reconnect]
# base_delay_ms = 1000               # 10-60000, doubles per attempt
# max_attempts = 5                   # 0-100

[heartbeat]
# enabled = true
# interval_secs = 30                 # 1-3600

[subscriptions]
# resubscribe_on_reconnect = true

[logging]
# level = "info"                     # trace, debug, info, warn, error
"##
    .to_string()
}
