//! Transport configuration types: endpoint, reconnect, heartbeat, and
//! call subscription behavior.

use callwire_common::DEFAULT_WS_PATH;
use serde::{Deserialize, Serialize};

/// Where the realtime endpoint lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Origin of the hosting page (`https://crm.example.com`). The scheme
    /// selects `wss:` or `ws:`.
    pub origin: String,
    /// WebSocket path appended to the origin host.
    pub path: String,
    /// Full `ws://` / `wss://` URL. Takes precedence over `origin` + `path`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Connect timeout in seconds (valid range: 0-300, 0 disables).
    pub connect_timeout_secs: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".into(),
            path: DEFAULT_WS_PATH.into(),
            endpoint: None,
            connect_timeout_secs: 15,
        }
    }
}

/// Reconnect backoff after abnormal closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first retry; doubles per attempt (valid range: 10-60000).
    pub base_delay_ms: u32,
    /// Consecutive failed cycles before giving up (valid range: 0-100).
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_attempts: 5,
        }
    }
}

/// Keepalive pings while connected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    /// Ping interval in seconds (valid range: 1-3600).
    pub interval_secs: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionsConfig {
    /// Re-send `subscribe` for every tracked call after a reconnect.
    pub resubscribe_on_reconnect: bool,
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            resubscribe_on_reconnect: true,
        }
    }
}
