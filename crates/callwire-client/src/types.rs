//! Types for the realtime call event client.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use callwire_common::CallId;
use serde::{Serialize, Serializer};
use url::Url;

use crate::error::ClientError;
use crate::protocol::ClientMessage;
use crate::reconnect::ReconnectPolicy;

pub use callwire_common::DEFAULT_WS_PATH;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to the call event endpoint.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// Origin of the hosting page, e.g. `https://crm.example.com`.
    pub origin: String,
    /// WebSocket path appended to the origin host.
    pub path: String,
    /// Full `ws://` or `wss://` URL. Wins over `origin` + `path`.
    pub endpoint: Option<String>,
    /// Upper bound on a single connect attempt. `None` waits forever.
    pub connect_timeout: Option<Duration>,
    pub reconnect: ReconnectPolicy,
    /// Ping interval while connected. `None` disables the heartbeat.
    pub heartbeat_interval: Option<Duration>,
    /// Re-send `subscribe` for tracked calls after every successful open.
    pub resubscribe_on_reconnect: bool,
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Endpoint URLs may carry tokens in the query string.
        let endpoint = self.endpoint.as_deref().map(redact_query);
        f.debug_struct("RealtimeConfig")
            .field("origin", &self.origin)
            .field("path", &self.path)
            .field("endpoint", &endpoint)
            .field("connect_timeout", &self.connect_timeout)
            .field("reconnect", &self.reconnect)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("resubscribe_on_reconnect", &self.resubscribe_on_reconnect)
            .finish()
    }
}

fn redact_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?[REDACTED]"),
        None => url.to_string(),
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".into(),
            path: DEFAULT_WS_PATH.into(),
            endpoint: None,
            connect_timeout: Some(Duration::from_secs(15)),
            reconnect: ReconnectPolicy::default(),
            heartbeat_interval: Some(Duration::from_secs(30)),
            resubscribe_on_reconnect: true,
        }
    }
}

impl RealtimeConfig {
    /// Resolve the WebSocket URL.
    ///
    /// An explicit `endpoint` is used as-is once its scheme is checked.
    /// Otherwise the scheme follows the origin (`https` gives `wss`,
    /// anything else gives `ws`) and `path` is appended to the origin's
    /// host and port.
    pub fn ws_url(&self) -> Result<String, ClientError> {
        if let Some(endpoint) = &self.endpoint {
            let parsed = Url::parse(endpoint.trim())
                .map_err(|e| ClientError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
            return match parsed.scheme() {
                "ws" | "wss" => Ok(parsed.to_string()),
                other => Err(ClientError::InvalidEndpoint(format!(
                    "endpoint scheme must be ws or wss, got {other}"
                ))),
            };
        }

        let origin = Url::parse(self.origin.trim())
            .map_err(|e| ClientError::InvalidEndpoint(format!("{}: {e}", self.origin)))?;
        let scheme = if origin.scheme() == "https" { "wss" } else { "ws" };
        let host = origin
            .host_str()
            .ok_or_else(|| ClientError::InvalidEndpoint(format!("{} has no host", self.origin)))?;
        let authority = match origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(format!("{scheme}://{authority}{}", self.path))
    }
}

// ---------------------------------------------------------------------------
// Connection status
// ---------------------------------------------------------------------------

/// Transport ready state, numbered the way WebSocket ready states are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Serialize for ReadyState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

/// Snapshot returned by [`crate::RealtimeClient::connection_status`].
///
/// `ready_state` is `None` when no transport exists, i.e. before the first
/// `connect()` and after `disconnect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub reconnect_attempts: u32,
    pub ready_state: Option<ReadyState>,
}

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Name under which callbacks are registered and events are dispatched.
///
/// Lifecycle events and the generic `call_event` are fixed names; a call's
/// own channel is `call_<id>`; anything else (usually a call event `type`
/// such as `ringing`) is a custom name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    Connected,
    Disconnected,
    Error,
    CallEvent,
    Call(CallId),
    Custom(String),
}

impl EventKey {
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            EventKey::Connected => Cow::Borrowed("connected"),
            EventKey::Disconnected => Cow::Borrowed("disconnected"),
            EventKey::Error => Cow::Borrowed("error"),
            EventKey::CallEvent => Cow::Borrowed("call_event"),
            EventKey::Call(call_id) => Cow::Owned(call_id.channel()),
            EventKey::Custom(name) => Cow::Borrowed(name.as_str()),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl From<&str> for EventKey {
    fn from(name: &str) -> Self {
        EventKey::Custom(name.to_string())
    }
}

impl From<String> for EventKey {
    fn from(name: String) -> Self {
        EventKey::Custom(name)
    }
}

impl From<CallId> for EventKey {
    fn from(call_id: CallId) -> Self {
        EventKey::Call(call_id)
    }
}

// ---------------------------------------------------------------------------
// Worker commands
// ---------------------------------------------------------------------------

/// Commands sent from the client handle to the connection worker.
#[derive(Debug)]
pub(crate) enum Command {
    Send(ClientMessage),
    /// Close with 1000 and stop for good.
    Disconnect,
    /// A newer `connect()` replaced this worker; close without events.
    Supersede,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_origin(origin: &str) -> RealtimeConfig {
        RealtimeConfig {
            origin: origin.into(),
            ..Default::default()
        }
    }

    #[test]
    fn https_origin_resolves_to_wss() {
        let url = config_with_origin("https://crm.example.com").ws_url().unwrap();
        assert_eq!(url, "wss://crm.example.com/api/jive-webrtc/ws");
    }

    #[test]
    fn http_origin_keeps_port() {
        let url = config_with_origin("http://localhost:3000/dashboard?tab=calls")
            .ws_url()
            .unwrap();
        assert_eq!(url, "ws://localhost:3000/api/jive-webrtc/ws");
    }

    #[test]
    fn explicit_endpoint_wins() {
        let config = RealtimeConfig {
            origin: "https://ignored.example.com".into(),
            endpoint: Some("ws://127.0.0.1:9000/custom".into()),
            ..Default::default()
        };
        assert_eq!(config.ws_url().unwrap(), "ws://127.0.0.1:9000/custom");
    }

    #[test]
    fn endpoint_with_http_scheme_is_rejected() {
        let config = RealtimeConfig {
            endpoint: Some("http://127.0.0.1:9000/ws".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.ws_url(),
            Err(ClientError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn unparseable_origin_is_rejected() {
        let err = config_with_origin("not a url").ws_url().unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint(_)));
    }

    #[test]
    fn debug_redacts_endpoint_query() {
        let config = RealtimeConfig {
            endpoint: Some("wss://calls.example.com/ws?token=secret".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn event_keys_map_to_canonical_names() {
        assert_eq!(EventKey::Connected.as_key(), "connected");
        assert_eq!(EventKey::Disconnected.as_key(), "disconnected");
        assert_eq!(EventKey::Error.as_key(), "error");
        assert_eq!(EventKey::CallEvent.as_key(), "call_event");
        assert_eq!(EventKey::Call(CallId::from("c1")).as_key(), "call_c1");
        assert_eq!(EventKey::Call(CallId::from(42i64)).as_key(), "call_42");
        assert_eq!(EventKey::from("ringing").as_key(), "ringing");
    }

    #[test]
    fn status_serializes_camel_case_with_numeric_ready_state() {
        let status = ConnectionStatus {
            is_connected: true,
            reconnect_attempts: 0,
            ready_state: Some(ReadyState::Open),
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"isConnected": true, "reconnectAttempts": 0, "readyState": 1})
        );

        let idle = ConnectionStatus {
            is_connected: false,
            reconnect_attempts: 0,
            ready_state: None,
        };
        assert_eq!(serde_json::to_value(idle).unwrap()["readyState"], serde_json::Value::Null);
    }
}
