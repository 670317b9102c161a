//! Wire messages exchanged with the call event endpoint.
//!
//! Every frame is a JSON object with a `type` discriminator. Outbound
//! messages are a closed set. Inbound messages decode into the known
//! variants when the `type` is recognized; anything else is kept as
//! [`ServerMessage::Unrecognized`] so new server features never break the
//! read loop.

use callwire_common::CallId;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages the client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask the server to push events for one call.
    Subscribe {
        #[serde(rename = "callId")]
        call_id: CallId,
    },
    /// Keepalive carrying the send time.
    Ping { timestamp: String },
}

impl ClientMessage {
    /// A ping stamped with the current time.
    pub fn ping_now() -> Self {
        ClientMessage::Ping {
            timestamp: iso_timestamp_now(),
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Messages the server pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting sent right after the socket opens.
    Connection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A call changed state. `data.type` names the specific event.
    CallEvent {
        #[serde(
            rename = "callId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        call_id: Option<CallId>,
        #[serde(default)]
        data: Value,
    },
    /// Acknowledges a `subscribe`.
    Subscribed {
        #[serde(
            rename = "callId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        call_id: Option<CallId>,
    },
    /// Heartbeat reply.
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Server-reported problem.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Any frame whose `type` is missing or unknown.
    #[serde(skip)]
    Unrecognized { kind: Option<String>, raw: Value },
}

const KNOWN_SERVER_TYPES: &[&str] = &["connection", "call_event", "subscribed", "pong", "error"];

impl ServerMessage {
    /// Decode a text frame. Fails only when the frame is not JSON or a
    /// known `type` carries fields of the wrong shape.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value.get("type").and_then(Value::as_str).map(str::to_owned);
        match kind.as_deref() {
            Some(known) if KNOWN_SERVER_TYPES.contains(&known) => serde_json::from_value(value),
            _ => Ok(ServerMessage::Unrecognized { kind, raw: value }),
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        match self {
            ServerMessage::Unrecognized { raw, .. } => serde_json::to_string(raw),
            other => serde_json::to_string(other),
        }
    }
}

/// Current UTC time as ISO-8601 with millisecond precision.
pub fn iso_timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
