//! Errors surfaced by the realtime client.
//!
//! Only [`crate::RealtimeClient::connect`] returns these to callers. Failures
//! on the transport path are reported through the `error` event instead.

use std::time::Duration;

use callwire_common::CallwireError;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Origin or endpoint could not be turned into a `ws://`/`wss://` URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// `connect()` was called outside a tokio runtime.
    #[error("no tokio runtime available to drive the connection")]
    NoRuntime,

    #[error("websocket error: {0}")]
    WebSocket(#[from] WsError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),
}

impl From<ClientError> for CallwireError {
    fn from(err: ClientError) -> Self {
        CallwireError::Client(err.to_string())
    }
}
