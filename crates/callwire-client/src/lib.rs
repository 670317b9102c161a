//! Realtime call event client.
//!
//! Keeps one WebSocket open to the call event endpoint, reconnects with
//! exponential backoff after abnormal closes, sends heartbeats while
//! connected, and fans server-pushed call events out to local callbacks
//! registered by event name.
//!
//! ```rust,no_run
//! use callwire_client::{EventKey, RealtimeClient, RealtimeConfig};
//!
//! # async fn run() -> Result<(), callwire_client::ClientError> {
//! let client = RealtimeClient::new(RealtimeConfig {
//!     origin: "https://crm.example.com".into(),
//!     ..Default::default()
//! });
//! // Tracked calls are re-subscribed by the client after a reconnect, so
//! // only the first open needs to subscribe.
//! let handle = client.downgrade();
//! client.on(EventKey::Connected, move |_| {
//!     if let Some(client) = handle.upgrade().filter(|c| c.tracked_calls().is_empty()) {
//!         client.subscribe_to_call("c1");
//!     }
//! });
//! client.on("ringing", |payload| println!("ringing: {payload}"));
//! client.connect()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod connection;
mod error;
mod handler;
mod protocol;
mod reconnect;
mod registry;
mod state;
mod types;

pub use callwire_common::CallId;
pub use client::{RealtimeClient, WeakRealtimeClient};
pub use error::ClientError;
pub use handler::call_event_dispatches;
pub use protocol::{iso_timestamp_now, ClientMessage, ServerMessage};
pub use reconnect::{
    ReconnectDecision, ReconnectPolicy, ABNORMAL_CLOSURE, NORMAL_CLOSURE, NO_STATUS_RECEIVED,
};
pub use registry::{SubscriberRegistry, Subscription};
pub use types::{ConnectionStatus, EventKey, ReadyState, RealtimeConfig, DEFAULT_WS_PATH};
