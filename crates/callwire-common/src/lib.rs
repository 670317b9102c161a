pub mod errors;
pub mod id;

pub use errors::{CallwireError, ConfigError};
pub use id::{CallId, SubscriptionId};

pub type Result<T> = std::result::Result<T, CallwireError>;

/// Path of the call event WebSocket on the hosting origin.
pub const DEFAULT_WS_PATH: &str = "/api/jive-webrtc/ws";
