//! Configuration schema types for Callwire.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with defaults matching the realtime client's
//! built-in behavior.

mod connection;
mod system;

pub use connection::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Callwire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct CallwireConfig {
    pub connection: ConnectionConfig,
    pub reconnect: ReconnectConfig,
    pub heartbeat: HeartbeatConfig,
    pub subscriptions: SubscriptionsConfig,
    pub logging: LoggingConfig,
}
