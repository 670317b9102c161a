//! `callwire listen`: drive the realtime client from the command line.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use callwire_client::{CallId, EventKey, RealtimeClient, RealtimeConfig, ReconnectPolicy};
use callwire_common::Result;
use callwire_config::CallwireConfig;
use tracing::{info, warn};

use crate::cli::ListenArgs;

/// Grace period for the close frame to go out after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Build the client configuration from the config file plus flags.
///
/// `--endpoint` wins over everything. `--origin` alone also overrides an
/// endpoint set in the config file.
pub fn realtime_config(config: &CallwireConfig, args: &ListenArgs) -> RealtimeConfig {
    let connection = &config.connection;
    let endpoint = match (&args.endpoint, &args.origin) {
        (Some(endpoint), _) => Some(endpoint.clone()),
        (None, Some(_)) => None,
        (None, None) => connection.endpoint.clone(),
    };

    RealtimeConfig {
        origin: args
            .origin
            .clone()
            .unwrap_or_else(|| connection.origin.clone()),
        path: connection.path.clone(),
        endpoint,
        connect_timeout: (connection.connect_timeout_secs > 0)
            .then(|| Duration::from_secs(u64::from(connection.connect_timeout_secs))),
        reconnect: ReconnectPolicy {
            base_delay: Duration::from_millis(u64::from(config.reconnect.base_delay_ms)),
            max_attempts: config.reconnect.max_attempts,
        },
        heartbeat_interval: config
            .heartbeat
            .enabled
            .then(|| Duration::from_secs(u64::from(config.heartbeat.interval_secs))),
        resubscribe_on_reconnect: config.subscriptions.resubscribe_on_reconnect,
    }
}

/// Anything that reads as a JSON number is sent as one, everything else as a string.
pub fn parse_call_id(raw: &str) -> CallId {
    match raw.parse::<serde_json::Number>() {
        Ok(n) => CallId::from(n),
        Err(_) => CallId::from(raw),
    }
}

pub async fn run(config: &CallwireConfig, args: ListenArgs) -> Result<()> {
    let client = RealtimeClient::new(realtime_config(config, &args));
    let calls: Vec<CallId> = args.calls.iter().map(|raw| parse_call_id(raw)).collect();

    // The client re-sends tracked subscriptions itself after a reconnect,
    // so only the first open needs them unless that is switched off.
    let resubscribes = client.config().resubscribe_on_reconnect;
    let first_open = AtomicBool::new(true);
    let handle = client.downgrade();
    client.on(EventKey::Connected, move |_| {
        let Some(client) = handle.upgrade() else {
            return;
        };
        if first_open.swap(false, Ordering::SeqCst) || !resubscribes {
            for call_id in &calls {
                client.subscribe_to_call(call_id.clone());
            }
        }
    });

    client.on(EventKey::CallEvent, |payload| {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{payload}") {
            warn!(error = %e, "Failed to write call event");
        }
    });

    client.on(EventKey::Disconnected, |payload| {
        info!(code = %payload["code"], reason = %payload["reason"], "Disconnected");
    });

    client.connect()?;
    info!("Listening for call events, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    client.disconnect();
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    Ok(())
}
