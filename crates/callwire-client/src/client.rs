//! Public handle for the realtime call event connection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use callwire_common::CallId;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::connection::{connection_loop, Worker};
use crate::error::ClientError;
use crate::protocol::ClientMessage;
use crate::registry::{SubscriberRegistry, Subscription};
use crate::state::SharedState;
use crate::types::{Command, ConnectionStatus, EventKey, RealtimeConfig};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for the call event connection.
///
/// Cheap to clone; clones share the connection, the callback registry and
/// the tracked calls. No method blocks: sends are queued to a background
/// worker spawned by [`connect`](Self::connect), and callbacks run on that
/// worker. The connection is torn down when the last clone is dropped.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<ClientInner>,
}

/// Non-owning handle to a [`RealtimeClient`], for use inside callbacks.
///
/// Does not keep the connection alive.
#[derive(Clone, Debug)]
pub struct WeakRealtimeClient {
    inner: Weak<ClientInner>,
}

impl WeakRealtimeClient {
    /// The client, if any strong handle to it still exists.
    pub fn upgrade(&self) -> Option<RealtimeClient> {
        self.inner.upgrade().map(|inner| RealtimeClient { inner })
    }
}

struct ClientInner {
    config: RealtimeConfig,
    state: Arc<SharedState>,
    registry: Arc<SubscriberRegistry>,
    worker: Mutex<Option<WorkerHandle>>,
}

struct WorkerHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.task.abort();
        }
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("config", &self.inner.config)
            .field("status", &self.connection_status())
            .finish()
    }
}

impl RealtimeClient {
    /// Create an idle client. Nothing connects until [`connect`](Self::connect).
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                state: Arc::new(SharedState::default()),
                registry: Arc::new(SubscriberRegistry::new()),
                worker: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    /// A handle that callbacks can capture without keeping the client alive.
    pub fn downgrade(&self) -> WeakRealtimeClient {
        WeakRealtimeClient {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn worker(&self) -> MutexGuard<'_, Option<WorkerHandle>> {
        self.inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start connecting in the background.
    ///
    /// Replaces any existing connection or pending reconnect; the replaced
    /// transport is closed without firing events. Must be called from within
    /// a tokio runtime. Errors only if the endpoint URL cannot be resolved
    /// or no runtime is available.
    pub fn connect(&self) -> Result<(), ClientError> {
        let url = self.inner.config.ws_url()?;
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let mut slot = self.worker();
        if let Some(previous) = slot.take() {
            debug!("Replacing existing call event connection");
            let _ = previous.commands.send(Command::Supersede);
        }

        let generation = self.inner.state.begin_generation();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(connection_loop(Worker {
            url,
            generation,
            config: self.inner.config.clone(),
            state: Arc::clone(&self.inner.state),
            registry: Arc::clone(&self.inner.registry),
            commands: command_rx,
        }));
        *slot = Some(WorkerHandle { commands, task });
        Ok(())
    }

    /// Close the connection with code 1000 and stop reconnecting.
    ///
    /// Takes effect immediately: the status reads disconnected on return and
    /// a pending backoff timer will never reconnect. `disconnected` fires
    /// with `{code: 1000, reason: "Client disconnect"}` when a socket was open
    /// or still handshaking; it does not fire again while waiting out a
    /// backoff, since that socket already reported its close.
    pub fn disconnect(&self) {
        let previous = self.worker().take();
        self.inner.state.terminate();
        match previous {
            Some(worker) => {
                let _ = worker.commands.send(Command::Disconnect);
            }
            None => debug!("disconnect() without an active connection"),
        }
    }

    /// Ask the server to push events for `call_id`.
    ///
    /// Dropped with a warning while disconnected. Calls subscribed while
    /// connected are remembered and re-subscribed after a reconnect.
    pub fn subscribe_to_call(&self, call_id: impl Into<CallId>) {
        let call_id = call_id.into();
        let message = ClientMessage::Subscribe {
            call_id: call_id.clone(),
        };
        if !self.send_if_connected(message) {
            warn!(call_id = %call_id, "Cannot subscribe to call, not connected");
            return;
        }
        self.inner.state.track_call(call_id);
    }

    /// Stop re-subscribing to `call_id` after reconnects. Returns `false`
    /// if the call was not tracked. The server has no unsubscribe message,
    /// so the current connection keeps receiving the call's events.
    pub fn forget_call(&self, call_id: &CallId) -> bool {
        self.inner.state.forget_call(call_id)
    }

    /// Calls that will be re-subscribed after a reconnect, oldest first.
    pub fn tracked_calls(&self) -> Vec<CallId> {
        self.inner.state.tracked_calls()
    }

    /// Send an application-level ping stamped with the current time.
    pub fn ping(&self) {
        if !self.send_if_connected(ClientMessage::ping_now()) {
            warn!("Cannot send ping, not connected");
        }
    }

    /// Register a callback for `event`. Keep the returned handle to remove
    /// it with [`off`](Self::off).
    ///
    /// Callbacks are owned by the client, so one that captures a
    /// `RealtimeClient` clone keeps the client and its connection alive
    /// until it is removed. Capture [`downgrade`](Self::downgrade) instead.
    pub fn on<F>(&self, event: impl Into<EventKey>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.registry.on(event, callback)
    }

    /// Remove one registration. Returns `false` if it was already gone.
    pub fn off(&self, subscription: &Subscription) -> bool {
        self.inner.registry.off(subscription)
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.state.status()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.is_connected()
    }

    fn send_if_connected(&self, message: ClientMessage) -> bool {
        if !self.inner.state.is_connected() {
            return false;
        }
        match self.worker().as_ref() {
            Some(worker) => worker.commands.send(Command::Send(message)).is_ok(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReadyState;

    #[test]
    fn new_client_is_idle() {
        let client = RealtimeClient::new(RealtimeConfig::default());
        assert_eq!(
            client.connection_status(),
            ConnectionStatus {
                is_connected: false,
                reconnect_attempts: 0,
                ready_state: None,
            }
        );
    }

    #[test]
    fn weak_handle_does_not_keep_client_alive() {
        let client = RealtimeClient::new(RealtimeConfig::default());
        let weak = client.downgrade();
        let captured = client.downgrade();
        client.on(EventKey::Connected, move |_| {
            if let Some(client) = captured.upgrade() {
                client.ping();
            }
        });

        assert!(weak.upgrade().is_some());
        drop(client);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn strong_capture_keeps_client_alive_until_removed() {
        let client = RealtimeClient::new(RealtimeConfig::default());
        let weak = client.downgrade();
        let captured = client.clone();
        let registration = client.on(EventKey::Connected, move |_| captured.ping());

        let survivor = weak.upgrade().unwrap();
        drop(client);
        assert!(weak.upgrade().is_some());

        assert!(survivor.off(&registration));
        drop(survivor);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn sends_while_disconnected_are_dropped() {
        let client = RealtimeClient::new(RealtimeConfig::default());
        client.subscribe_to_call("c1");
        client.ping();
        assert!(client.tracked_calls().is_empty());
        assert!(!client.is_connected());
    }

    #[test]
    fn connect_outside_runtime_fails() {
        let client = RealtimeClient::new(RealtimeConfig::default());
        assert!(matches!(client.connect(), Err(ClientError::NoRuntime)));
    }

    #[test]
    fn connect_with_bad_origin_fails_before_spawning() {
        let client = RealtimeClient::new(RealtimeConfig {
            origin: "nowhere".into(),
            ..Default::default()
        });
        assert!(matches!(
            client.connect(),
            Err(ClientError::InvalidEndpoint(_))
        ));
        assert_eq!(client.connection_status().ready_state, None);
    }

    #[tokio::test]
    async fn disconnect_is_immediately_visible() {
        let client = RealtimeClient::new(RealtimeConfig {
            endpoint: Some("ws://127.0.0.1:9/never".into()),
            ..Default::default()
        });
        client.connect().unwrap();
        assert_eq!(
            client.connection_status().ready_state,
            Some(ReadyState::Connecting)
        );

        client.disconnect();
        let status = client.connection_status();
        assert!(!status.is_connected);
        assert_eq!(status.ready_state, None);
    }

    #[test]
    fn clones_share_the_registry() {
        let client = RealtimeClient::new(RealtimeConfig::default());
        let other = client.clone();
        let handle = other.on("ringing", |_| {});
        assert!(client.off(&handle));
    }
}
