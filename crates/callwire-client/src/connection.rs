//! Background WebSocket connection worker with backoff reconnect.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::ClientError;
use crate::handler::handle_text_frame;
use crate::protocol::ClientMessage;
use crate::reconnect::{ReconnectDecision, ABNORMAL_CLOSURE, NORMAL_CLOSURE, NO_STATUS_RECEIVED};
use crate::registry::SubscriberRegistry;
use crate::state::SharedState;
use crate::types::{Command, EventKey, ReadyState, RealtimeConfig};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close reason sent by an explicit `disconnect()`.
pub(crate) const CLIENT_DISCONNECT: &str = "Client disconnect";
const CLIENT_RECONNECT: &str = "Client reconnect";

/// Everything one connection worker owns.
pub(crate) struct Worker {
    pub(crate) url: String,
    pub(crate) generation: u64,
    pub(crate) config: RealtimeConfig,
    pub(crate) state: Arc<SharedState>,
    pub(crate) registry: Arc<SubscriberRegistry>,
    pub(crate) commands: mpsc::UnboundedReceiver<Command>,
}

struct CloseInfo {
    code: u16,
    reason: String,
}

impl CloseInfo {
    fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: reason.into(),
        }
    }

    fn from_frame(frame: Option<CloseFrame>) -> Self {
        match frame {
            Some(frame) => Self {
                code: u16::from(frame.code),
                reason: frame.reason.to_string(),
            },
            None => Self {
                code: NO_STATUS_RECEIVED,
                reason: String::new(),
            },
        }
    }
}

enum Connect {
    Open(Box<WsStream>),
    Failed(String),
    /// `disconnect()` arrived before the handshake finished.
    Disconnected,
    Superseded,
}

enum Session {
    Closed(CloseInfo),
    /// Disconnected or superseded by the client handle.
    Stopped,
}

/// Aborts the wrapped task when dropped, so a heartbeat never outlives the
/// connection it belongs to.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Connect, run the session, and reconnect per the policy until closed
/// normally, exhausted, disconnected or superseded.
pub(crate) async fn connection_loop(mut worker: Worker) {
    let generation = worker.generation;

    loop {
        if !worker
            .state
            .update(generation, |s| s.ready_state = Some(ReadyState::Connecting))
        {
            return;
        }
        info!(
            url = %worker.url.split('?').next().unwrap_or(""),
            "Connecting to call event endpoint"
        );

        let close = match open_transport(&mut worker).await {
            Connect::Open(ws) => match run_session(&mut worker, *ws).await {
                Session::Closed(close) => close,
                Session::Stopped => return,
            },
            Connect::Failed(message) => {
                error!(error = %message, "Failed to connect to call event endpoint");
                worker
                    .registry
                    .emit(&EventKey::Error, &json!({ "message": message }));
                CloseInfo::abnormal(message)
            }
            Connect::Disconnected => {
                announce_client_disconnect(&worker.registry);
                return;
            }
            Connect::Superseded => return,
        };

        if !worker.state.update(generation, |s| {
            s.connected = false;
            s.ready_state = Some(ReadyState::Closed);
        }) {
            return;
        }
        info!(code = close.code, reason = %close.reason, "Call event connection closed");
        worker.registry.emit(
            &EventKey::Disconnected,
            &json!({ "code": close.code, "reason": close.reason }),
        );

        let attempts = worker.state.reconnect_attempts();
        match worker.config.reconnect.decide(close.code, attempts) {
            ReconnectDecision::Normal => {
                info!("Connection closed normally, not reconnecting");
                return;
            }
            ReconnectDecision::Exhausted { attempts } => {
                warn!(attempts, "Reconnect attempts exhausted, giving up");
                return;
            }
            ReconnectDecision::Retry { attempt, delay } => {
                if !worker
                    .state
                    .update(generation, |s| s.reconnect_attempts = attempt)
                {
                    return;
                }
                info!(
                    attempt,
                    max_attempts = worker.config.reconnect.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Reconnecting after backoff"
                );
                if !wait_before_reconnect(&mut worker.commands, delay).await {
                    return;
                }
            }
        }
    }
}

/// Open the transport while still honoring commands. Sends queued during
/// the handshake are dropped.
async fn open_transport(worker: &mut Worker) -> Connect {
    let connect = connect_with_timeout(worker.url.clone(), worker.config.connect_timeout);
    tokio::pin!(connect);

    loop {
        tokio::select! {
            result = &mut connect => {
                return match result {
                    Ok(ws) => Connect::Open(Box::new(ws)),
                    Err(e) => Connect::Failed(e.to_string()),
                };
            }
            command = worker.commands.recv() => match command {
                Some(Command::Send(message)) => drop_while_disconnected(&message),
                Some(Command::Disconnect) => {
                    debug!("Connect attempt abandoned by disconnect");
                    return Connect::Disconnected;
                }
                Some(Command::Supersede) | None => {
                    debug!("Connect attempt abandoned");
                    return Connect::Superseded;
                }
            },
        }
    }
}

async fn connect_with_timeout(url: String, limit: Option<Duration>) -> Result<WsStream, ClientError> {
    let connect = tokio_tungstenite::connect_async(url.as_str());
    let (ws, _response) = match limit {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| ClientError::ConnectTimeout(limit))??,
        None => connect.await?,
    };
    Ok(ws)
}

/// Drive one open connection until it closes or the client stops it.
async fn run_session(worker: &mut Worker, ws: WsStream) -> Session {
    let generation = worker.generation;
    let (ws_write, mut ws_read) = ws.split();
    let ws_write = Arc::new(Mutex::new(ws_write));

    let opened = worker.state.update(generation, |s| {
        s.connected = true;
        s.ready_state = Some(ReadyState::Open);
        s.reconnect_attempts = 0;
    });
    if !opened {
        close_transport(&ws_write, CLIENT_RECONNECT).await;
        return Session::Stopped;
    }
    info!("Connected to call event endpoint");

    if worker.config.resubscribe_on_reconnect {
        for call_id in worker.state.tracked_calls() {
            debug!(call_id = %call_id, "Resubscribing to call");
            if let Err(e) = send_message(&ws_write, &ClientMessage::Subscribe { call_id }).await {
                warn!(error = %e, "Failed to resubscribe to call");
            }
        }
    }

    worker.registry.emit(&EventKey::Connected, &Value::Null);

    let _heartbeat = worker
        .config
        .heartbeat_interval
        .map(|period| AbortOnDrop(tokio::spawn(heartbeat_task(Arc::clone(&ws_write), period))));

    loop {
        tokio::select! {
            command = worker.commands.recv() => match command {
                Some(Command::Send(message)) => {
                    if let Err(e) = send_message(&ws_write, &message).await {
                        warn!(error = %e, "Failed to send message");
                        worker
                            .registry
                            .emit(&EventKey::Error, &json!({ "message": e.to_string() }));
                    }
                }
                Some(Command::Disconnect) => {
                    close_transport(&ws_write, CLIENT_DISCONNECT).await;
                    announce_client_disconnect(&worker.registry);
                    return Session::Stopped;
                }
                Some(Command::Supersede) | None => {
                    close_transport(&ws_write, CLIENT_RECONNECT).await;
                    return Session::Stopped;
                }
            },
            frame = ws_read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => handle_text_frame(&text, &worker.registry),
                Some(Ok(WsMessage::Close(frame))) => {
                    worker
                        .state
                        .update(generation, |s| s.ready_state = Some(ReadyState::Closing));
                    return Session::Closed(CloseInfo::from_frame(frame));
                }
                // Pings are answered by tungstenite; binary frames are not part
                // of the protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    worker
                        .registry
                        .emit(&EventKey::Error, &json!({ "message": e.to_string() }));
                    return Session::Closed(CloseInfo::abnormal(e.to_string()));
                }
                None => return Session::Closed(CloseInfo::abnormal("connection dropped")),
            },
        }
    }
}

/// Sleep out the backoff delay. Returns `false` if the client stopped the
/// worker in the meantime.
async fn wait_before_reconnect(
    commands: &mut mpsc::UnboundedReceiver<Command>,
    delay: Duration,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return true,
            command = commands.recv() => match command {
                Some(Command::Send(message)) => drop_while_disconnected(&message),
                Some(Command::Disconnect) | Some(Command::Supersede) | None => {
                    debug!("Pending reconnect cancelled");
                    return false;
                }
            },
        }
    }
}

/// `disconnected` for a socket the client closed itself, whether it was open
/// or still handshaking.
fn announce_client_disconnect(registry: &SubscriberRegistry) {
    info!("Disconnected from call event endpoint");
    registry.emit(
        &EventKey::Disconnected,
        &json!({ "code": NORMAL_CLOSURE, "reason": CLIENT_DISCONNECT }),
    );
}

fn drop_while_disconnected(message: &ClientMessage) {
    warn!(outbound = ?message, "Not connected, dropping outbound message");
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

async fn send_message<S>(ws_write: &Arc<Mutex<S>>, message: &ClientMessage) -> Result<(), ClientError>
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let text = message.to_text()?;
    ws_write.lock().await.send(WsMessage::Text(text.into())).await?;
    Ok(())
}

async fn close_transport<S>(ws_write: &Arc<Mutex<S>>, reason: &str)
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: reason.to_owned().into(),
    };
    if let Err(e) = ws_write.lock().await.send(WsMessage::Close(Some(frame))).await {
        debug!(error = %e, "Close frame not delivered");
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

/// Send a timestamped ping every `period`, starting one period after open.
async fn heartbeat_task<S>(ws_write: Arc<Mutex<S>>, period: Duration)
where
    S: Sink<WsMessage> + Unpin,
    S::Error: Display,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let text = match ClientMessage::ping_now().to_text() {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to encode heartbeat");
                break;
            }
        };
        if let Err(e) = ws_write.lock().await.send(WsMessage::Text(text.into())).await {
            debug!(error = %e, "Heartbeat stopped");
            break;
        }
    }
}
