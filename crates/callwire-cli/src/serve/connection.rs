//! Per-connection handler for the development endpoint.

use std::net::SocketAddr;

use callwire_client::{ClientMessage, ServerMessage};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::session::PeerStore;

type ServerSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Handle a single WebSocket connection.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, store: PeerStore) {
    let (mut sink, mut stream) = ws.split();

    // 1. Register so the lifecycle ticker can reach us.
    let (tx, mut rx) = mpsc::channel::<String>(256);
    store.register(addr, tx).await;
    tracing::info!(peer = %addr, "Client connected");

    // 2. Greet.
    let greeting = ServerMessage::Connection {
        message: Some("Connected to call event server".into()),
    };
    if send_message(&mut sink, &greeting).await.is_err() {
        store.unregister(addr).await;
        return;
    }

    // 3. Serve until the client leaves.
    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let reply = respond(&text, addr, &store).await;
                        if send_message(&mut sink, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    // 4. Cleanup.
    tracing::info!(peer = %addr, "Client disconnected");
    store.unregister(addr).await;
}

/// Build the reply to one client frame.
pub(crate) async fn respond(text: &str, addr: SocketAddr, store: &PeerStore) -> ServerMessage {
    match ClientMessage::from_text(text) {
        Ok(ClientMessage::Subscribe { call_id }) => {
            if store.subscribe(addr, call_id.clone()).await {
                tracing::info!(peer = %addr, call_id = %call_id, "Call subscribed");
            }
            ServerMessage::Subscribed {
                call_id: Some(call_id),
            }
        }
        Ok(ClientMessage::Ping { timestamp }) => ServerMessage::Pong {
            timestamp: Some(timestamp),
        },
        Err(e) => {
            tracing::warn!(peer = %addr, error = %e, "Invalid client message");
            ServerMessage::Error {
                message: Some(format!("invalid message: {e}")),
            }
        }
    }
}

/// Send a server message as a JSON text frame.
async fn send_message(
    sink: &mut ServerSink,
    message: &ServerMessage,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    match message.to_text() {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode server message");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callwire_client::CallId;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 4000))
    }

    #[tokio::test]
    async fn subscribe_is_acknowledged_and_tracked() {
        let store = PeerStore::new();
        let (tx, _rx) = mpsc::channel(8);
        store.register(peer(), tx).await;

        let reply = respond(r#"{"type":"subscribe","callId":"c1"}"#, peer(), &store).await;
        assert_eq!(
            reply,
            ServerMessage::Subscribed {
                call_id: Some(CallId::from("c1"))
            }
        );
        assert_eq!(store.tick().await.len(), 1);
    }

    #[tokio::test]
    async fn ping_is_answered_with_its_timestamp() {
        let store = PeerStore::new();
        let reply = respond(
            r#"{"type":"ping","timestamp":"2026-10-16T09:00:00.000Z"}"#,
            peer(),
            &store,
        )
        .await;
        assert_eq!(
            reply,
            ServerMessage::Pong {
                timestamp: Some("2026-10-16T09:00:00.000Z".into())
            }
        );
    }

    #[tokio::test]
    async fn unknown_or_malformed_messages_get_an_error() {
        let store = PeerStore::new();
        for text in [r#"{"type":"unsubscribe","callId":"c1"}"#, "garbage"] {
            let reply = respond(text, peer(), &store).await;
            assert!(matches!(reply, ServerMessage::Error { message: Some(_) }));
        }
    }
}
