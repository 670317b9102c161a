//! `callwire serve`: a development call event endpoint.
//!
//! Greets every connection, acknowledges `subscribe` and `ping`, and walks
//! each subscribed call through `ringing`, `answered` and `ended`, one step
//! per tick.

mod connection;
mod session;

use std::time::Duration;

use callwire_common::Result;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use crate::cli::ServeArgs;

pub use connection::handle_connection;
pub use session::PeerStore;

pub async fn serve(args: ServeArgs) -> Result<()> {
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("callwire dev endpoint listening on ws://{}/api/jive-webrtc/ws", addr);

    run(listener, PeerStore::new(), Duration::from_secs(args.interval_secs.max(1))).await;
    Ok(())
}

/// Accept connections on `listener` forever, ticking call lifecycles every
/// `interval`.
pub async fn run(listener: TcpListener, store: PeerStore, interval: Duration) {
    let ticker_store = store.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let frames = ticker_store.tick().await;
            let peers = ticker_store.count().await;
            tracing::debug!(peers, frames = frames.len(), "Lifecycle tick");
            for (tx, message) in frames {
                match message.to_text() {
                    Ok(text) => {
                        let _ = tx.send(text).await;
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to encode call event"),
                }
            }
        }
    });

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let store = store.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, store).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
