//! Per-connection WebSocket handling.
//!
//! Each accepted socket gets a registry entry and an unbounded outbound
//! queue; a forwarding task drains the queue onto the wire while the receive
//! side parses channel-join requests.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::watch;

use crate::web::broadcast::{Broadcaster, ClientEvent};
use crate::web::registry::SubscriberRegistry;
use crate::web::server::AppState;

/// Protocol-level ping cadence, keeps idle connections alive through proxies.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Upgrade handler for `GET /ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.registry, state.shutdown))
}

async fn handle_socket(
    socket: WebSocket,
    registry: SubscriberRegistry,
    mut shutdown: watch::Receiver<bool>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    // Forward queued frames to the wire until either side goes away
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Queue the welcome unicast before registering, so it always precedes
    // the first scores tick on this connection.
    let _ = tx.send(Message::Text(Broadcaster::welcome_payload()));
    let id = registry.connect(tx.clone()).await;
    tracing::info!(subscriber = %id, "subscriber connected");

    let heartbeat_tx = tx.clone();
    let mut heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.tick().await; // first tick is immediate, skip it
        loop {
            interval.tick().await;
            if heartbeat_tx.send(Message::Ping(Vec::new())).is_err() {
                break;
            }
        }
    });

    let recv_registry = registry.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::Subscribe { channel }) => {
                        if recv_registry.join(id, &channel).await {
                            tracing::debug!(subscriber = %id, channel = %channel, "joined channel");
                        }
                    },
                    Err(e) => {
                        tracing::warn!(subscriber = %id, error = %e, "unparseable client event");
                    },
                },
                Message::Close(_) => break,
                _ => {},
            }
        }
    });

    // Whichever task finishes first takes the connection down; the shutdown
    // signal closes the socket so the server drain is not held open by it
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut heartbeat_task) => {
            send_task.abort();
            recv_task.abort();
        }
        _ = shutdown.changed() => {
            send_task.abort();
            recv_task.abort();
            heartbeat_task.abort();
        }
    }

    registry.disconnect(id).await;
    tracing::info!(subscriber = %id, "subscriber disconnected");
}
