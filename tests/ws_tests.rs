//! End-to-end tests against an in-process server on an ephemeral port:
//! the WebSocket subscriber flow and the HTTP surface.

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tallycast::tally::VoteTally;
use tallycast::web::broadcast::Broadcaster;
use tallycast::web::registry::SubscriberRegistry;
use tallycast::web::server::{create_router, AppState};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bind the app on an ephemeral port and serve it in the background. The
/// returned sender must stay alive for as long as the server should run.
async fn spawn_server(
    static_dir: &Path,
) -> Result<(SocketAddr, SubscriberRegistry, watch::Sender<bool>)> {
    let registry = SubscriberRegistry::new();
    let (shutdown_tx, shutdown) = watch::channel(false);
    let state = AppState {
        registry: registry.clone(),
        static_dir: static_dir.to_path_buf(),
        shutdown,
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Ok((addr, registry, shutdown_tx))
}

/// Next text frame, skipping protocol-level frames like pings.
async fn next_text(ws: &mut WsClient) -> Result<String> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
        if let Message::Text(text) = frame {
            return Ok(text);
        }
    }
}

/// Poll `cond` until it holds or a few seconds pass.
async fn wait_until<F, Fut>(mut cond: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..150 {
        if cond().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_welcome_subscribe_and_global_broadcast() -> Result<()> {
    // Scenario: a subscriber connects, is welcomed immediately, joins a
    // channel, and still receives the global score feed.
    let static_dir = tempfile::tempdir()?;
    let (addr, registry, _shutdown_tx) = spawn_server(static_dir.path()).await?;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await?;

    let welcome: Value = serde_json::from_str(&next_text(&mut ws).await?)?;
    assert_eq!(welcome["event"], "message");
    assert_eq!(welcome["data"]["text"], "Welcome!");

    ws.send(Message::Text(
        json!({"event": "subscribe", "data": {"channel": "room1"}}).to_string(),
    ))
    .await?;

    let joined = wait_until(|| {
        let registry = registry.clone();
        async move { registry.channel_members("room1").await.len() == 1 }
    })
    .await;
    assert!(joined, "subscribe request never reached the registry");

    let tally = VoteTally::from_rows(
        &["a".to_string(), "b".to_string()],
        vec![("a".to_string(), 7), ("b".to_string(), 3)],
    );
    Broadcaster::new(registry.clone())
        .broadcast_scores(&tally)
        .await?;

    let scores: Value = serde_json::from_str(&next_text(&mut ws).await?)?;
    assert_eq!(scores["event"], "scores");
    assert_eq!(scores["data"], json!({"a": 7, "b": 3}));

    Ok(())
}

#[tokio::test]
async fn test_malformed_client_event_does_not_drop_connection() -> Result<()> {
    let static_dir = tempfile::tempdir()?;
    let (addr, registry, _shutdown_tx) = spawn_server(static_dir.path()).await?;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await?;
    next_text(&mut ws).await?; // welcome

    ws.send(Message::Text("not json".to_string())).await?;

    // Still connected: a broadcast arrives after the garbage frame
    let tally = VoteTally::from_rows(&[], vec![("a".to_string(), 1)]);
    Broadcaster::new(registry.clone())
        .broadcast_scores(&tally)
        .await?;

    let scores: Value = serde_json::from_str(&next_text(&mut ws).await?)?;
    assert_eq!(scores["event"], "scores");

    Ok(())
}

#[tokio::test]
async fn test_disconnect_removes_subscriber() -> Result<()> {
    let static_dir = tempfile::tempdir()?;
    let (addr, registry, _shutdown_tx) = spawn_server(static_dir.path()).await?;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await?;
    next_text(&mut ws).await?; // welcome

    assert_eq!(registry.subscriber_count().await, 1);

    ws.close(None).await?;

    let removed = wait_until(|| {
        let registry = registry.clone();
        async move { registry.subscriber_count().await == 0 }
    })
    .await;
    assert!(removed, "disconnect never cleaned up the registry entry");

    Ok(())
}

#[tokio::test]
async fn test_landing_page_and_static_assets() -> Result<()> {
    let static_dir = tempfile::tempdir()?;
    std::fs::write(
        static_dir.path().join("index.html"),
        "<h1>Live Results</h1>",
    )?;
    std::fs::write(static_dir.path().join("app.css"), "body {}")?;

    let (addr, _registry, _shutdown_tx) = spawn_server(static_dir.path()).await?;

    let index = reqwest::get(format!("http://{}/", addr)).await?;
    assert!(index.status().is_success());
    assert!(index.text().await?.contains("Live Results"));

    let asset = reqwest::get(format!("http://{}/app.css", addr)).await?;
    assert!(asset.status().is_success());

    let missing = reqwest::get(format!("http://{}/missing.css", addr)).await?;
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_shutdown_closes_subscriber_connections() -> Result<()> {
    let static_dir = tempfile::tempdir()?;
    let (addr, registry, shutdown_tx) = spawn_server(static_dir.path()).await?;

    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await?;
    next_text(&mut ws).await?; // welcome

    shutdown_tx.send(true)?;

    // The server side tears the connection down; the client observes EOF or
    // a close frame shortly after.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => break,
                Some(Ok(_)) => {},
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "connection stayed open after shutdown");

    let removed = wait_until(|| {
        let registry = registry.clone();
        async move { registry.subscriber_count().await == 0 }
    })
    .await;
    assert!(removed, "shutdown did not clean up the registry entry");

    Ok(())
}
