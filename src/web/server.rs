//! The subscriber-facing entry point: one landing page, one upgrade route,
//! static assets for everything else.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::path::PathBuf;
use tokio::sync::watch;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::web::registry::SubscriberRegistry;
use crate::web::websocket;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: SubscriberRegistry,
    pub static_dir: PathBuf,
    /// Fires on shutdown; subscriber connections close themselves so the
    /// drain below does not wait on long-lived sockets.
    pub shutdown: watch::Receiver<bool>,
}

/// Entry point server instance
pub struct WebServer {
    port: u16,
    static_dir: PathBuf,
    registry: SubscriberRegistry,
}

impl WebServer {
    pub fn new(port: u16, static_dir: PathBuf, registry: SubscriberRegistry) -> Self {
        Self {
            port,
            static_dir,
            registry,
        }
    }

    /// Run the server until the shutdown signal fires, then drain.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let state = AppState {
            registry: self.registry,
            static_dir: self.static_dir.clone(),
            shutdown: shutdown.clone(),
        };
        let app = create_router(state);

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        tracing::info!("app running on {}", addr);
        tracing::info!("serving static assets from {}", self.static_dir.display());

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .context("Server error")?;

        Ok(())
    }
}

/// Build the router: landing page at `/`, WebSocket upgrades at `/ws`, and
/// everything else resolved against the static root. No other routes.
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    Router::new()
        .route("/", get(serve_index))
        .route("/ws", get(websocket::ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(TraceLayer::new_for_http())
}

/// Serve the landing page
async fn serve_index(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::fs::read_to_string(state.static_dir.join("index.html")).await {
        Ok(content) => Html(content).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Error: index.html not found</h1>".to_string()),
        )
            .into_response(),
    }
}
