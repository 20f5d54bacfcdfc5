//! Keep-alive HTTP responder.
//!
//! Hosting platforms that put idle web services to sleep poll `/` to keep
//! the process awake; `/health` gives a machine-readable answer.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Body served on `/`.
pub const BANNER: &str = "God's Eye Bot is running - POWERED BY PH03NIX";

#[derive(Clone)]
struct KeepAliveState {
    started_at: Instant,
}

/// Response body for `/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// GET / - plain-text banner.
async fn banner() -> &'static str {
    BANNER
}

/// GET /health - liveness and uptime.
async fn health(State(state): State<KeepAliveState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// Creates the keep-alive router.
///
/// The router carries no state type, so it can be merged with the webhook
/// router.
pub fn create_router(started_at: Instant) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(KeepAliveState { started_at })
}

/// Serves the keep-alive router on `0.0.0.0:port` until the task is dropped.
pub async fn serve(port: u16, started_at: Instant) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Keep-alive server listening");
    axum::serve(listener, create_router(started_at)).await
}
