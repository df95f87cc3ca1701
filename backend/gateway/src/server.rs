//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use oracare_core::AnalysisClient;

use crate::{analyze, health};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub analyzer: Arc<dyn AnalysisClient>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(analyzer: Arc<dyn AnalysisClient>) -> Self {
        Self {
            analyzer,
            started_at: Instant::now(),
        }
    }
}

/// Build the gateway router. Browsers call this cross-origin, so CORS is open.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/api/analyze",
            post(analyze::analyze).fallback(analyze::method_not_allowed),
        )
        .route("/api/health", get(health::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Starts the Axum HTTP server and runs until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    info!("Gateway HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
