//! HTTP surface for crmbridge.
//!
//! Exposes the submission endpoint (`POST /api/Bridge2025` by default) and a
//! health check. The handler takes raw body bytes so malformed JSON is
//! reported by the bridge itself rather than by an axum extractor.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;

use crmbridge_core::{Bridge, BridgeResponse};
use crmbridge_shared::{CrmBridgeError, Result, ServerConfig};

/// Shared handler state. Holds only read-only configuration.
#[derive(Clone)]
pub struct AppState {
    bridge: Arc<Bridge>,
}

impl AppState {
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge: Arc::new(bridge),
        }
    }
}

/// Build the router with the submission route mounted at `route`.
pub fn build_router(state: AppState, route: &str) -> Router {
    Router::new()
        .route(route, post(submit))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind `config.bind` and serve until the process is stopped.
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = build_router(state, &config.route);

    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| CrmBridgeError::config(format!("failed to bind {}: {e}", config.bind)))?;
    info!(bind = %config.bind, route = %config.route, "crmbridge listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| CrmBridgeError::Unexpected(format!("server error: {e}")))
}

/// POST handler: validate, orchestrate, answer in plain text.
async fn submit(State(state): State<AppState>, body: Bytes) -> Response {
    let response = state.bridge.handle(&body).await;
    into_http(response)
}

async fn health() -> &'static str {
    "ok"
}

fn into_http(response: BridgeResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        response.body,
    )
        .into_response()
}
