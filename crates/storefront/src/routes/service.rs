//! Service endpoints: banner, status, info and health checks.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

/// Plain-text banner at `/`.
pub async fn banner() -> &'static str {
    "Hello World"
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Always `{"status": "OK"}` while the process is serving.
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse { status: "OK" })
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub port: u16,
    /// Seconds since startup.
    pub uptime: u64,
    pub environment: String,
}

/// Server information.
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        message: "Cornerstore API Server",
        version: env!("CARGO_PKG_VERSION"),
        port: state.config().port,
        uptime: state.uptime_secs(),
        environment: state.config().environment.clone(),
    })
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        // In-memory stores are always ready.
        return StatusCode::OK;
    };

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
