//! Liveness endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// RFC 3339 time the check was answered.
    pub timestamp: String,
    pub port: u16,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        port: state.port,
    })
}
