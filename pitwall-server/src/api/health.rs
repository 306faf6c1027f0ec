//! Health and service status endpoints

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use pitwall_common::api::ApiResponse;
use serde::Serialize;

use super::correlation::CorrelationId;
use super::params::envelope;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "ok", or "degraded" after a failed sync
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Last sync failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub status: String,
    pub build: String,
    pub endpoints: Vec<&'static str>,
}

/// GET /health
pub async fn health_check(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> Json<ApiResponse<HealthResponse>> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;
    let last_error = state.last_error.read().await.clone();

    envelope(
        HealthResponse {
            status: if last_error.is_some() { "degraded" } else { "ok" }.to_string(),
            module: "pitwall-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds,
            last_error,
        },
        correlation_id,
    )
}

/// GET / and GET /api/v1
pub async fn service_status(correlation_id: CorrelationId) -> Json<ApiResponse<StatusResponse>> {
    envelope(
        StatusResponse {
            name: "Pitwall F1 API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: "OK".to_string(),
            build: crate::build_id(),
            endpoints: vec![
                "/api/v1/races",
                "/api/v1/drivers",
                "/api/v1/constructors",
                "/api/v1/circuits",
                "/api/v1/admin",
                "/api/v1/sync",
                "/health",
            ],
        },
        correlation_id,
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(service_status))
        .route("/api/v1", get(service_status))
}
