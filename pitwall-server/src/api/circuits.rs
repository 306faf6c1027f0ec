//! Circuit endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use pitwall_common::api::ApiResponse;

use super::correlation::CorrelationId;
use super::params::envelope;
use crate::db::circuits::{self, Circuit};
use crate::db::races::{list_races_at_circuit, Race};
use crate::{ApiError, ApiResult, AppState};

/// GET /api/v1/circuits
pub async fn list_circuits(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<Circuit>>>> {
    Ok(envelope(circuits::list_circuits(&state.db).await?, correlation_id))
}

/// GET /api/v1/circuits/{circuitId}
pub async fn get_circuit(
    State(state): State<AppState>,
    Path(circuit_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Circuit>>> {
    let circuit = require_circuit(&state, &circuit_id).await?;
    Ok(envelope(circuit, correlation_id))
}

/// GET /api/v1/circuits/{circuitId}/races
pub async fn get_circuit_races(
    State(state): State<AppState>,
    Path(circuit_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<Race>>>> {
    require_circuit(&state, &circuit_id).await?;
    let races = list_races_at_circuit(&state.db, &circuit_id).await?;
    Ok(envelope(races, correlation_id))
}

async fn require_circuit(state: &AppState, circuit_id: &str) -> ApiResult<Circuit> {
    circuits::find_circuit(&state.db, circuit_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Circuit with id '{}' not found", circuit_id)))
}

pub fn circuit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/circuits", get(list_circuits))
        .route("/api/v1/circuits/:circuit_id", get(get_circuit))
        .route("/api/v1/circuits/:circuit_id/races", get(get_circuit_races))
}
