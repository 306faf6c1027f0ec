//! Sync trigger endpoints
//!
//! Requests run the sync inline and answer with its summary. Failures are also recorded
//! as the health endpoint's `last_error`.

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use pitwall_common::api::ApiResponse;
use serde::Deserialize;

use super::correlation::CorrelationId;
use super::params::envelope;
use crate::services::lineup_sync::LineupSyncSummary;
use crate::services::sync_orchestrator::RaceResultsSummary;
use crate::services::{SeasonSyncReport, SyncSummary};
use crate::{ApiError, ApiResult, AppState};

/// Body of the season-scoped sync requests; season defaults to the current year
#[derive(Debug, Default, Deserialize)]
pub struct SeasonRequest {
    pub season: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ResultsRequest {
    pub season: i32,
    pub round: i32,
}

#[derive(Debug, Deserialize)]
pub struct LineupRequest {
    pub season: i32,
}

/// Season from an optional JSON body
///
/// An empty body means the current year; a body that is present but not a valid
/// `SeasonRequest` is a 400.
fn requested_season(state: &AppState, body: &Bytes) -> ApiResult<i32> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(state.current_year());
    }
    let request: SeasonRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid sync request body: {}", e)))?;
    Ok(request.season.unwrap_or_else(|| state.current_year()))
}

/// POST /api/v1/sync/season
pub async fn sync_season(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<SeasonSyncReport>>> {
    let season = requested_season(&state, &body)?;
    let report = state.orchestrator.sync_season(season).await;
    if let Some(message) = report.error_message() {
        state.record_error(format!("season {} sync: {}", season, message)).await;
    }
    Ok(envelope(report, correlation_id))
}

/// POST /api/v1/sync/drivers
pub async fn sync_drivers(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<SyncSummary>>> {
    let season = requested_season(&state, &body)?;
    let summary = recorded(&state, state.orchestrator.sync_drivers_for_season(season).await).await?;
    Ok(envelope(summary, correlation_id))
}

/// POST /api/v1/sync/constructors
pub async fn sync_constructors(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<SyncSummary>>> {
    let season = requested_season(&state, &body)?;
    let summary =
        recorded(&state, state.orchestrator.sync_constructors_for_season(season).await).await?;
    Ok(envelope(summary, correlation_id))
}

/// POST /api/v1/sync/results
pub async fn sync_results(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<ResultsRequest>,
) -> ApiResult<Json<ApiResponse<RaceResultsSummary>>> {
    let summary = recorded(
        &state,
        state
            .orchestrator
            .sync_race_results(request.season, request.round)
            .await,
    )
    .await?;
    Ok(envelope(summary, correlation_id))
}

/// POST /api/v1/sync/lineups
pub async fn sync_lineups(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<LineupRequest>,
) -> ApiResult<Json<ApiResponse<LineupSyncSummary>>> {
    let summary = recorded(&state, state.lineup_sync.sync_lineups(request.season).await).await?;
    Ok(envelope(summary, correlation_id))
}

/// Store a failure as the last error before handing it back
async fn recorded<T, E>(state: &AppState, result: Result<T, E>) -> ApiResult<T>
where
    E: std::fmt::Display + Into<ApiError>,
{
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/sync/season", post(sync_season))
        .route("/api/v1/sync/drivers", post(sync_drivers))
        .route("/api/v1/sync/constructors", post(sync_constructors))
        .route("/api/v1/sync/results", post(sync_results))
        .route("/api/v1/sync/lineups", post(sync_lineups))
}
