//! Race endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use pitwall_common::api::ApiResponse;

use super::correlation::CorrelationId;
use super::params::{envelope, ListParams, Page};
use crate::db::races::{self, Race};
use crate::db::results::{self, QualifyingResultRow, RaceResultRow};
use crate::db::MAX_PAGE_LIMIT;
use crate::{ApiError, ApiResult, AppState};

/// GET /api/v1/races?season&limit&offset
pub async fn list_races(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Page<Race>>>> {
    let (limit, offset) = params.bounds();
    let (items, total) = races::list_races(&state.db, params.season, limit, offset).await?;

    Ok(envelope(
        Page {
            items,
            total,
            limit,
            offset,
            source: None,
        },
        correlation_id,
    ))
}

/// GET /api/v1/races/current/schedule
pub async fn current_schedule(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<Race>>>> {
    let season = state.current_year();
    let (items, _) = races::list_races(&state.db, Some(season), MAX_PAGE_LIMIT, 0).await?;
    Ok(envelope(items, correlation_id))
}

/// GET /api/v1/races/{id}
pub async fn get_race(
    State(state): State<AppState>,
    Path(race_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Race>>> {
    let race = require_race(&state, &race_id).await?;
    Ok(envelope(race, correlation_id))
}

/// GET /api/v1/races/{id}/results
pub async fn get_race_results(
    State(state): State<AppState>,
    Path(race_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<RaceResultRow>>>> {
    require_race(&state, &race_id).await?;
    let rows = results::race_results(&state.db, &race_id).await?;
    Ok(envelope(rows, correlation_id))
}

/// GET /api/v1/races/{id}/qualifying
pub async fn get_qualifying_results(
    State(state): State<AppState>,
    Path(race_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<QualifyingResultRow>>>> {
    require_race(&state, &race_id).await?;
    let rows = results::qualifying_results(&state.db, &race_id).await?;
    Ok(envelope(rows, correlation_id))
}

async fn require_race(state: &AppState, race_id: &str) -> ApiResult<Race> {
    races::find_race(&state.db, race_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Race with id '{}' not found", race_id)))
}

pub fn race_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/races", get(list_races))
        .route("/api/v1/races/current/schedule", get(current_schedule))
        .route("/api/v1/races/:id", get(get_race))
        .route("/api/v1/races/:id/results", get(get_race_results))
        .route("/api/v1/races/:id/qualifying", get(get_qualifying_results))
}
