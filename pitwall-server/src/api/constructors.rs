//! Constructor endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use pitwall_common::api::ApiResponse;

use super::correlation::CorrelationId;
use super::params::{envelope, LimitParams, ListParams, Page, SeasonParams};
use crate::db::constructors::{self, Constructor, ConstructorResult, ConstructorStats};
use crate::services::lineup_resolver::ConstructorWithDrivers;
use crate::services::list_constructors_for_season;
use crate::{ApiError, ApiResult, AppState};

/// GET /api/v1/constructors?season&limit&offset
pub async fn list_constructors(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Page<Constructor>>>> {
    let (limit, offset) = params.bounds();

    let page = match params.season {
        Some(season) => {
            let listing = list_constructors_for_season(&state.db, &state.resolver, season).await?;
            Page::from_vec(listing.constructors, limit, offset, Some(listing.source))
        }
        None => {
            let (items, total) = constructors::list_constructors(&state.db, limit, offset).await?;
            Page {
                items,
                total,
                limit,
                offset,
                source: None,
            }
        }
    };

    Ok(envelope(page, correlation_id))
}

/// GET /api/v1/constructors/lineup?season
pub async fn get_constructor_lineup(
    State(state): State<AppState>,
    Query(params): Query<SeasonParams>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<ConstructorWithDrivers>>>> {
    let season = params.season.unwrap_or_else(|| state.current_year());
    let lineup = state
        .resolver
        .get_constructor_lineup_with_drivers(season)
        .await?
        .unwrap_or_default();
    Ok(envelope(lineup, correlation_id))
}

/// GET /api/v1/constructors/{constructorId}
pub async fn get_constructor(
    State(state): State<AppState>,
    Path(constructor_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Constructor>>> {
    let constructor = constructors::find_constructor(&state.db, &constructor_id)
        .await?
        .ok_or_else(|| not_found(&constructor_id))?;
    Ok(envelope(constructor, correlation_id))
}

/// GET /api/v1/constructors/{constructorId}/results?limit
pub async fn get_constructor_results(
    State(state): State<AppState>,
    Path(constructor_id): Path<String>,
    Query(params): Query<LimitParams>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<ConstructorResult>>>> {
    if constructors::find_constructor(&state.db, &constructor_id).await?.is_none() {
        return Err(not_found(&constructor_id));
    }
    let results =
        constructors::constructor_results(&state.db, &constructor_id, params.limit).await?;
    Ok(envelope(results, correlation_id))
}

/// GET /api/v1/constructors/{constructorId}/stats
pub async fn get_constructor_stats(
    State(state): State<AppState>,
    Path(constructor_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<ConstructorStats>>> {
    let stats = constructors::constructor_stats(&state.db, &constructor_id)
        .await?
        .ok_or_else(|| not_found(&constructor_id))?;
    Ok(envelope(stats, correlation_id))
}

fn not_found(constructor_id: &str) -> ApiError {
    ApiError::NotFound(format!("Constructor with id '{}' not found", constructor_id))
}

pub fn constructor_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/constructors", get(list_constructors))
        .route("/api/v1/constructors/lineup", get(get_constructor_lineup))
        .route("/api/v1/constructors/:constructor_id", get(get_constructor))
        .route(
            "/api/v1/constructors/:constructor_id/results",
            get(get_constructor_results),
        )
        .route(
            "/api/v1/constructors/:constructor_id/stats",
            get(get_constructor_stats),
        )
}
