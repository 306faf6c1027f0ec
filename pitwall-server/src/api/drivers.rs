//! Driver endpoints
//!
//! `?season` switches the listing to the season fallback chain; the response's `source`
//! says which step answered.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use pitwall_common::api::ApiResponse;

use super::correlation::CorrelationId;
use super::params::{envelope, LimitParams, ListParams, Page, SeasonParams};
use crate::db::drivers::{self, Driver, DriverResult, DriverStats};
use crate::services::lineup_resolver::DriverLineupEntry;
use crate::services::list_drivers_for_season;
use crate::{ApiError, ApiResult, AppState};

/// GET /api/v1/drivers?season&limit&offset&active
pub async fn list_drivers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Page<Driver>>>> {
    let (limit, offset) = params.bounds();

    let page = match params.season {
        Some(season) => {
            let listing =
                list_drivers_for_season(&state.db, &state.resolver, season, state.current_year())
                    .await?;
            let drivers = match params.active {
                Some(active) => listing
                    .drivers
                    .into_iter()
                    .filter(|d| d.is_active == active)
                    .collect(),
                None => listing.drivers,
            };
            Page::from_vec(drivers, limit, offset, Some(listing.source))
        }
        None => {
            let (items, total) = drivers::list_drivers(&state.db, params.active, limit, offset).await?;
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

/// GET /api/v1/drivers/lineup?season
///
/// An empty list when the season has no lineup document.
pub async fn get_driver_lineup(
    State(state): State<AppState>,
    Query(params): Query<SeasonParams>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<DriverLineupEntry>>>> {
    let season = params.season.unwrap_or_else(|| state.current_year());
    let lineup = state.resolver.get_driver_lineup(season).await?.unwrap_or_default();
    Ok(envelope(lineup, correlation_id))
}

/// GET /api/v1/drivers/{driverId}
pub async fn get_driver(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Driver>>> {
    let driver = require_driver(&state, &driver_id).await?;
    Ok(envelope(driver, correlation_id))
}

/// GET /api/v1/drivers/{driverId}/results?limit
pub async fn get_driver_results(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Query(params): Query<LimitParams>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<Vec<DriverResult>>>> {
    require_driver(&state, &driver_id).await?;
    let results = drivers::driver_results(&state.db, &driver_id, params.limit).await?;
    Ok(envelope(results, correlation_id))
}

/// GET /api/v1/drivers/{driverId}/stats
pub async fn get_driver_stats(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    correlation_id: CorrelationId,
) -> ApiResult<Json<ApiResponse<DriverStats>>> {
    let stats = drivers::driver_stats(&state.db, &driver_id)
        .await?
        .ok_or_else(|| not_found(&driver_id))?;
    Ok(envelope(stats, correlation_id))
}

async fn require_driver(state: &AppState, driver_id: &str) -> ApiResult<Driver> {
    drivers::find_driver(&state.db, driver_id)
        .await?
        .ok_or_else(|| not_found(driver_id))
}

fn not_found(driver_id: &str) -> ApiError {
    ApiError::NotFound(format!("Driver with id '{}' not found", driver_id))
}

pub fn driver_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/drivers", get(list_drivers))
        .route("/api/v1/drivers/lineup", get(get_driver_lineup))
        .route("/api/v1/drivers/:driver_id", get(get_driver))
        .route("/api/v1/drivers/:driver_id/results", get(get_driver_results))
        .route("/api/v1/drivers/:driver_id/stats", get(get_driver_stats))
}
