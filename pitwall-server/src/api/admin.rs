//! Admin edit endpoints
//!
//! Create returns 409 when the natural key already exists; update applies only the fields
//! present in the body. Validation failures (permanent number outside 1-99, negative
//! championship counts, missing names) return 400.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use pitwall_common::api::ApiResponse;
use serde::Deserialize;
use tracing::info;

use super::correlation::CorrelationId;
use super::params::envelope;
use crate::db::constructors::{self, Constructor, ConstructorPatch};
use crate::db::drivers::{self, Driver, DriverPatch};
use crate::db::{upsert_constructor, upsert_driver};
use crate::sources::{ConstructorRecord, DriverRecord};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriverRequest {
    pub driver_id: String,
    pub code: Option<String>,
    pub forename: String,
    pub surname: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub url: Option<String>,
    pub permanent_number: Option<i64>,
    pub current_team: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub driver_championships: i64,
    #[serde(default)]
    pub constructor_championships: i64,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriverRequest {
    pub driver_id: String,
    #[serde(flatten)]
    pub patch: DriverPatch,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTeamRequest {
    /// `null` clears the team
    pub current_team: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConstructorRequest {
    pub constructor_id: String,
    pub name: String,
    pub nationality: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConstructorRequest {
    pub constructor_id: String,
    #[serde(flatten)]
    pub patch: ConstructorPatch,
}

/// POST /api/v1/admin/drivers
pub async fn create_driver(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<CreateDriverRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Driver>>)> {
    let driver_id = request.driver_id.trim().to_string();
    if drivers::find_driver(&state.db, &driver_id).await?.is_some() {
        return Err(ApiError::Conflict(format!(
            "Driver with id '{}' already exists",
            driver_id
        )));
    }

    let record = DriverRecord {
        driver_id: driver_id.clone(),
        code: request.code,
        forename: request.forename,
        surname: request.surname,
        date_of_birth: request.date_of_birth,
        nationality: request.nationality,
        url: request.url,
        permanent_number: request.permanent_number,
        current_team: request
            .current_team
            .map(|team| state.overrides.team_display_name(&team)),
        is_active: Some(request.is_active),
        driver_championships: Some(request.driver_championships),
        constructor_championships: Some(request.constructor_championships),
    };
    upsert_driver(&state.db, &record).await?;
    info!(driver_id = %driver_id, "Driver created");

    let driver = require_driver(&state, &driver_id).await?;
    Ok((StatusCode::CREATED, envelope(driver, correlation_id)))
}

/// PUT /api/v1/admin/drivers
pub async fn update_driver(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<UpdateDriverRequest>,
) -> ApiResult<Json<ApiResponse<Driver>>> {
    let mut patch = request.patch;
    patch.current_team = patch
        .current_team
        .map(|team| state.overrides.team_display_name(&team));

    if !drivers::update_driver(&state.db, &request.driver_id, &patch).await? {
        return Err(driver_not_found(&request.driver_id));
    }
    info!(driver_id = %request.driver_id, "Driver updated");

    let driver = require_driver(&state, &request.driver_id).await?;
    Ok(envelope(driver, correlation_id))
}

/// PATCH /api/v1/admin/drivers/{driverId}/team
pub async fn set_driver_team(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    correlation_id: CorrelationId,
    Json(request): Json<SetTeamRequest>,
) -> ApiResult<Json<ApiResponse<Driver>>> {
    let team = request
        .current_team
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| state.overrides.team_display_name(t));

    if !drivers::set_driver_team(&state.db, &driver_id, team.as_deref()).await? {
        return Err(driver_not_found(&driver_id));
    }
    info!(driver_id = %driver_id, team = ?team, "Driver team set");

    let driver = require_driver(&state, &driver_id).await?;
    Ok(envelope(driver, correlation_id))
}

/// POST /api/v1/admin/constructors
pub async fn create_constructor(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<CreateConstructorRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Constructor>>)> {
    let constructor_id = request.constructor_id.trim().to_string();
    if constructors::find_constructor(&state.db, &constructor_id)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "Constructor with id '{}' already exists",
            constructor_id
        )));
    }

    let record = ConstructorRecord {
        constructor_id: constructor_id.clone(),
        name: request.name,
        nationality: request.nationality,
        url: request.url,
    };
    upsert_constructor(&state.db, &record).await?;
    info!(constructor_id = %constructor_id, "Constructor created");

    let constructor = require_constructor(&state, &constructor_id).await?;
    Ok((StatusCode::CREATED, envelope(constructor, correlation_id)))
}

/// PUT /api/v1/admin/constructors
pub async fn update_constructor(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    Json(request): Json<UpdateConstructorRequest>,
) -> ApiResult<Json<ApiResponse<Constructor>>> {
    if !constructors::update_constructor(&state.db, &request.constructor_id, &request.patch).await? {
        return Err(constructor_not_found(&request.constructor_id));
    }
    info!(constructor_id = %request.constructor_id, "Constructor updated");

    let constructor = require_constructor(&state, &request.constructor_id).await?;
    Ok(envelope(constructor, correlation_id))
}

async fn require_driver(state: &AppState, driver_id: &str) -> ApiResult<Driver> {
    drivers::find_driver(&state.db, driver_id)
        .await?
        .ok_or_else(|| driver_not_found(driver_id))
}

async fn require_constructor(state: &AppState, constructor_id: &str) -> ApiResult<Constructor> {
    constructors::find_constructor(&state.db, constructor_id)
        .await?
        .ok_or_else(|| constructor_not_found(constructor_id))
}

fn driver_not_found(driver_id: &str) -> ApiError {
    ApiError::NotFound(format!("Driver with id '{}' not found", driver_id))
}

fn constructor_not_found(constructor_id: &str) -> ApiError {
    ApiError::NotFound(format!("Constructor with id '{}' not found", constructor_id))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/admin/drivers",
            post(create_driver).put(update_driver),
        )
        .route("/api/v1/admin/drivers/:driver_id/team", patch(set_driver_team))
        .route(
            "/api/v1/admin/constructors",
            post(create_constructor).put(update_constructor),
        )
}
