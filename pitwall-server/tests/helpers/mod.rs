//! Shared fixtures for pitwall-server integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use pitwall_common::IdentifierOverrides;
use pitwall_server::services::lineup_sync::{
    LineupServiceResponse, ServiceConstructorEntry, ServiceDriverEntry,
};
use pitwall_server::services::{LineupProvider, LineupServiceError};
use pitwall_server::sources::{
    CircuitRecord, ConstructorRecord, DataSource, DriverRecord, QualifyingRecord, RaceRecord,
    ResultRecord, SourceError,
};
use pitwall_server::AppState;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

/// Year the test state treats as "now"
pub const CURRENT_YEAR: i32 = 2025;

/// In-memory adapter; every fetch fails when `fail` is set
#[derive(Default)]
pub struct FakeSource {
    pub name: &'static str,
    pub fail: bool,
    pub drivers: Vec<DriverRecord>,
    pub constructors: Vec<ConstructorRecord>,
    pub races: Vec<RaceRecord>,
    pub results: Vec<ResultRecord>,
    pub qualifying: Vec<QualifyingRecord>,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(&self, data: &[T]) -> Result<Vec<T>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(SourceError::Unavailable(
                self.name.to_string(),
                format!("{} is down", self.name),
            ))
        } else {
            Ok(data.to_vec())
        }
    }
}

#[async_trait]
impl DataSource for FakeSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_races(&self, season: i32) -> Result<Vec<RaceRecord>, SourceError> {
        let races: Vec<RaceRecord> = self
            .races
            .iter()
            .filter(|r| r.season == season)
            .cloned()
            .collect();
        self.answer(&races)
    }

    async fn fetch_drivers(&self, _season: i32) -> Result<Vec<DriverRecord>, SourceError> {
        self.answer(&self.drivers)
    }

    async fn fetch_constructors(&self, _season: i32) -> Result<Vec<ConstructorRecord>, SourceError> {
        self.answer(&self.constructors)
    }

    async fn fetch_circuits(&self) -> Result<Vec<CircuitRecord>, SourceError> {
        let circuits: Vec<CircuitRecord> = self.races.iter().map(|r| r.circuit.clone()).collect();
        self.answer(&circuits)
    }

    async fn fetch_race_results(
        &self,
        _season: i32,
        _round: i32,
    ) -> Result<Vec<ResultRecord>, SourceError> {
        self.answer(&self.results)
    }

    async fn fetch_qualifying_results(
        &self,
        _season: i32,
        _round: i32,
    ) -> Result<Vec<QualifyingRecord>, SourceError> {
        self.answer(&self.qualifying)
    }
}

/// Lineup service stand-in
#[derive(Default)]
pub struct FakeLineupProvider {
    pub response: LineupServiceResponse,
    /// Status returned instead of `response`
    pub status: Option<u16>,
}

#[async_trait]
impl LineupProvider for FakeLineupProvider {
    async fn fetch_lineups(&self, _season: i32) -> Result<LineupServiceResponse, LineupServiceError> {
        match self.status {
            Some(code) => Err(LineupServiceError::Status(code, "scripted failure".to_string())),
            None => Ok(self.response.clone()),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: SqlitePool,
}

pub async fn test_app(
    roster: Arc<FakeSource>,
    historical: Arc<FakeSource>,
    lineups: FakeLineupProvider,
) -> TestApp {
    let pool = pitwall_common::db::init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    let state = AppState::new(
        pool.clone(),
        roster,
        historical,
        Arc::new(lineups),
        Arc::new(IdentifierOverrides::with_defaults()),
    )
    .with_current_year(CURRENT_YEAR);

    TestApp {
        router: pitwall_server::build_router(state.clone()),
        state,
        pool,
    }
}

/// App whose upstream sources all fail
pub async fn offline_app() -> TestApp {
    test_app(
        Arc::new(FakeSource::failing("roster")),
        Arc::new(FakeSource::failing("historical")),
        FakeLineupProvider::default(),
    )
    .await
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    dispatch(app, request).await
}

/// Send `body` verbatim as a JSON request
pub async fn send_raw(app: &TestApp, method: Method, uri: &str, body: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    dispatch(app, request).await
}

async fn dispatch(app: &TestApp, request: Request<Body>) -> TestResponse {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &TestApp, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, None, &[]).await
}

/// Write a driver lineup row verbatim, bypassing document validation
pub async fn store_raw_driver_lineup(pool: &SqlitePool, season: i32, raw: &str) {
    sqlx::query("INSERT INTO driver_season_lineups (season, lineup) VALUES (?, ?)")
        .bind(season)
        .bind(raw)
        .execute(pool)
        .await
        .unwrap();
}

pub fn driver(driver_id: &str, forename: &str, surname: &str) -> DriverRecord {
    DriverRecord {
        driver_id: driver_id.to_string(),
        code: Some(surname.chars().take(3).collect::<String>().to_uppercase()),
        forename: forename.to_string(),
        surname: surname.to_string(),
        nationality: Some("British".to_string()),
        ..Default::default()
    }
}

pub fn constructor(constructor_id: &str, name: &str) -> ConstructorRecord {
    ConstructorRecord {
        constructor_id: constructor_id.to_string(),
        name: name.to_string(),
        nationality: Some("British".to_string()),
        url: None,
    }
}

pub fn race(season: i32, round: i32) -> RaceRecord {
    RaceRecord {
        season,
        round,
        name: format!("Round {} Grand Prix", round),
        circuit: CircuitRecord {
            circuit_id: format!("circuit_{}", round),
            name: format!("Circuit {}", round),
            locality: Some("Town".to_string()),
            country: Some("Nowhere".to_string()),
            ..Default::default()
        },
        date: NaiveDate::from_ymd_opt(season, 3, 2)
            .map(|d| d + chrono::Duration::days(14 * i64::from(round))),
        ..Default::default()
    }
}

pub fn result(driver: DriverRecord, constructor: ConstructorRecord, position: Option<i64>) -> ResultRecord {
    let points = match position {
        Some(1) => 25.0,
        Some(2) => 18.0,
        Some(3) => 15.0,
        _ => 0.0,
    };
    ResultRecord {
        driver,
        constructor,
        position,
        position_text: Some(position.map_or("R".to_string(), |p| p.to_string())),
        points,
        status: Some(if position.is_some() { "Finished" } else { "Retired" }.to_string()),
        ..Default::default()
    }
}

pub fn lineup_response(season: i32) -> LineupServiceResponse {
    let entry = |id: &str, team: &str, number: i64| ServiceDriverEntry {
        season: Some(season),
        driver_id: id.to_string(),
        team_name: team.to_string(),
        driver_number: Some(number),
    };
    LineupServiceResponse {
        drivers: vec![
            entry("norris", "McLaren", 4),
            entry("piastri", "McLaren", 81),
            entry("HAM", "Ferrari", 44),
        ],
        constructors: vec![
            ServiceConstructorEntry {
                season: Some(season),
                constructor_id: "mclaren".to_string(),
            },
            ServiceConstructorEntry {
                season: Some(season),
                constructor_id: "scuderia_ferrari".to_string(),
            },
        ],
        ..Default::default()
    }
}
