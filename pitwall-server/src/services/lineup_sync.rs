//! Lineup sync from the lineup service
//!
//! The lineup service is a sidecar that may be cold-starting when asked, so every fetch is
//! wrapped in [`retry_with_backoff`] with the 15 s / 30 s / 60 s schedule. A sync is
//! `POST {base}/api/sync/lineups` with `{"season": N}`. The service answers with flat driver
//! and constructor rows next to its `success`/`message` status; the rows are regrouped into
//! the two typed lineup documents and stored here, one row per season.

use async_trait::async_trait;
use pitwall_common::IdentifierOverrides;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::lineups::{save_constructor_lineup, save_driver_lineup};
use crate::models::{ConstructorLineupDocument, DriverLineupDocument, LineupDriver, LineupTeam};
use crate::utils::retry::{retry_with_backoff, Retryable, LINEUP_SERVICE_BACKOFF};

const LINEUP_SERVICE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum LineupServiceError {
    #[error("Lineup service returned HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Lineup service timed out: {0}")]
    Timeout(String),

    #[error("Lineup service unreachable: {0}")]
    Connect(String),

    #[error("Lineup service returned a malformed response: {0}")]
    Malformed(String),

    /// The service answered but reported `success: false`
    #[error("Lineup service rejected the sync: {0}")]
    Rejected(String),

    #[error(transparent)]
    Database(#[from] pitwall_common::Error),
}

impl Retryable for LineupServiceError {
    fn is_retryable(&self) -> bool {
        match self {
            LineupServiceError::Status(code, _) => matches!(code, 502..=504),
            LineupServiceError::Timeout(_) | LineupServiceError::Connect(_) => true,
            LineupServiceError::Malformed(_)
            | LineupServiceError::Rejected(_)
            | LineupServiceError::Database(_) => false,
        }
    }
}

impl From<reqwest::Error> for LineupServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LineupServiceError::Timeout(e.to_string())
        } else if e.is_decode() {
            LineupServiceError::Malformed(e.to_string())
        } else {
            LineupServiceError::Connect(e.to_string())
        }
    }
}

const LINEUP_SYNC_PATH: &str = "/api/sync/lineups";

#[derive(Debug, Serialize, Deserialize)]
pub struct LineupSyncRequest {
    pub season: i32,
}

/// `POST /api/sync/lineups` response body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LineupServiceResponse {
    /// Absent means success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub drivers: Vec<ServiceDriverEntry>,
    #[serde(default)]
    pub constructors: Vec<ServiceConstructorEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceDriverEntry {
    #[serde(default)]
    pub season: Option<i32>,
    pub driver_id: String,
    pub team_name: String,
    #[serde(default)]
    pub driver_number: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConstructorEntry {
    #[serde(default)]
    pub season: Option<i32>,
    pub constructor_id: String,
}

/// Anything that can answer a lineup request
#[async_trait]
pub trait LineupProvider: Send + Sync {
    async fn fetch_lineups(&self, season: i32) -> Result<LineupServiceResponse, LineupServiceError>;
}

/// HTTP client for the lineup service
pub struct LineupServiceClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl LineupServiceClient {
    pub fn new(base_url: &str) -> Result<Self, LineupServiceError> {
        let http_client = reqwest::Client::builder()
            .timeout(LINEUP_SERVICE_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LineupProvider for LineupServiceClient {
    async fn fetch_lineups(&self, season: i32) -> Result<LineupServiceResponse, LineupServiceError> {
        let url = format!("{}{}", self.base_url, LINEUP_SYNC_PATH);
        debug!(season, url = %url, "Requesting lineups");

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&LineupSyncRequest { season })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LineupServiceError::Status(
                status.as_u16(),
                body.chars().take(200).collect(),
            ));
        }

        let body: LineupServiceResponse = response.json().await?;
        if body.success == Some(false) {
            return Err(LineupServiceError::Rejected(
                body.message.unwrap_or_else(|| "no message".to_string()),
            ));
        }
        Ok(body)
    }
}

/// Fetch one season's lineups, retrying retryable failures on the backoff schedule
pub async fn fetch_lineups_with_backoff(
    provider: &dyn LineupProvider,
    season: i32,
) -> Result<LineupServiceResponse, LineupServiceError> {
    retry_with_backoff(
        &format!("lineup sync {}", season),
        &LINEUP_SERVICE_BACKOFF,
        move || provider.fetch_lineups(season),
    )
    .await
}

/// Regroup service rows into the stored document shapes
///
/// Teams are sorted by name; drivers keep service order within a team. Rows for another
/// season, or with an empty id or team, are dropped.
pub fn build_documents(
    season: i32,
    response: &LineupServiceResponse,
    overrides: &IdentifierOverrides,
) -> (DriverLineupDocument, ConstructorLineupDocument) {
    let mut teams: BTreeMap<String, Vec<LineupDriver>> = BTreeMap::new();
    for entry in &response.drivers {
        if entry.season.is_some_and(|s| s != season) {
            debug!(season, driver_id = %entry.driver_id, "Ignoring lineup row for another season");
            continue;
        }
        let driver_id = entry.driver_id.trim().to_lowercase();
        let team_name = entry.team_name.trim();
        if driver_id.is_empty() || team_name.is_empty() {
            warn!(season, ?entry, "Lineup row without driver id or team, skipping");
            continue;
        }
        teams.entry(team_name.to_string()).or_default().push(LineupDriver {
            driver_id,
            driver_number: entry.driver_number,
        });
    }

    let drivers = DriverLineupDocument {
        teams: teams
            .into_iter()
            .map(|(team_name, drivers)| LineupTeam { team_name, drivers })
            .collect(),
    };

    let mut seen = HashSet::new();
    let constructors = response
        .constructors
        .iter()
        .filter(|c| c.season.map_or(true, |s| s == season))
        .filter(|c| !c.constructor_id.trim().is_empty())
        .map(|c| overrides.canonical_constructor_id(&c.constructor_id))
        .filter(|id| seen.insert(id.clone()))
        .collect();

    (drivers, ConstructorLineupDocument(constructors))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupSyncSummary {
    pub season: i32,
    pub teams: usize,
    pub drivers: usize,
    pub constructors: usize,
}

/// Pulls lineups from a [`LineupProvider`] and stores them
#[derive(Clone)]
pub struct LineupSync {
    db: SqlitePool,
    provider: Arc<dyn LineupProvider>,
    overrides: Arc<IdentifierOverrides>,
}

impl LineupSync {
    pub fn new(
        db: SqlitePool,
        provider: Arc<dyn LineupProvider>,
        overrides: Arc<IdentifierOverrides>,
    ) -> Self {
        Self {
            db,
            provider,
            overrides,
        }
    }

    pub async fn sync_lineups(&self, season: i32) -> Result<LineupSyncSummary, LineupServiceError> {
        info!(season, "Syncing lineups");
        let response = fetch_lineups_with_backoff(self.provider.as_ref(), season).await?;
        let (drivers, constructors) = build_documents(season, &response, &self.overrides);

        if drivers.teams.is_empty() {
            warn!(season, "Lineup service returned no drivers");
        } else {
            save_driver_lineup(&self.db, season, &drivers).await?;
        }

        if constructors.ids().is_empty() {
            warn!(season, "Lineup service returned no constructors");
        } else {
            save_constructor_lineup(&self.db, season, &constructors).await?;
        }

        let summary = LineupSyncSummary {
            season,
            teams: drivers.teams.len(),
            drivers: drivers.driver_count(),
            constructors: constructors.ids().len(),
        };
        info!(
            season,
            teams = summary.teams,
            drivers = summary.drivers,
            constructors = summary.constructors,
            "Lineups stored"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::lineups::{load_constructor_lineup, load_driver_lineup};
    use crate::db::test_support::test_pool;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted outcomes; succeeds once the script runs out
    struct ScriptedProvider {
        script: Mutex<VecDeque<LineupServiceError>>,
        response: LineupServiceResponse,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(failures: Vec<LineupServiceError>, response: LineupServiceResponse) -> Self {
            Self {
                script: Mutex::new(failures.into()),
                response,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LineupProvider for ScriptedProvider {
        async fn fetch_lineups(
            &self,
            _season: i32,
        ) -> Result<LineupServiceResponse, LineupServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(err) => Err(err),
                None => Ok(self.response.clone()),
            }
        }
    }

    fn unavailable() -> LineupServiceError {
        LineupServiceError::Status(503, "warming up".to_string())
    }

    fn sample_response() -> LineupServiceResponse {
        let driver = |id: &str, team: &str, number: i64| ServiceDriverEntry {
            season: Some(2026),
            driver_id: id.to_string(),
            team_name: team.to_string(),
            driver_number: Some(number),
        };
        let constructor = |id: &str| ServiceConstructorEntry {
            season: Some(2026),
            constructor_id: id.to_string(),
        };

        LineupServiceResponse {
            drivers: vec![
                driver("Norris", "McLaren", 4),
                driver("leclerc", "Ferrari", 16),
                driver("piastri", "McLaren", 81),
                driver("hamilton", "Ferrari", 44),
                ServiceDriverEntry {
                    season: Some(2025),
                    ..driver("sainz", "Ferrari", 55)
                },
            ],
            constructors: vec![
                constructor("mclaren"),
                constructor("racing_bulls"),
                constructor("rb"),
                constructor("ferrari"),
            ],
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_unavailable_responses_then_success() {
        let provider = ScriptedProvider::new(
            vec![unavailable(), unavailable(), unavailable()],
            sample_response(),
        );
        let start = tokio::time::Instant::now();

        let response = fetch_lineups_with_backoff(&provider, 2026).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(15 + 30 + 60));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
        assert_eq!(response.drivers.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_and_connect_failures_are_retried() {
        let provider = ScriptedProvider::new(
            vec![
                LineupServiceError::Connect("refused".to_string()),
                LineupServiceError::Timeout("300s".to_string()),
            ],
            LineupServiceResponse::default(),
        );
        let start = tokio::time::Instant::now();

        fetch_lineups_with_backoff(&provider, 2026).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(15 + 30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_schedule_propagates_last_error() {
        let provider = ScriptedProvider::new(
            vec![
                unavailable(),
                unavailable(),
                unavailable(),
                LineupServiceError::Status(504, "gateway".to_string()),
            ],
            LineupServiceResponse::default(),
        );

        let err = fetch_lineups_with_backoff(&provider, 2026).await.unwrap_err();
        assert!(matches!(err, LineupServiceError::Status(504, _)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_status_fails_immediately() {
        let provider = ScriptedProvider::new(
            vec![LineupServiceError::Status(404, "no such season".to_string())],
            LineupServiceResponse::default(),
        );
        let start = tokio::time::Instant::now();

        let err = fetch_lineups_with_backoff(&provider, 2026).await.unwrap_err();
        assert!(matches!(err, LineupServiceError::Status(404, _)));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_documents_groups_by_team() {
        let (drivers, constructors) = build_documents(
            2026,
            &sample_response(),
            &IdentifierOverrides::with_defaults(),
        );

        let teams: Vec<_> = drivers.teams.iter().map(|t| t.team_name.as_str()).collect();
        assert_eq!(teams, vec!["Ferrari", "McLaren"]);
        let mclaren: Vec<_> = drivers.teams[1]
            .drivers
            .iter()
            .map(|d| d.driver_id.as_str())
            .collect();
        assert_eq!(mclaren, vec!["norris", "piastri"]);
        // 2025 row dropped
        assert_eq!(drivers.driver_count(), 4);

        assert_eq!(constructors.ids(), ["mclaren", "racing_bulls", "ferrari"]);
    }

    #[tokio::test]
    async fn test_sync_lineups_stores_both_documents() {
        let pool = test_pool().await;
        let sync = LineupSync::new(
            pool.clone(),
            Arc::new(ScriptedProvider::new(vec![], sample_response())),
            Arc::new(IdentifierOverrides::with_defaults()),
        );

        let summary = sync.sync_lineups(2026).await.unwrap();
        assert_eq!((summary.teams, summary.drivers, summary.constructors), (2, 4, 3));

        let stored = load_driver_lineup(&pool, 2026).await.unwrap().unwrap();
        assert_eq!(stored.teams[0].drivers[1].driver_number, Some(44));
        let stored = load_constructor_lineup(&pool, 2026).await.unwrap().unwrap();
        assert_eq!(stored.ids().len(), 3);
    }

    /// Lineup service stand-in on an ephemeral local port; returns its base URL
    async fn serve_lineup_service(reply: serde_json::Value) -> String {
        use axum::routing::post;
        use axum::Json;

        let app = axum::Router::new().route(
            LINEUP_SYNC_PATH,
            post(move |Json(request): Json<LineupSyncRequest>| {
                let mut reply = reply.clone();
                reply["echo_season"] = serde_json::json!(request.season);
                async move { Json(reply) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_client_posts_season_to_sync_endpoint() {
        let base = serve_lineup_service(serde_json::json!({
            "success": true,
            "message": "ok",
            "drivers_synced": 1,
            "drivers": [{"season": 2026, "driver_id": "norris", "team_name": "McLaren", "driver_number": 4}],
            "constructors": [{"season": 2026, "constructor_id": "mclaren"}]
        }))
        .await;

        let client = LineupServiceClient::new(&format!("{}/", base)).unwrap();
        let response = client.fetch_lineups(2026).await.unwrap();
        assert_eq!(response.drivers.len(), 1);
        assert_eq!(response.drivers[0].driver_id, "norris");
        assert_eq!(response.constructors[0].constructor_id, "mclaren");
    }

    #[tokio::test]
    async fn test_client_reports_unsuccessful_sync() {
        let base = serve_lineup_service(serde_json::json!({
            "success": false,
            "message": "No lineup data for season"
        }))
        .await;

        let client = LineupServiceClient::new(&base).unwrap();
        let err = client.fetch_lineups(2031).await.unwrap_err();
        assert!(matches!(err, LineupServiceError::Rejected(ref m) if m.contains("No lineup data")));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_response_stores_nothing() {
        let pool = test_pool().await;
        let sync = LineupSync::new(
            pool.clone(),
            Arc::new(ScriptedProvider::new(vec![], LineupServiceResponse::default())),
            Arc::new(IdentifierOverrides::with_defaults()),
        );

        sync.sync_lineups(2026).await.unwrap();
        assert!(load_driver_lineup(&pool, 2026).await.unwrap().is_none());
    }
}
