//! Upstream data source adapters
//!
//! Every adapter implements [`DataSource`]; the sync orchestrator iterates a list of
//! adapters as trait objects. Adapters pace their own requests through a [`RateLimiter`]
//! and surface provider failures as [`SourceError`].

pub mod historical;
pub mod rate_limiter;
pub mod records;
pub mod roster;

pub use historical::HistoricalSource;
pub use rate_limiter::RateLimiter;
pub use records::{
    CircuitRecord, ConstructorRecord, DriverRecord, QualifyingRecord, RaceRecord, ResultRecord,
};
pub use roster::RosterSource;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("pitwall/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Adapter failures
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure, timeout or 5xx
    #[error("{0} unavailable: {1}")]
    Unavailable(String, String),

    /// HTTP 429
    #[error("{0} rate limit exceeded")]
    RateLimited(String),

    /// Any other non-success status
    #[error("{0} returned HTTP {1}: {2}")]
    Status(String, u16, String),

    /// Body could not be decoded
    #[error("{0} returned a malformed response: {1}")]
    Malformed(String, String),

    /// The provider does not offer this collection
    #[error("{0} does not support {1}")]
    Unsupported(String, &'static str),
}

impl SourceError {
    /// True for failures that a later attempt might not hit
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::Unavailable(..) | SourceError::RateLimited(..)
        )
    }
}

/// Closed interface implemented by every upstream adapter
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Provider name used in logs and sync summaries
    fn name(&self) -> &str;

    async fn fetch_races(&self, season: i32) -> Result<Vec<RaceRecord>, SourceError>;

    async fn fetch_drivers(&self, season: i32) -> Result<Vec<DriverRecord>, SourceError>;

    async fn fetch_constructors(&self, season: i32)
        -> Result<Vec<ConstructorRecord>, SourceError>;

    async fn fetch_circuits(&self) -> Result<Vec<CircuitRecord>, SourceError>;

    async fn fetch_race_results(
        &self,
        season: i32,
        round: i32,
    ) -> Result<Vec<ResultRecord>, SourceError>;

    async fn fetch_qualifying_results(
        &self,
        season: i32,
        round: i32,
    ) -> Result<Vec<QualifyingRecord>, SourceError>;
}

/// HTTP client shared by the adapters' request helpers
pub(crate) fn build_http_client(source: &str) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| SourceError::Unavailable(source.to_string(), e.to_string()))
}

/// GET `url` and decode the JSON body, mapping failures onto [`SourceError`]
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    source: &str,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, SourceError> {
    tracing::debug!(source, url, "Querying upstream API");

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .query(query)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(source, url, error = %e, "Upstream request failed");
            SourceError::Unavailable(source.to_string(), e.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(source, url, status = status.as_u16(), "Upstream API error");
        return Err(status_error(source, status, body));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SourceError::Unavailable(source.to_string(), e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        tracing::error!(source, url, error = %e, "Upstream response could not be decoded");
        SourceError::Malformed(source.to_string(), e.to_string())
    })
}

fn status_error(source: &str, status: StatusCode, body: String) -> SourceError {
    match status.as_u16() {
        429 => SourceError::RateLimited(source.to_string()),
        // 441 is what the historical provider answers with while it is down
        441 | 500..=599 => SourceError::Unavailable(
            source.to_string(),
            format!("HTTP {}", status.as_u16()),
        ),
        code => SourceError::Status(source.to_string(), code, truncate(&body, 200)),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
