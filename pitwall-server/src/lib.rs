//! pitwall-server library interface
//!
//! Exposes the sync services, repositories and router for the binary and for integration
//! tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use pitwall_common::IdentifierOverrides;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::services::{LineupProvider, LineupResolver, LineupSync, SyncOrchestrator};
use crate::sources::DataSource;
use crate::utils::SeasonClock;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub orchestrator: SyncOrchestrator,
    pub lineup_sync: LineupSync,
    pub resolver: LineupResolver,
    pub overrides: Arc<IdentifierOverrides>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last sync failure, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
    /// Running season, shared with the roster source
    clock: SeasonClock,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        roster: Arc<dyn DataSource>,
        historical: Arc<dyn DataSource>,
        lineup_provider: Arc<dyn LineupProvider>,
        overrides: Arc<IdentifierOverrides>,
    ) -> Self {
        Self {
            orchestrator: SyncOrchestrator::new(db.clone(), roster, historical),
            lineup_sync: LineupSync::new(db.clone(), lineup_provider, overrides.clone()),
            resolver: LineupResolver::new(db.clone(), overrides.clone()),
            db,
            overrides,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
            clock: SeasonClock::system(),
        }
    }

    /// Use the clock the roster source was built with
    pub fn with_clock(mut self, clock: SeasonClock) -> Self {
        self.clock = clock;
        self
    }

    /// Pin the year used for "current season" decisions
    pub fn with_current_year(self, year: i32) -> Self {
        self.with_clock(SeasonClock::pinned(year))
    }

    pub fn current_year(&self) -> i32 {
        self.clock.current_year()
    }

    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// `<version> (<git hash>, <build timestamp>, <profile>)`
pub fn build_id() -> String {
    format!(
        "{} ({}, {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    )
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::race_routes())
        .merge(api::driver_routes())
        .merge(api::constructor_routes())
        .merge(api::circuit_routes())
        .merge(api::admin_routes())
        .merge(api::sync_routes())
        .fallback(api::not_found)
        .layer(axum::middleware::from_fn(api::correlation_middleware))
        .with_state(state)
}
