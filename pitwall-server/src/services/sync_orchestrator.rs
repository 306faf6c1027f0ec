//! Unified sync orchestrator
//!
//! Drivers and constructors are pulled from a fixed fallback list `[roster, historical]`:
//! the first source that answers wins and no further source is asked. When every source
//! fails the caller gets one [`SyncError::AllSourcesFailed`] carrying the last failure.
//! Races, circuits and results come from the historical source only.

use pitwall_common::Error;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{error, info, warn};

use crate::db::{self, races::find_race_by_round};
use crate::sources::{
    CircuitRecord, ConstructorRecord, DataSource, DriverRecord, RaceRecord, SourceError,
};

/// Orchestrator failures
#[derive(Debug, ThisError)]
pub enum SyncError {
    /// Every source in the fallback list failed
    #[error("All sources failed to sync {entity}: {message}")]
    AllSourcesFailed { entity: &'static str, message: String },

    /// The only source for this entity failed
    #[error("{entity} sync from {source_name} failed: {error}")]
    Source {
        entity: &'static str,
        source_name: String,
        #[source]
        error: SourceError,
    },

    #[error(transparent)]
    Database(#[from] Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Outcome of one entity sync
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub entity: &'static str,
    /// Source that supplied the records
    pub source: String,
    pub fetched: usize,
    pub written: usize,
    /// Records rejected by validation
    pub skipped: usize,
}

impl SyncSummary {
    fn new(entity: &'static str, source: &str, fetched: usize) -> Self {
        Self {
            entity,
            source: source.to_string(),
            fetched,
            written: 0,
            skipped: 0,
        }
    }
}

/// Race results plus qualifying for one round
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResultsSummary {
    pub race_id: String,
    pub results: SyncSummary,
    pub qualifying: SyncSummary,
}

/// One step of a season sync
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStepReport {
    pub entity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SyncSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncStepReport {
    fn from_result(entity: &'static str, result: Result<SyncSummary, SyncError>) -> Self {
        match result {
            Ok(summary) => Self {
                entity,
                summary: Some(summary),
                error: None,
            },
            Err(e) => {
                error!(entity, error = %e, "Sync step failed");
                Self {
                    entity,
                    summary: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Per-step outcome of [`SyncOrchestrator::sync_season`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSyncReport {
    pub season: i32,
    pub steps: Vec<SyncStepReport>,
}

impl SeasonSyncReport {
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }

    /// Failed steps as `entity: message`, joined
    pub fn error_message(&self) -> Option<String> {
        let failures: Vec<String> = self
            .steps
            .iter()
            .filter_map(|s| s.error.as_ref().map(|e| format!("{}: {}", s.entity, e)))
            .collect();
        (!failures.is_empty()).then(|| failures.join("; "))
    }
}

/// Pulls upstream records and hands them to the upsert layer
#[derive(Clone)]
pub struct SyncOrchestrator {
    db: SqlitePool,
    roster: Arc<dyn DataSource>,
    historical: Arc<dyn DataSource>,
}

impl SyncOrchestrator {
    pub fn new(db: SqlitePool, roster: Arc<dyn DataSource>, historical: Arc<dyn DataSource>) -> Self {
        Self {
            db,
            roster,
            historical,
        }
    }

    /// Driver and constructor sources in priority order
    fn fallback_sources(&self) -> [&dyn DataSource; 2] {
        [self.roster.as_ref(), self.historical.as_ref()]
    }

    pub async fn sync_drivers_for_season(&self, season: i32) -> Result<SyncSummary, SyncError> {
        let mut last_error: Option<SourceError> = None;

        for source in self.fallback_sources() {
            match source.fetch_drivers(season).await {
                Ok(records) => return self.apply_drivers(source.name(), season, records).await,
                Err(e) => {
                    warn!(season, source = source.name(), error = %e, "Driver sync source failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(all_sources_failed("drivers", last_error))
    }

    pub async fn sync_constructors_for_season(
        &self,
        season: i32,
    ) -> Result<SyncSummary, SyncError> {
        let mut last_error: Option<SourceError> = None;

        for source in self.fallback_sources() {
            match source.fetch_constructors(season).await {
                Ok(records) => {
                    return self.apply_constructors(source.name(), season, records).await
                }
                Err(e) => {
                    warn!(season, source = source.name(), error = %e, "Constructor sync source failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(all_sources_failed("constructors", last_error))
    }

    pub async fn sync_races_for_season(&self, season: i32) -> Result<SyncSummary, SyncError> {
        let source = self.historical.as_ref();
        let records = source
            .fetch_races(season)
            .await
            .map_err(|e| source_failed("races", source, e))?;
        self.apply_races(source.name(), season, records).await
    }

    pub async fn sync_circuits(&self) -> Result<SyncSummary, SyncError> {
        let source = self.historical.as_ref();
        let records = source
            .fetch_circuits()
            .await
            .map_err(|e| source_failed("circuits", source, e))?;
        self.apply_circuits(source.name(), records).await
    }

    /// Replace results and qualifying for one round
    ///
    /// The race schedule for the season is synced first when the round is not stored yet.
    /// An empty upstream result set leaves the stored rows untouched.
    pub async fn sync_race_results(
        &self,
        season: i32,
        round: i32,
    ) -> Result<RaceResultsSummary, SyncError> {
        let race = match find_race_by_round(&self.db, season, round).await? {
            Some(race) => race,
            None => {
                info!(season, round, "Race not stored yet, syncing season schedule first");
                self.sync_races_for_season(season).await?;
                find_race_by_round(&self.db, season, round)
                    .await?
                    .ok_or_else(|| {
                        SyncError::NotFound(format!("race {} round {}", season, round))
                    })?
            }
        };

        let source = self.historical.as_ref();

        let results = source
            .fetch_race_results(season, round)
            .await
            .map_err(|e| source_failed("race results", source, e))?;
        let mut results_summary = SyncSummary::new("race results", source.name(), results.len());
        if results.is_empty() {
            warn!(season, round, source = source.name(), "No race results upstream");
        } else {
            results_summary.written = db::replace_race_results(&self.db, &race.id, &results).await?;
            results_summary.skipped = results.len() - results_summary.written;
        }

        let qualifying = source
            .fetch_qualifying_results(season, round)
            .await
            .map_err(|e| source_failed("qualifying", source, e))?;
        let mut qualifying_summary = SyncSummary::new("qualifying", source.name(), qualifying.len());
        if qualifying.is_empty() {
            warn!(season, round, source = source.name(), "No qualifying results upstream");
        } else {
            qualifying_summary.written =
                db::replace_qualifying_results(&self.db, &race.id, &qualifying).await?;
            qualifying_summary.skipped = qualifying.len() - qualifying_summary.written;
        }

        info!(
            season,
            round,
            results = results_summary.written,
            qualifying = qualifying_summary.written,
            "Race results synced"
        );

        Ok(RaceResultsSummary {
            race_id: race.id,
            results: results_summary,
            qualifying: qualifying_summary,
        })
    }

    /// Circuits, races, then drivers and constructors concurrently
    ///
    /// Every step runs even when an earlier one failed.
    pub async fn sync_season(&self, season: i32) -> SeasonSyncReport {
        info!(season, "Starting season sync");

        let circuits = SyncStepReport::from_result("circuits", self.sync_circuits().await);
        let races = SyncStepReport::from_result("races", self.sync_races_for_season(season).await);
        let (drivers, constructors) = tokio::join!(
            self.sync_drivers_for_season(season),
            self.sync_constructors_for_season(season)
        );

        let report = SeasonSyncReport {
            season,
            steps: vec![
                circuits,
                races,
                SyncStepReport::from_result("drivers", drivers),
                SyncStepReport::from_result("constructors", constructors),
            ],
        };

        if report.is_success() {
            info!(season, "Season sync complete");
        } else {
            warn!(season, "Season sync finished with failures");
        }
        report
    }

    async fn apply_drivers(
        &self,
        source: &str,
        season: i32,
        records: Vec<DriverRecord>,
    ) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::new("drivers", source, records.len());
        if records.is_empty() {
            warn!(season, source, "Source returned no drivers");
            return Ok(summary);
        }

        for record in &records {
            match db::upsert_driver(&self.db, record).await {
                Ok(()) => summary.written += 1,
                Err(e) if e.is_validation() => {
                    warn!(season, source, driver_id = %record.driver_id, error = %e, "Skipping invalid driver");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        log_summary(season, &summary);
        Ok(summary)
    }

    async fn apply_constructors(
        &self,
        source: &str,
        season: i32,
        records: Vec<ConstructorRecord>,
    ) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::new("constructors", source, records.len());
        if records.is_empty() {
            warn!(season, source, "Source returned no constructors");
            return Ok(summary);
        }

        for record in &records {
            match db::upsert_constructor(&self.db, record).await {
                Ok(()) => summary.written += 1,
                Err(e) if e.is_validation() => {
                    warn!(season, source, constructor_id = %record.constructor_id, error = %e, "Skipping invalid constructor");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        log_summary(season, &summary);
        Ok(summary)
    }

    async fn apply_races(
        &self,
        source: &str,
        season: i32,
        records: Vec<RaceRecord>,
    ) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::new("races", source, records.len());
        if records.is_empty() {
            warn!(season, source, "Source returned no races");
            return Ok(summary);
        }

        for record in &records {
            match db::upsert_race(&self.db, record, season).await {
                Ok(_) => summary.written += 1,
                Err(e) if e.is_validation() => {
                    warn!(season, source, round = record.round, error = %e, "Skipping invalid race");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        log_summary(season, &summary);
        Ok(summary)
    }

    async fn apply_circuits(
        &self,
        source: &str,
        records: Vec<CircuitRecord>,
    ) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::new("circuits", source, records.len());
        if records.is_empty() {
            warn!(source, "Source returned no circuits");
            return Ok(summary);
        }

        for record in &records {
            match db::upsert_circuit(&self.db, record).await {
                Ok(()) => summary.written += 1,
                Err(e) if e.is_validation() => {
                    warn!(source, circuit_id = %record.circuit_id, error = %e, "Skipping invalid circuit");
                    summary.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(source, written = summary.written, skipped = summary.skipped, "Circuits synced");
        Ok(summary)
    }
}

fn all_sources_failed(entity: &'static str, last_error: Option<SourceError>) -> SyncError {
    let message = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no sources configured".to_string());
    error!(entity, %message, "All sync sources failed");
    SyncError::AllSourcesFailed { entity, message }
}

fn source_failed(entity: &'static str, source: &dyn DataSource, error: SourceError) -> SyncError {
    warn!(entity, source = source.name(), error = %error, "Sync source failed");
    SyncError::Source {
        entity,
        source_name: source.name().to_string(),
        error,
    }
}

fn log_summary(season: i32, summary: &SyncSummary) {
    info!(
        season,
        entity = summary.entity,
        source = %summary.source,
        written = summary.written,
        skipped = summary.skipped,
        "Entity sync complete"
    );
}
