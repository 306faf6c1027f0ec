//! Season lineup documents
//!
//! One row per season in each of `driver_season_lineups` and `constructor_season_lineups`.
//! A stored document that no longer parses is reported and treated as absent.

use pitwall_common::Result;
use sqlx::SqlitePool;
use tracing::warn;

use crate::models::{ConstructorLineupDocument, DriverLineupDocument};

pub async fn save_driver_lineup(
    pool: &SqlitePool,
    season: i32,
    document: &DriverLineupDocument,
) -> Result<()> {
    document.validate()?;
    let json = serde_json::to_string(document)?;

    sqlx::query(
        r#"
        INSERT INTO driver_season_lineups (season, lineup, created_at, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(season) DO UPDATE SET
            lineup = excluded.lineup,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(season)
    .bind(json)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn save_constructor_lineup(
    pool: &SqlitePool,
    season: i32,
    document: &ConstructorLineupDocument,
) -> Result<()> {
    document.validate()?;
    let json = serde_json::to_string(document)?;

    sqlx::query(
        r#"
        INSERT INTO constructor_season_lineups (season, constructors, created_at, updated_at)
        VALUES (?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(season) DO UPDATE SET
            constructors = excluded.constructors,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(season)
    .bind(json)
    .execute(pool)
    .await?;

    Ok(())
}

/// `None` when no document exists or the stored one is malformed
pub async fn load_driver_lineup(
    pool: &SqlitePool,
    season: i32,
) -> Result<Option<DriverLineupDocument>> {
    let raw: Option<String> =
        sqlx::query_scalar("SELECT lineup FROM driver_season_lineups WHERE season = ?")
            .bind(season)
            .fetch_optional(pool)
            .await?;

    Ok(raw.and_then(|raw| match DriverLineupDocument::parse(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(season, error = %e, "Stored driver lineup is malformed, ignoring it");
            None
        }
    }))
}

/// `None` when no document exists or the stored one is malformed
pub async fn load_constructor_lineup(
    pool: &SqlitePool,
    season: i32,
) -> Result<Option<ConstructorLineupDocument>> {
    let raw: Option<String> = sqlx::query_scalar(
        "SELECT constructors FROM constructor_season_lineups WHERE season = ?",
    )
    .bind(season)
    .fetch_optional(pool)
    .await?;

    Ok(raw.and_then(|raw| match ConstructorLineupDocument::parse(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(season, error = %e, "Stored constructor lineup is malformed, ignoring it");
            None
        }
    }))
}
