//! Constructor persistence

use chrono::NaiveDate;
use pitwall_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::sources::ConstructorRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constructor {
    pub id: String,
    pub constructor_id: String,
    pub name: String,
    pub nationality: String,
    pub url: Option<String>,
}

impl Constructor {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            constructor_id: row.get("constructor_id"),
            name: row.get("name"),
            nationality: row.get("nationality"),
            url: row.get("url"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorPatch {
    pub name: Option<String>,
    pub nationality: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorResult {
    pub race_id: String,
    pub season: i32,
    pub round: i32,
    pub race_name: String,
    pub date: NaiveDate,
    pub driver_id: String,
    pub driver_name: String,
    pub position: Option<i64>,
    pub position_text: Option<String>,
    pub points: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorStats {
    pub constructor: Constructor,
    /// Distinct races entered
    pub total_races: i64,
    pub total_points: f64,
    pub wins: i64,
    pub podiums: i64,
}

/// Create or partially update a constructor keyed by `constructor_id`
pub async fn upsert_constructor<'e, E>(executor: E, record: &ConstructorRecord) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    record.validate()?;

    sqlx::query(
        r#"
        INSERT INTO constructors (id, constructor_id, name, nationality, url, created_at, updated_at)
        VALUES (?1, ?2, ?3, COALESCE(?4, ''), ?5, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(constructor_id) DO UPDATE SET
            name = ?3,
            nationality = COALESCE(?4, constructors.nationality),
            url = COALESCE(?5, constructors.url),
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(record.constructor_id.trim())
    .bind(record.name.trim())
    .bind(&record.nationality)
    .bind(&record.url)
    .execute(executor)
    .await?;

    Ok(())
}

/// Apply an admin edit; returns false when the constructor does not exist
pub async fn update_constructor(
    pool: &SqlitePool,
    constructor_id: &str,
    patch: &ConstructorPatch,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE constructors SET
            name = COALESCE(?2, name),
            nationality = COALESCE(?3, nationality),
            url = COALESCE(?4, url),
            updated_at = CURRENT_TIMESTAMP
        WHERE constructor_id = ?1
        "#,
    )
    .bind(constructor_id)
    .bind(&patch.name)
    .bind(&patch.nationality)
    .bind(&patch.url)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_constructor(pool: &SqlitePool, constructor_id: &str) -> Result<Option<Constructor>> {
    let row = sqlx::query(
        "SELECT id, constructor_id, name, nationality, url FROM constructors WHERE constructor_id = ?",
    )
    .bind(constructor_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(Constructor::from_row))
}

/// Paged listing sorted by name with the unpaged total
pub async fn list_constructors(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Constructor>, i64)> {
    let rows = sqlx::query(
        r#"
        SELECT id, constructor_id, name, nationality, url FROM constructors
        ORDER BY name COLLATE NOCASE
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM constructors")
        .fetch_one(pool)
        .await?;

    Ok((rows.iter().map(Constructor::from_row).collect(), total))
}

/// Constructors with at least one race result in `season`, sorted by name
pub async fn list_season_participants(pool: &SqlitePool, season: i32) -> Result<Vec<Constructor>> {
    let rows = sqlx::query(
        r#"
        SELECT id, constructor_id, name, nationality, url FROM constructors
        WHERE constructor_id IN (
            SELECT rr.constructor_id FROM race_results rr
            JOIN races r ON r.id = rr.race_id
            WHERE r.season = ?
        )
        ORDER BY name COLLATE NOCASE
        "#,
    )
    .bind(season)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(Constructor::from_row).collect())
}

pub async fn load_all_constructors(pool: &SqlitePool) -> Result<Vec<Constructor>> {
    let rows = sqlx::query(
        "SELECT id, constructor_id, name, nationality, url FROM constructors ORDER BY name COLLATE NOCASE",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(Constructor::from_row).collect())
}

/// Race results scored for a constructor, newest race first
pub async fn constructor_results(
    pool: &SqlitePool,
    constructor_id: &str,
    limit: Option<i64>,
) -> Result<Vec<ConstructorResult>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id AS race_id, r.season, r.round, r.name AS race_name, r.date,
               rr.driver_id, d.forename || ' ' || d.surname AS driver_name,
               rr.position, rr.position_text, rr.points, rr.status
        FROM race_results rr
        JOIN races r ON r.id = rr.race_id
        JOIN drivers d ON d.driver_id = rr.driver_id
        WHERE rr.constructor_id = ?1
        ORDER BY r.date DESC, r.round DESC, rr.position IS NULL, rr.position
        LIMIT ?2
        "#,
    )
    .bind(constructor_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ConstructorResult {
            race_id: row.get("race_id"),
            season: row.get("season"),
            round: row.get("round"),
            race_name: row.get("race_name"),
            date: row.get("date"),
            driver_id: row.get("driver_id"),
            driver_name: row.get("driver_name"),
            position: row.get("position"),
            position_text: row.get("position_text"),
            points: row.get("points"),
            status: row.get("status"),
        })
        .collect())
}

pub async fn constructor_stats(
    pool: &SqlitePool,
    constructor_id: &str,
) -> Result<Option<ConstructorStats>> {
    let Some(constructor) = find_constructor(pool, constructor_id).await? else {
        return Ok(None);
    };

    let row = sqlx::query(
        r#"
        SELECT
            COUNT(DISTINCT race_id) AS total_races,
            CAST(COALESCE(SUM(points), 0) AS REAL) AS total_points,
            CAST(COALESCE(SUM(CASE WHEN position = 1 THEN 1 ELSE 0 END), 0) AS INTEGER) AS wins,
            CAST(COALESCE(SUM(CASE WHEN position BETWEEN 1 AND 3 THEN 1 ELSE 0 END), 0) AS INTEGER) AS podiums
        FROM race_results
        WHERE constructor_id = ?
        "#,
    )
    .bind(constructor_id)
    .fetch_one(pool)
    .await?;

    Ok(Some(ConstructorStats {
        constructor,
        total_races: row.get("total_races"),
        total_points: row.get("total_points"),
        wins: row.get("wins"),
        podiums: row.get("podiums"),
    }))
}
