//! Driver persistence

use chrono::NaiveDate;
use pitwall_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::sources::DriverRecord;

const DRIVER_COLUMNS: &str = r#"
    d.id, d.driver_id, d.code, d.forename, d.surname, d.date_of_birth, d.nationality, d.url,
    d.permanent_number, d.current_team, d.is_active, d.driver_championships,
    d.constructor_championships
"#;

/// Stored driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub driver_id: String,
    pub code: Option<String>,
    pub forename: String,
    pub surname: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: String,
    pub url: Option<String>,
    pub permanent_number: Option<i64>,
    pub current_team: Option<String>,
    pub is_active: bool,
    pub driver_championships: i64,
    pub constructor_championships: i64,
}

impl Driver {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            driver_id: row.get("driver_id"),
            code: row.get("code"),
            forename: row.get("forename"),
            surname: row.get("surname"),
            date_of_birth: row.get("date_of_birth"),
            nationality: row.get("nationality"),
            url: row.get("url"),
            permanent_number: row.get("permanent_number"),
            current_team: row.get("current_team"),
            is_active: row.get("is_active"),
            driver_championships: row.get("driver_championships"),
            constructor_championships: row.get("constructor_championships"),
        }
    }
}

/// Partial admin edit; `None` leaves the stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPatch {
    pub code: Option<String>,
    pub forename: Option<String>,
    pub surname: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub url: Option<String>,
    pub permanent_number: Option<i64>,
    pub current_team: Option<String>,
    pub is_active: Option<bool>,
    pub driver_championships: Option<i64>,
    pub constructor_championships: Option<i64>,
}

impl DriverPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.permanent_number {
            if !(1..=99).contains(&n) {
                return Err(Error::InvalidInput(format!(
                    "permanentNumber must be between 1 and 99, got {}",
                    n
                )));
            }
        }
        if matches!(self.driver_championships, Some(v) if v < 0) {
            return Err(Error::InvalidInput(
                "driverChampionships must be >= 0".to_string(),
            ));
        }
        if matches!(self.constructor_championships, Some(v) if v < 0) {
            return Err(Error::InvalidInput(
                "constructorChampionships must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// One race result from a driver's perspective
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverResult {
    pub race_id: String,
    pub season: i32,
    pub round: i32,
    pub race_name: String,
    pub date: NaiveDate,
    pub circuit_id: String,
    pub circuit_name: Option<String>,
    pub constructor_id: String,
    pub constructor_name: Option<String>,
    pub grid: Option<i64>,
    pub position: Option<i64>,
    pub position_text: Option<String>,
    pub points: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStats {
    pub driver: Driver,
    pub total_races: i64,
    pub total_points: f64,
    pub wins: i64,
    pub podiums: i64,
}

/// Create or partially update a driver keyed by `driver_id`
///
/// Returns `Error::InvalidInput` without touching the database when the record fails
/// validation.
pub async fn upsert_driver<'e, E>(executor: E, record: &DriverRecord) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    record.validate()?;

    sqlx::query(
        r#"
        INSERT INTO drivers (
            id, driver_id, code, forename, surname, date_of_birth, nationality, url,
            permanent_number, current_team, is_active, driver_championships,
            constructor_championships, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, COALESCE(?7, ''), ?8, ?9, ?10,
            COALESCE(?11, 0), COALESCE(?12, 0), COALESCE(?13, 0),
            CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
        )
        ON CONFLICT(driver_id) DO UPDATE SET
            code = COALESCE(?3, drivers.code),
            forename = COALESCE(NULLIF(?4, ''), drivers.forename),
            surname = COALESCE(NULLIF(?5, ''), drivers.surname),
            date_of_birth = COALESCE(?6, drivers.date_of_birth),
            nationality = COALESCE(?7, drivers.nationality),
            url = COALESCE(?8, drivers.url),
            permanent_number = COALESCE(?9, drivers.permanent_number),
            current_team = COALESCE(?10, drivers.current_team),
            is_active = COALESCE(?11, drivers.is_active),
            driver_championships = COALESCE(?12, drivers.driver_championships),
            constructor_championships = COALESCE(?13, drivers.constructor_championships),
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(record.driver_id.trim())
    .bind(&record.code)
    .bind(record.forename.trim())
    .bind(record.surname.trim())
    .bind(record.date_of_birth)
    .bind(&record.nationality)
    .bind(&record.url)
    .bind(record.permanent_number)
    .bind(&record.current_team)
    .bind(record.is_active)
    .bind(record.driver_championships)
    .bind(record.constructor_championships)
    .execute(executor)
    .await?;

    Ok(())
}

/// Apply an admin edit; returns false when the driver does not exist
pub async fn update_driver(pool: &SqlitePool, driver_id: &str, patch: &DriverPatch) -> Result<bool> {
    patch.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE drivers SET
            code = COALESCE(?2, code),
            forename = COALESCE(?3, forename),
            surname = COALESCE(?4, surname),
            date_of_birth = COALESCE(?5, date_of_birth),
            nationality = COALESCE(?6, nationality),
            url = COALESCE(?7, url),
            permanent_number = COALESCE(?8, permanent_number),
            current_team = COALESCE(?9, current_team),
            is_active = COALESCE(?10, is_active),
            driver_championships = COALESCE(?11, driver_championships),
            constructor_championships = COALESCE(?12, constructor_championships),
            updated_at = CURRENT_TIMESTAMP
        WHERE driver_id = ?1
        "#,
    )
    .bind(driver_id)
    .bind(&patch.code)
    .bind(&patch.forename)
    .bind(&patch.surname)
    .bind(patch.date_of_birth)
    .bind(&patch.nationality)
    .bind(&patch.url)
    .bind(patch.permanent_number)
    .bind(&patch.current_team)
    .bind(patch.is_active)
    .bind(patch.driver_championships)
    .bind(patch.constructor_championships)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Set or clear `current_team`; returns false when the driver does not exist
pub async fn set_driver_team(pool: &SqlitePool, driver_id: &str, team: Option<&str>) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE drivers SET current_team = ?, updated_at = CURRENT_TIMESTAMP WHERE driver_id = ?",
    )
    .bind(team)
    .bind(driver_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_driver(pool: &SqlitePool, driver_id: &str) -> Result<Option<Driver>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM drivers d WHERE d.driver_id = ?",
        DRIVER_COLUMNS
    ))
    .bind(driver_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(Driver::from_row))
}

/// Paged listing sorted by (surname, forename) with the unpaged total
pub async fn list_drivers(
    pool: &SqlitePool,
    active: Option<bool>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Driver>, i64)> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM drivers d
        WHERE (?1 IS NULL OR d.is_active = ?1)
        ORDER BY d.surname, d.forename
        LIMIT ?2 OFFSET ?3
        "#,
        DRIVER_COLUMNS
    ))
    .bind(active)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM drivers WHERE (?1 IS NULL OR is_active = ?1)")
            .bind(active)
            .fetch_one(pool)
            .await?;

    Ok((rows.iter().map(Driver::from_row).collect(), total))
}

/// Every driver sorted by (current team with nulls last, surname, forename)
pub async fn list_drivers_by_team(pool: &SqlitePool, active_only: bool) -> Result<Vec<Driver>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM drivers d
        WHERE (?1 = 0 OR d.is_active = 1)
        ORDER BY d.current_team IS NULL, d.current_team, d.surname, d.forename
        "#,
        DRIVER_COLUMNS
    ))
    .bind(active_only)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(Driver::from_row).collect())
}

/// Drivers with at least one race result in `season`, sorted by (surname, forename)
pub async fn list_season_participants(pool: &SqlitePool, season: i32) -> Result<Vec<Driver>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM drivers d
        WHERE d.driver_id IN (
            SELECT rr.driver_id FROM race_results rr
            JOIN races r ON r.id = rr.race_id
            WHERE r.season = ?
        )
        ORDER BY d.surname, d.forename
        "#,
        DRIVER_COLUMNS
    ))
    .bind(season)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(Driver::from_row).collect())
}

/// All drivers, unordered
pub async fn load_all_drivers(pool: &SqlitePool) -> Result<Vec<Driver>> {
    let rows = sqlx::query(&format!("SELECT {} FROM drivers d", DRIVER_COLUMNS))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(Driver::from_row).collect())
}

/// Race results for a driver, newest race first
pub async fn driver_results(
    pool: &SqlitePool,
    driver_id: &str,
    limit: Option<i64>,
) -> Result<Vec<DriverResult>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id AS race_id, r.season, r.round, r.name AS race_name, r.date, r.circuit_id,
               c.name AS circuit_name, rr.constructor_id, k.name AS constructor_name,
               rr.grid, rr.position, rr.position_text, rr.points, rr.status
        FROM race_results rr
        JOIN races r ON r.id = rr.race_id
        LEFT JOIN circuits c ON c.circuit_id = r.circuit_id
        LEFT JOIN constructors k ON k.constructor_id = rr.constructor_id
        WHERE rr.driver_id = ?1
        ORDER BY r.date DESC, r.round DESC
        LIMIT ?2
        "#,
    )
    .bind(driver_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| DriverResult {
            race_id: row.get("race_id"),
            season: row.get("season"),
            round: row.get("round"),
            race_name: row.get("race_name"),
            date: row.get("date"),
            circuit_id: row.get("circuit_id"),
            circuit_name: row.get("circuit_name"),
            constructor_id: row.get("constructor_id"),
            constructor_name: row.get("constructor_name"),
            grid: row.get("grid"),
            position: row.get("position"),
            position_text: row.get("position_text"),
            points: row.get("points"),
            status: row.get("status"),
        })
        .collect())
}

/// Career totals; `None` when the driver does not exist
pub async fn driver_stats(pool: &SqlitePool, driver_id: &str) -> Result<Option<DriverStats>> {
    let Some(driver) = find_driver(pool, driver_id).await? else {
        return Ok(None);
    };

    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total_races,
            CAST(COALESCE(SUM(points), 0) AS REAL) AS total_points,
            CAST(COALESCE(SUM(CASE WHEN position = 1 THEN 1 ELSE 0 END), 0) AS INTEGER) AS wins,
            CAST(COALESCE(SUM(CASE WHEN position BETWEEN 1 AND 3 THEN 1 ELSE 0 END), 0) AS INTEGER) AS podiums
        FROM race_results
        WHERE driver_id = ?
        "#,
    )
    .bind(driver_id)
    .fetch_one(pool)
    .await?;

    Ok(Some(DriverStats {
        driver,
        total_races: row.get("total_races"),
        total_points: row.get("total_points"),
        wins: row.get("wins"),
        podiums: row.get("podiums"),
    }))
}
