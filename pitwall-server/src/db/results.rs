//! Race and qualifying results
//!
//! A race's result set is replaced wholesale on every sync: delete, re-upsert the
//! referenced drivers and constructors, insert. The whole replacement is one transaction,
//! so readers see either the old set or the new one.

use pitwall_common::{Error, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use super::constructors::upsert_constructor;
use super::drivers::upsert_driver;
use crate::sources::{QualifyingRecord, ResultRecord};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceResultRow {
    pub driver_id: String,
    pub driver_code: Option<String>,
    pub forename: String,
    pub surname: String,
    pub constructor_id: String,
    pub constructor_name: String,
    pub number: Option<i64>,
    pub position: Option<i64>,
    pub position_text: Option<String>,
    pub points: f64,
    pub grid: Option<i64>,
    pub laps: Option<i64>,
    pub status: String,
    pub time: Option<String>,
    pub milliseconds: Option<i64>,
    pub fastest_lap: Option<i64>,
    pub fastest_lap_rank: Option<i64>,
    pub fastest_lap_time: Option<String>,
    pub fastest_lap_speed: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifyingResultRow {
    pub driver_id: String,
    pub driver_code: Option<String>,
    pub forename: String,
    pub surname: String,
    pub constructor_id: String,
    pub constructor_name: String,
    pub number: Option<i64>,
    pub position: Option<i64>,
    pub q1: Option<String>,
    pub q2: Option<String>,
    pub q3: Option<String>,
}

async fn ensure_race_exists(conn: &mut sqlx::SqliteConnection, race_id: &str) -> Result<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM races WHERE id = ?")
        .bind(race_id)
        .fetch_optional(&mut *conn)
        .await?;
    match exists {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("race '{}'", race_id))),
    }
}

/// Replace every race result of `race_id`; returns the number of rows written
///
/// Rows failing validation are logged and skipped. When no row survives validation the
/// stored set is left as it is. Any database error rolls the whole replacement back.
pub async fn replace_race_results(
    pool: &SqlitePool,
    race_id: &str,
    results: &[ResultRecord],
) -> Result<usize> {
    let valid: Vec<&ResultRecord> = results
        .iter()
        .filter(|result| match result.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(race_id, error = %e, "Skipping invalid race result");
                false
            }
        })
        .collect();

    let mut tx = pool.begin().await?;
    ensure_race_exists(&mut *tx, race_id).await?;

    if valid.is_empty() {
        warn!(race_id, received = results.len(), "No valid race results, keeping stored set");
        return Ok(0);
    }

    sqlx::query("DELETE FROM race_results WHERE race_id = ?")
        .bind(race_id)
        .execute(&mut *tx)
        .await?;

    let mut written = 0usize;
    for result in valid {
        upsert_driver(&mut *tx, &result.driver).await?;
        upsert_constructor(&mut *tx, &result.constructor).await?;

        sqlx::query(
            r#"
            INSERT INTO race_results (
                race_id, driver_id, constructor_id, number, position, position_text, points,
                grid, laps, status, time, milliseconds, fastest_lap, fastest_lap_rank,
                fastest_lap_time, fastest_lap_speed
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, ''), ?, ?, ?, ?, ?, ?)
            ON CONFLICT(race_id, driver_id, constructor_id) DO UPDATE SET
                number = excluded.number,
                position = excluded.position,
                position_text = excluded.position_text,
                points = excluded.points,
                grid = excluded.grid,
                laps = excluded.laps,
                status = excluded.status,
                time = excluded.time,
                milliseconds = excluded.milliseconds,
                fastest_lap = excluded.fastest_lap,
                fastest_lap_rank = excluded.fastest_lap_rank,
                fastest_lap_time = excluded.fastest_lap_time,
                fastest_lap_speed = excluded.fastest_lap_speed
            "#,
        )
        .bind(race_id)
        .bind(result.driver.driver_id.trim())
        .bind(result.constructor.constructor_id.trim())
        .bind(result.number)
        .bind(result.position)
        .bind(&result.position_text)
        .bind(result.points)
        .bind(result.grid)
        .bind(result.laps)
        .bind(&result.status)
        .bind(&result.time)
        .bind(result.milliseconds)
        .bind(result.fastest_lap)
        .bind(result.fastest_lap_rank)
        .bind(&result.fastest_lap_time)
        .bind(result.fastest_lap_speed)
        .execute(&mut *tx)
        .await?;

        written += 1;
    }

    tx.commit().await?;

    tracing::debug!(race_id, written, skipped = results.len() - written, "Replaced race results");
    Ok(written)
}

/// Replace every qualifying result of `race_id`; returns the number of rows written
pub async fn replace_qualifying_results(
    pool: &SqlitePool,
    race_id: &str,
    results: &[QualifyingRecord],
) -> Result<usize> {
    let valid: Vec<&QualifyingRecord> = results
        .iter()
        .filter(|result| match result.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(race_id, error = %e, "Skipping invalid qualifying result");
                false
            }
        })
        .collect();

    let mut tx = pool.begin().await?;
    ensure_race_exists(&mut *tx, race_id).await?;

    if valid.is_empty() {
        warn!(race_id, received = results.len(), "No valid qualifying results, keeping stored set");
        return Ok(0);
    }

    sqlx::query("DELETE FROM qualifying_results WHERE race_id = ?")
        .bind(race_id)
        .execute(&mut *tx)
        .await?;

    let mut written = 0usize;
    for result in valid {
        upsert_driver(&mut *tx, &result.driver).await?;
        upsert_constructor(&mut *tx, &result.constructor).await?;

        sqlx::query(
            r#"
            INSERT INTO qualifying_results (
                race_id, driver_id, constructor_id, number, position, q1, q2, q3
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(race_id, driver_id, constructor_id) DO UPDATE SET
                number = excluded.number,
                position = excluded.position,
                q1 = excluded.q1,
                q2 = excluded.q2,
                q3 = excluded.q3
            "#,
        )
        .bind(race_id)
        .bind(result.driver.driver_id.trim())
        .bind(result.constructor.constructor_id.trim())
        .bind(result.number)
        .bind(result.position)
        .bind(&result.q1)
        .bind(&result.q2)
        .bind(&result.q3)
        .execute(&mut *tx)
        .await?;

        written += 1;
    }

    tx.commit().await?;
    Ok(written)
}

/// Classified order first, unclassified rows after
pub async fn race_results(pool: &SqlitePool, race_id: &str) -> Result<Vec<RaceResultRow>> {
    let rows = sqlx::query(
        r#"
        SELECT rr.driver_id, d.code AS driver_code, d.forename, d.surname,
               rr.constructor_id, k.name AS constructor_name, rr.number, rr.position,
               rr.position_text, rr.points, rr.grid, rr.laps, rr.status, rr.time,
               rr.milliseconds, rr.fastest_lap, rr.fastest_lap_rank, rr.fastest_lap_time,
               rr.fastest_lap_speed
        FROM race_results rr
        JOIN drivers d ON d.driver_id = rr.driver_id
        JOIN constructors k ON k.constructor_id = rr.constructor_id
        WHERE rr.race_id = ?
        ORDER BY rr.position IS NULL, rr.position, rr.laps DESC, d.surname
        "#,
    )
    .bind(race_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| RaceResultRow {
            driver_id: row.get("driver_id"),
            driver_code: row.get("driver_code"),
            forename: row.get("forename"),
            surname: row.get("surname"),
            constructor_id: row.get("constructor_id"),
            constructor_name: row.get("constructor_name"),
            number: row.get("number"),
            position: row.get("position"),
            position_text: row.get("position_text"),
            points: row.get("points"),
            grid: row.get("grid"),
            laps: row.get("laps"),
            status: row.get("status"),
            time: row.get("time"),
            milliseconds: row.get("milliseconds"),
            fastest_lap: row.get("fastest_lap"),
            fastest_lap_rank: row.get("fastest_lap_rank"),
            fastest_lap_time: row.get("fastest_lap_time"),
            fastest_lap_speed: row.get("fastest_lap_speed"),
        })
        .collect())
}

pub async fn qualifying_results(pool: &SqlitePool, race_id: &str) -> Result<Vec<QualifyingResultRow>> {
    let rows = sqlx::query(
        r#"
        SELECT q.driver_id, d.code AS driver_code, d.forename, d.surname,
               q.constructor_id, k.name AS constructor_name, q.number, q.position,
               q.q1, q.q2, q.q3
        FROM qualifying_results q
        JOIN drivers d ON d.driver_id = q.driver_id
        JOIN constructors k ON k.constructor_id = q.constructor_id
        WHERE q.race_id = ?
        ORDER BY q.position IS NULL, q.position, d.surname
        "#,
    )
    .bind(race_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| QualifyingResultRow {
            driver_id: row.get("driver_id"),
            driver_code: row.get("driver_code"),
            forename: row.get("forename"),
            surname: row.get("surname"),
            constructor_id: row.get("constructor_id"),
            constructor_name: row.get("constructor_name"),
            number: row.get("number"),
            position: row.get("position"),
            q1: row.get("q1"),
            q2: row.get("q2"),
            q3: row.get("q3"),
        })
        .collect())
}
