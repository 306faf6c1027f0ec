//! Race persistence
//!
//! A race is keyed by `(season, round)`. Upserting a race also upserts its circuit and
//! ensures the season row exists, all in one transaction.

use chrono::NaiveDate;
use pitwall_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use super::circuits::upsert_circuit;
use crate::sources::RaceRecord;

const RACE_SELECT: &str = r#"
    SELECT r.id, r.season, r.round, r.name, r.circuit_id, c.name AS circuit_name,
           c.locality, c.country, r.date, r.time, r.qualifying_date, r.qualifying_time,
           r.sprint_date, r.sprint_time, r.url
    FROM races r
    LEFT JOIN circuits c ON c.circuit_id = r.circuit_id
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub id: String,
    pub season: i32,
    pub round: i32,
    pub name: String,
    pub circuit_id: String,
    pub circuit_name: Option<String>,
    pub locality: Option<String>,
    pub country: Option<String>,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub qualifying_date: Option<NaiveDate>,
    pub qualifying_time: Option<String>,
    pub sprint_date: Option<NaiveDate>,
    pub sprint_time: Option<String>,
    pub url: Option<String>,
}

impl Race {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            season: row.get("season"),
            round: row.get("round"),
            name: row.get("name"),
            circuit_id: row.get("circuit_id"),
            circuit_name: row.get("circuit_name"),
            locality: row.get("locality"),
            country: row.get("country"),
            date: row.get("date"),
            time: row.get("time"),
            qualifying_date: row.get("qualifying_date"),
            qualifying_time: row.get("qualifying_time"),
            sprint_date: row.get("sprint_date"),
            sprint_time: row.get("sprint_time"),
            url: row.get("url"),
        }
    }
}

/// Ensure the `seasons` row for `year` exists
pub async fn ensure_season<'e, E>(executor: E, year: i32) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO seasons (year) VALUES (?) ON CONFLICT(year) DO NOTHING")
        .bind(year)
        .execute(executor)
        .await?;
    Ok(())
}

/// Create or update the race `(season, record.round)`; returns the race's surrogate id
pub async fn upsert_race(pool: &SqlitePool, record: &RaceRecord, season: i32) -> Result<String> {
    record.validate()?;
    let date = record
        .date
        .ok_or_else(|| Error::InvalidInput(format!("race {} has no date", record.name)))?;

    let mut tx = pool.begin().await?;

    upsert_circuit(&mut *tx, &record.circuit).await?;
    ensure_season(&mut *tx, season).await?;

    let race_id: String = sqlx::query_scalar(
        r#"
        INSERT INTO races (
            id, season, round, name, circuit_id, date, time, qualifying_date,
            qualifying_time, sprint_date, sprint_time, url, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(season, round) DO UPDATE SET
            name = ?4,
            circuit_id = ?5,
            date = ?6,
            time = COALESCE(?7, races.time),
            qualifying_date = COALESCE(?8, races.qualifying_date),
            qualifying_time = COALESCE(?9, races.qualifying_time),
            sprint_date = COALESCE(?10, races.sprint_date),
            sprint_time = COALESCE(?11, races.sprint_time),
            url = COALESCE(?12, races.url),
            updated_at = CURRENT_TIMESTAMP
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(season)
    .bind(record.round)
    .bind(record.name.trim())
    .bind(record.circuit.circuit_id.trim())
    .bind(date)
    .bind(&record.time)
    .bind(record.qualifying_date)
    .bind(&record.qualifying_time)
    .bind(record.sprint_date)
    .bind(&record.sprint_time)
    .bind(&record.url)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(race_id)
}

pub async fn find_race(pool: &SqlitePool, race_id: &str) -> Result<Option<Race>> {
    let row = sqlx::query(&format!("{} WHERE r.id = ?", RACE_SELECT))
        .bind(race_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(Race::from_row))
}

pub async fn find_race_by_round(pool: &SqlitePool, season: i32, round: i32) -> Result<Option<Race>> {
    let row = sqlx::query(&format!("{} WHERE r.season = ? AND r.round = ?", RACE_SELECT))
        .bind(season)
        .bind(round)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(Race::from_row))
}

/// Paged listing; one season in round order, or every season newest first
pub async fn list_races(
    pool: &SqlitePool,
    season: Option<i32>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Race>, i64)> {
    let rows = sqlx::query(&format!(
        "{} WHERE (?1 IS NULL OR r.season = ?1) ORDER BY r.season DESC, r.round LIMIT ?2 OFFSET ?3",
        RACE_SELECT
    ))
    .bind(season)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM races WHERE (?1 IS NULL OR season = ?1)")
        .bind(season)
        .fetch_one(pool)
        .await?;

    Ok((rows.iter().map(Race::from_row).collect(), total))
}

/// Every race held at a circuit, newest first
pub async fn list_races_at_circuit(pool: &SqlitePool, circuit_id: &str) -> Result<Vec<Race>> {
    let rows = sqlx::query(&format!(
        "{} WHERE r.circuit_id = ? ORDER BY r.season DESC, r.round",
        RACE_SELECT
    ))
    .bind(circuit_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(Race::from_row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::circuits::find_circuit;
    use crate::db::test_support::{race, test_pool};

    #[tokio::test]
    async fn test_upsert_creates_circuit_season_and_race() {
        let pool = test_pool().await;
        let id = upsert_race(&pool, &race(2024, 1), 2024).await.unwrap();

        let stored = find_race(&pool, &id).await.unwrap().unwrap();
        assert_eq!(stored.round, 1);
        assert_eq!(stored.circuit_name.as_deref(), Some("Circuit 1"));
        assert!(find_circuit(&pool, "circuit_1").await.unwrap().is_some());

        let seasons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM seasons WHERE year = 2024")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(seasons, 1);
    }

    #[tokio::test]
    async fn test_resync_keeps_surrogate_id() {
        let pool = test_pool().await;
        let first = upsert_race(&pool, &race(2024, 3), 2024).await.unwrap();

        let renamed = RaceRecord {
            name: "Australian Grand Prix".to_string(),
            ..race(2024, 3)
        };
        let second = upsert_race(&pool, &renamed, 2024).await.unwrap();

        assert_eq!(first, second);
        let (all, total) = list_races(&pool, Some(2024), 100, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(all[0].name, "Australian Grand Prix");
    }

    #[tokio::test]
    async fn test_race_without_name_is_rejected() {
        let pool = test_pool().await;
        let nameless = RaceRecord {
            name: String::new(),
            ..race(2024, 2)
        };
        assert!(upsert_race(&pool, &nameless, 2024).await.unwrap_err().is_validation());
        assert!(find_race_by_round(&pool, 2024, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_orders_by_round_within_season() {
        let pool = test_pool().await;
        for round in [3, 1, 2] {
            upsert_race(&pool, &race(2025, round), 2025).await.unwrap();
        }
        upsert_race(&pool, &race(2024, 1), 2024).await.unwrap();

        let (races, total) = list_races(&pool, Some(2025), 100, 0).await.unwrap();
        assert_eq!(total, 3);
        let rounds: Vec<_> = races.iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![1, 2, 3]);

        let (all, _) = list_races(&pool, None, 100, 0).await.unwrap();
        assert_eq!(all.first().map(|r| r.season), Some(2025));
        assert_eq!(all.last().map(|r| r.season), Some(2024));
    }
}
