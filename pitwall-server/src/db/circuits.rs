//! Circuit persistence

use pitwall_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::sources::CircuitRecord;

const CIRCUIT_COLUMNS: &str =
    "id, circuit_id, name, locality, country, lat, long, altitude, url";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub id: String,
    pub circuit_id: String,
    pub name: String,
    pub locality: String,
    pub country: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub altitude: Option<f64>,
    pub url: Option<String>,
}

impl Circuit {
    fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            circuit_id: row.get("circuit_id"),
            name: row.get("name"),
            locality: row.get("locality"),
            country: row.get("country"),
            lat: row.get("lat"),
            long: row.get("long"),
            altitude: row.get("altitude"),
            url: row.get("url"),
        }
    }
}

/// Create or partially update a circuit keyed by `circuit_id`
pub async fn upsert_circuit<'e, E>(executor: E, record: &CircuitRecord) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    record.validate()?;

    sqlx::query(
        r#"
        INSERT INTO circuits (
            id, circuit_id, name, locality, country, lat, long, altitude, url,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, COALESCE(?4, ''), COALESCE(?5, ''), ?6, ?7, ?8, ?9,
            CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
        )
        ON CONFLICT(circuit_id) DO UPDATE SET
            name = ?3,
            locality = COALESCE(?4, circuits.locality),
            country = COALESCE(?5, circuits.country),
            lat = COALESCE(?6, circuits.lat),
            long = COALESCE(?7, circuits.long),
            altitude = COALESCE(?8, circuits.altitude),
            url = COALESCE(?9, circuits.url),
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(record.circuit_id.trim())
    .bind(record.name.trim())
    .bind(&record.locality)
    .bind(&record.country)
    .bind(record.lat)
    .bind(record.long)
    .bind(record.altitude)
    .bind(&record.url)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn find_circuit(pool: &SqlitePool, circuit_id: &str) -> Result<Option<Circuit>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM circuits WHERE circuit_id = ?",
        CIRCUIT_COLUMNS
    ))
    .bind(circuit_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(Circuit::from_row))
}

/// All circuits sorted by name
pub async fn list_circuits(pool: &SqlitePool) -> Result<Vec<Circuit>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM circuits ORDER BY name COLLATE NOCASE",
        CIRCUIT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(Circuit::from_row).collect())
}
