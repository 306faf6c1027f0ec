//! Database initialization
//!
//! Opens (or creates) the SQLite database and creates every table idempotently.
//! Natural keys carry UNIQUE constraints so that sync upserts can use
//! `INSERT .. ON CONFLICT(<natural key>) DO UPDATE`.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets readers proceed while a sync transaction replaces a race's results
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// A `:memory:` database exists per connection, so the pool is capped at one.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_drivers_table(pool).await?;
    create_constructors_table(pool).await?;
    create_circuits_table(pool).await?;
    create_seasons_table(pool).await?;
    create_races_table(pool).await?;
    create_race_results_table(pool).await?;
    create_qualifying_results_table(pool).await?;
    create_lineup_tables(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn create_drivers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS drivers (
            id TEXT PRIMARY KEY,
            driver_id TEXT NOT NULL UNIQUE,
            code TEXT,
            forename TEXT NOT NULL,
            surname TEXT NOT NULL,
            date_of_birth TEXT,
            nationality TEXT NOT NULL DEFAULT '',
            url TEXT,
            permanent_number INTEGER CHECK (permanent_number IS NULL OR permanent_number BETWEEN 1 AND 99),
            current_team TEXT,
            is_active INTEGER NOT NULL DEFAULT 0,
            driver_championships INTEGER NOT NULL DEFAULT 0 CHECK (driver_championships >= 0),
            constructor_championships INTEGER NOT NULL DEFAULT 0 CHECK (constructor_championships >= 0),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_drivers_active ON drivers(is_active)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_constructors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS constructors (
            id TEXT PRIMARY KEY,
            constructor_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            nationality TEXT NOT NULL DEFAULT '',
            url TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_circuits_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS circuits (
            id TEXT PRIMARY KEY,
            circuit_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            locality TEXT NOT NULL DEFAULT '',
            country TEXT NOT NULL DEFAULT '',
            lat REAL,
            long REAL,
            altitude REAL,
            url TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_seasons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS seasons (
            year INTEGER PRIMARY KEY,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_races_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS races (
            id TEXT PRIMARY KEY,
            season INTEGER NOT NULL REFERENCES seasons(year),
            round INTEGER NOT NULL,
            name TEXT NOT NULL,
            circuit_id TEXT NOT NULL REFERENCES circuits(circuit_id),
            date TEXT NOT NULL,
            time TEXT,
            qualifying_date TEXT,
            qualifying_time TEXT,
            sprint_date TEXT,
            sprint_time TEXT,
            url TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(season, round)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_races_circuit ON races(circuit_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_race_results_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS race_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_id TEXT NOT NULL REFERENCES races(id) ON DELETE CASCADE,
            driver_id TEXT NOT NULL REFERENCES drivers(driver_id),
            constructor_id TEXT NOT NULL REFERENCES constructors(constructor_id),
            number INTEGER,
            position INTEGER,
            position_text TEXT,
            points REAL NOT NULL DEFAULT 0,
            grid INTEGER,
            laps INTEGER,
            status TEXT NOT NULL DEFAULT '',
            time TEXT,
            milliseconds INTEGER,
            fastest_lap INTEGER,
            fastest_lap_rank INTEGER,
            fastest_lap_time TEXT,
            fastest_lap_speed REAL,
            UNIQUE(race_id, driver_id, constructor_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_race_results_driver ON race_results(driver_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_race_results_constructor ON race_results(constructor_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_qualifying_results_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS qualifying_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_id TEXT NOT NULL REFERENCES races(id) ON DELETE CASCADE,
            driver_id TEXT NOT NULL REFERENCES drivers(driver_id),
            constructor_id TEXT NOT NULL REFERENCES constructors(constructor_id),
            number INTEGER,
            position INTEGER,
            q1 TEXT,
            q2 TEXT,
            q3 TEXT,
            UNIQUE(race_id, driver_id, constructor_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_lineup_tables(pool: &SqlitePool) -> Result<()> {
    // One JSON document per season per lineup type
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS driver_season_lineups (
            season INTEGER PRIMARY KEY,
            lineup TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS constructor_season_lineups (
            season INTEGER PRIMARY KEY,
            constructors TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
