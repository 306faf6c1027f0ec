//! Entity upsert layer and read repositories
//!
//! Writes are keyed by natural key (`driver_id`, `constructor_id`, `circuit_id`,
//! `(season, round)`) and use `INSERT .. ON CONFLICT DO UPDATE` with `COALESCE` so that
//! fields missing from the incoming record keep their stored value.

pub mod circuits;
pub mod constructors;
pub mod drivers;
pub mod lineups;
pub mod races;
pub mod results;

pub use circuits::upsert_circuit;
pub use constructors::upsert_constructor;
pub use drivers::upsert_driver;
pub use races::upsert_race;
pub use results::{replace_qualifying_results, replace_race_results};

/// Clamp client pagination to sane bounds
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

pub const DEFAULT_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE_LIMIT: i64 = 1000;
