//! Season-scoped driver and constructor listings
//!
//! Drivers: lineup document → race-result participation → active-flag heuristic (future
//! seasons only) → unfiltered listing. Constructors: lineup document → participation →
//! unfiltered listing. Each step is only used when the previous one produced nothing.

use pitwall_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::debug;

use super::lineup_resolver::LineupResolver;
use crate::db::{constructors, drivers};
use crate::db::constructors::Constructor;
use crate::db::drivers::Driver;

/// Which step of the fallback chain produced a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    Lineup,
    Participation,
    ActiveHeuristic,
    Unfiltered,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriverListing {
    pub source: ListingSource,
    pub drivers: Vec<Driver>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstructorListing {
    pub source: ListingSource,
    pub constructors: Vec<Constructor>,
}

/// Drivers for `season`; `current_year` decides whether the season is in the future
pub async fn list_drivers_for_season(
    pool: &SqlitePool,
    resolver: &LineupResolver,
    season: i32,
    current_year: i32,
) -> Result<DriverListing> {
    if let Some(entries) = resolver.get_driver_lineup(season).await? {
        let mut seen = HashSet::new();
        let lineup: Vec<Driver> = entries
            .into_iter()
            .map(|e| e.driver)
            .filter(|d| seen.insert(d.id.clone()))
            .collect();
        if !lineup.is_empty() {
            return Ok(listing(season, ListingSource::Lineup, lineup));
        }
        debug!(season, "Driver lineup resolved to no drivers, falling back");
    }

    let participants = drivers::list_season_participants(pool, season).await?;
    if !participants.is_empty() {
        return Ok(listing(season, ListingSource::Participation, participants));
    }

    if season > current_year {
        let active = drivers::list_drivers_by_team(pool, true).await?;
        if !active.is_empty() {
            return Ok(listing(season, ListingSource::ActiveHeuristic, active));
        }
    }

    let all = drivers::list_drivers_by_team(pool, false).await?;
    Ok(listing(season, ListingSource::Unfiltered, all))
}

fn listing(season: i32, source: ListingSource, drivers: Vec<Driver>) -> DriverListing {
    debug!(season, ?source, count = drivers.len(), "Driver listing resolved");
    DriverListing { source, drivers }
}

/// Constructors for `season`
pub async fn list_constructors_for_season(
    pool: &SqlitePool,
    resolver: &LineupResolver,
    season: i32,
) -> Result<ConstructorListing> {
    if let Some(entries) = resolver.get_constructor_lineup(season).await? {
        if !entries.is_empty() {
            return Ok(ConstructorListing {
                source: ListingSource::Lineup,
                constructors: entries.into_iter().map(|e| e.constructor).collect(),
            });
        }
    }

    let participants = constructors::list_season_participants(pool, season).await?;
    if !participants.is_empty() {
        return Ok(ConstructorListing {
            source: ListingSource::Participation,
            constructors: participants,
        });
    }

    Ok(ConstructorListing {
        source: ListingSource::Unfiltered,
        constructors: constructors::load_all_constructors(pool).await?,
    })
}
