//! Lineup resolver
//!
//! Joins a season's lineup documents against the canonical driver and constructor tables.
//! Driver entries are matched case/format-insensitively on the driver id, then on the id
//! after the driver override table, then on the three-letter code when exactly one driver
//! carries it. Unmatched entries are logged and skipped; emission follows document order.

use pitwall_common::normalize::normalize_key;
use pitwall_common::{IdentifierOverrides, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::db::constructors::{load_all_constructors, Constructor};
use crate::db::drivers::{load_all_drivers, Driver};
use crate::db::lineups::{load_constructor_lineup, load_driver_lineup};
use crate::models::DriverLineupDocument;

/// One lineup entry joined with its canonical driver
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLineupEntry {
    /// Identifier as written in the lineup document
    pub driver_id: String,
    pub driver_number: Option<i64>,
    pub team_name: String,
    pub driver: Driver,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorLineupEntry {
    pub constructor: Constructor,
}

/// Lineup constructor with the lineup drivers racing for it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorWithDrivers {
    pub constructor: Constructor,
    pub drivers: Vec<DriverLineupEntry>,
}

/// Normalized identifier → index into `drivers`
///
/// Driver ids always win; a code is added only when no other driver shares it and it does
/// not collide with an id.
pub fn build_driver_index(drivers: &[Driver]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(drivers.len() * 2);
    for (i, driver) in drivers.iter().enumerate() {
        index.insert(normalize_key(&driver.driver_id), i);
    }

    let mut code_counts: HashMap<String, usize> = HashMap::new();
    for code in drivers.iter().filter_map(|d| d.code.as_deref()) {
        *code_counts.entry(normalize_key(code)).or_default() += 1;
    }

    for (i, driver) in drivers.iter().enumerate() {
        let Some(code) = driver.code.as_deref().map(normalize_key) else {
            continue;
        };
        if code.is_empty() || code_counts.get(&code) != Some(&1) {
            continue;
        }
        index.entry(code).or_insert(i);
    }

    index
}

/// Join a document against `drivers` in document order
pub fn join_driver_lineup(
    season: i32,
    document: &DriverLineupDocument,
    drivers: &[Driver],
    overrides: &IdentifierOverrides,
) -> Vec<DriverLineupEntry> {
    let index = build_driver_index(drivers);
    let mut entries = Vec::with_capacity(document.driver_count());

    for team in &document.teams {
        for entry in &team.drivers {
            let hit = index.get(&normalize_key(&entry.driver_id)).or_else(|| {
                index.get(&normalize_key(
                    &overrides.canonical_driver_id(&entry.driver_id),
                ))
            });
            match hit {
                Some(&i) => entries.push(DriverLineupEntry {
                    driver_id: entry.driver_id.clone(),
                    driver_number: entry.driver_number,
                    team_name: team.team_name.clone(),
                    driver: drivers[i].clone(),
                }),
                None => warn!(
                    season,
                    driver_id = %entry.driver_id,
                    team = %team.team_name,
                    "Lineup driver not found in driver table, skipping"
                ),
            }
        }
    }

    entries
}

/// Resolves stored lineup documents into canonical entities
#[derive(Clone)]
pub struct LineupResolver {
    db: SqlitePool,
    overrides: Arc<IdentifierOverrides>,
}

impl LineupResolver {
    pub fn new(db: SqlitePool, overrides: Arc<IdentifierOverrides>) -> Self {
        Self { db, overrides }
    }

    /// `None` when the season has no (valid) driver lineup document
    pub async fn get_driver_lineup(&self, season: i32) -> Result<Option<Vec<DriverLineupEntry>>> {
        let Some(document) = load_driver_lineup(&self.db, season).await? else {
            return Ok(None);
        };
        let drivers = load_all_drivers(&self.db).await?;
        Ok(Some(join_driver_lineup(
            season,
            &document,
            &drivers,
            &self.overrides,
        )))
    }

    /// `None` when the season has no (valid) constructor lineup document
    ///
    /// Result is sorted by constructor name, case-insensitively.
    pub async fn get_constructor_lineup(
        &self,
        season: i32,
    ) -> Result<Option<Vec<ConstructorLineupEntry>>> {
        let Some(document) = load_constructor_lineup(&self.db, season).await? else {
            return Ok(None);
        };

        let constructors = load_all_constructors(&self.db).await?;
        let by_key: HashMap<String, &Constructor> = constructors
            .iter()
            .map(|c| (normalize_key(&c.constructor_id), c))
            .collect();

        let mut entries = Vec::with_capacity(document.ids().len());
        for id in document.ids() {
            let canonical = self.overrides.canonical_constructor_id(id);
            let hit = by_key
                .get(&normalize_key(id))
                .or_else(|| by_key.get(&normalize_key(&canonical)));
            match hit {
                Some(constructor) => {
                    if entries
                        .iter()
                        .any(|e: &ConstructorLineupEntry| e.constructor.id == constructor.id)
                    {
                        continue;
                    }
                    entries.push(ConstructorLineupEntry {
                        constructor: (*constructor).clone(),
                    });
                }
                None => warn!(
                    season,
                    constructor_id = %id,
                    "Lineup constructor not found in constructor table, skipping"
                ),
            }
        }

        entries.sort_by_key(|e| e.constructor.name.to_lowercase());
        Ok(Some(entries))
    }

    /// Constructor lineup with each constructor's lineup drivers attached
    ///
    /// A driver belongs to a constructor when the lineup team name and the constructor
    /// name normalize to the same key, or the team name maps to the constructor id.
    pub async fn get_constructor_lineup_with_drivers(
        &self,
        season: i32,
    ) -> Result<Option<Vec<ConstructorWithDrivers>>> {
        let Some(constructors) = self.get_constructor_lineup(season).await? else {
            return Ok(None);
        };
        let drivers = self.get_driver_lineup(season).await?.unwrap_or_default();

        Ok(Some(
            constructors
                .into_iter()
                .map(|entry| {
                    let name_key = normalize_key(&entry.constructor.name);
                    let members = drivers
                        .iter()
                        .filter(|d| {
                            normalize_key(&d.team_name) == name_key
                                || self.overrides.canonical_constructor_id(&d.team_name)
                                    == entry.constructor.constructor_id
                        })
                        .cloned()
                        .collect();
                    ConstructorWithDrivers {
                        constructor: entry.constructor,
                        drivers: members,
                    }
                })
                .collect(),
        ))
    }
}
