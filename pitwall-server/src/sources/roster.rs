//! Current-season roster provider (f1api.dev-compatible API)
//!
//! Serves `drivers` and `teams` arrays only: `api/current/...` for the running season,
//! `api/{year}/...` otherwise. Race schedules, circuits and results are not offered.

use async_trait::async_trait;
use pitwall_common::config::SourceSettings;
use pitwall_common::IdentifierOverrides;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::records::{non_empty, parse_date};
use crate::utils::SeasonClock;
use super::{
    build_http_client, get_json, CircuitRecord, ConstructorRecord, DataSource, DriverRecord,
    QualifyingRecord, RaceRecord, RateLimiter, ResultRecord, SourceError,
};

const SOURCE_NAME: &str = "roster";

#[derive(Debug, Deserialize)]
struct DriversResponse {
    #[serde(default)]
    drivers: Option<Vec<RosterDriver>>,
}

#[derive(Debug, Deserialize)]
struct TeamsResponse {
    #[serde(default)]
    teams: Option<Vec<RosterTeam>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterDriver {
    driver_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    surname: String,
    nationality: Option<String>,
    birthday: Option<String>,
    /// Number or numeric string, sometimes null
    #[serde(default)]
    number: Value,
    short_name: Option<String>,
    url: Option<String>,
    team_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterTeam {
    team_id: String,
    #[serde(default)]
    team_name: String,
    team_nationality: Option<String>,
    url: Option<String>,
}

/// f1api.dev-compatible roster adapter
pub struct RosterSource {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter,
    overrides: Arc<IdentifierOverrides>,
    clock: SeasonClock,
}

impl RosterSource {
    pub fn new(
        settings: &SourceSettings,
        overrides: Arc<IdentifierOverrides>,
        clock: SeasonClock,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: build_http_client(SOURCE_NAME)?,
            base_url: settings.base_url.clone(),
            rate_limiter: RateLimiter::per_second(settings.requests_per_second),
            overrides,
            clock,
        })
    }

    fn current_season(&self) -> i32 {
        self.clock.current_year()
    }

    fn season_url(&self, season: i32, collection: &str) -> String {
        if season == self.current_season() {
            format!("{}/api/current/{}", self.base_url, collection)
        } else {
            format!("{}/api/{}/{}", self.base_url, season, collection)
        }
    }

    fn map_driver(&self, driver: &RosterDriver, season: i32) -> DriverRecord {
        let driver_id = if driver.driver_id.trim().is_empty() {
            self.overrides
                .driver_id_from_name(&driver.name, &driver.surname)
        } else {
            self.overrides.canonical_driver_id(&driver.driver_id)
        };

        DriverRecord {
            driver_id,
            code: non_empty(driver.short_name.as_deref()),
            forename: driver.name.trim().to_string(),
            surname: driver.surname.trim().to_string(),
            date_of_birth: parse_date(driver.birthday.as_deref()),
            nationality: non_empty(driver.nationality.as_deref()),
            url: non_empty(driver.url.as_deref()),
            permanent_number: number_field(&driver.number).filter(|n| (1..=99).contains(n)),
            current_team: driver
                .team_id
                .as_deref()
                .and_then(|t| non_empty(Some(t)))
                .map(|t| self.overrides.team_display_name(&t)),
            is_active: Some(season >= self.current_season()),
            driver_championships: None,
            constructor_championships: None,
        }
    }

    fn map_team(&self, team: &RosterTeam) -> ConstructorRecord {
        ConstructorRecord {
            constructor_id: self.overrides.canonical_constructor_id(&team.team_id),
            name: team.team_name.trim().to_string(),
            nationality: non_empty(team.team_nationality.as_deref()),
            url: non_empty(team.url.as_deref()),
        }
    }
}

fn number_field(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl DataSource for RosterSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_races(&self, _season: i32) -> Result<Vec<RaceRecord>, SourceError> {
        Err(SourceError::Unsupported(SOURCE_NAME.to_string(), "races"))
    }

    async fn fetch_drivers(&self, season: i32) -> Result<Vec<DriverRecord>, SourceError> {
        let url = self.season_url(season, "drivers");
        let response: DriversResponse = self
            .rate_limiter
            .execute(|| get_json(&self.http_client, SOURCE_NAME, &url, &[]))
            .await?;

        Ok(response
            .drivers
            .unwrap_or_default()
            .iter()
            .map(|d| self.map_driver(d, season))
            .collect())
    }

    async fn fetch_constructors(
        &self,
        season: i32,
    ) -> Result<Vec<ConstructorRecord>, SourceError> {
        let url = self.season_url(season, "teams");
        let response: TeamsResponse = self
            .rate_limiter
            .execute(|| get_json(&self.http_client, SOURCE_NAME, &url, &[]))
            .await?;

        Ok(response
            .teams
            .unwrap_or_default()
            .iter()
            .map(|t| self.map_team(t))
            .collect())
    }

    async fn fetch_circuits(&self) -> Result<Vec<CircuitRecord>, SourceError> {
        Err(SourceError::Unsupported(SOURCE_NAME.to_string(), "circuits"))
    }

    async fn fetch_race_results(
        &self,
        _season: i32,
        _round: i32,
    ) -> Result<Vec<ResultRecord>, SourceError> {
        Err(SourceError::Unsupported(SOURCE_NAME.to_string(), "race results"))
    }

    async fn fetch_qualifying_results(
        &self,
        _season: i32,
        _round: i32,
    ) -> Result<Vec<QualifyingRecord>, SourceError> {
        Err(SourceError::Unsupported(
            SOURCE_NAME.to_string(),
            "qualifying results",
        ))
    }
}
