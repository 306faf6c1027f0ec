//! Historical results provider (Ergast-compatible API)
//!
//! Responses are wrapped in an `MRData` envelope whose numeric fields are strings.
//! Collections are paginated with `limit`/`offset`; pages are fetched until
//! `offset >= total`.

use async_trait::async_trait;
use pitwall_common::config::SourceSettings;
use pitwall_common::IdentifierOverrides;
use serde::Deserialize;
use std::sync::Arc;

use super::records::{
    non_empty, parse_date, parse_float, parse_int, parse_permanent_number, parse_position,
};
use super::{
    build_http_client, get_json, CircuitRecord, ConstructorRecord, DataSource, DriverRecord,
    QualifyingRecord, RaceRecord, RateLimiter, ResultRecord, SourceError,
};

const SOURCE_NAME: &str = "historical";
/// Largest page the provider serves
const PAGE_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

#[derive(Debug, Default, Deserialize)]
struct MrData {
    #[serde(default)]
    total: Option<String>,
    #[serde(rename = "RaceTable", default)]
    race_table: Option<RaceTable>,
    #[serde(rename = "DriverTable", default)]
    driver_table: Option<DriverTable>,
    #[serde(rename = "ConstructorTable", default)]
    constructor_table: Option<ConstructorTable>,
    #[serde(rename = "CircuitTable", default)]
    circuit_table: Option<CircuitTable>,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<ErgastRace>,
}

#[derive(Debug, Deserialize)]
struct DriverTable {
    #[serde(rename = "Drivers", default)]
    drivers: Vec<ErgastDriver>,
}

#[derive(Debug, Deserialize)]
struct ConstructorTable {
    #[serde(rename = "Constructors", default)]
    constructors: Vec<ErgastConstructor>,
}

#[derive(Debug, Deserialize)]
struct CircuitTable {
    #[serde(rename = "Circuits", default)]
    circuits: Vec<ErgastCircuit>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastDriver {
    driver_id: String,
    permanent_number: Option<String>,
    code: Option<String>,
    url: Option<String>,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    date_of_birth: Option<String>,
    nationality: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastConstructor {
    constructor_id: String,
    url: Option<String>,
    #[serde(default)]
    name: String,
    nationality: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastCircuit {
    circuit_id: String,
    url: Option<String>,
    #[serde(default)]
    circuit_name: String,
    #[serde(rename = "Location", default)]
    location: Option<ErgastLocation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErgastLocation {
    lat: Option<String>,
    long: Option<String>,
    alt: Option<String>,
    locality: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct SessionTime {
    date: Option<String>,
    time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastRace {
    season: String,
    round: String,
    url: Option<String>,
    #[serde(default)]
    race_name: String,
    #[serde(rename = "Circuit")]
    circuit: ErgastCircuit,
    date: Option<String>,
    time: Option<String>,
    #[serde(rename = "Qualifying")]
    qualifying: Option<SessionTime>,
    #[serde(rename = "Sprint")]
    sprint: Option<SessionTime>,
    #[serde(rename = "Results", default)]
    results: Vec<ErgastResult>,
    #[serde(rename = "QualifyingResults", default)]
    qualifying_results: Vec<ErgastQualifying>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastResult {
    number: Option<String>,
    position: Option<String>,
    position_text: Option<String>,
    points: Option<String>,
    #[serde(rename = "Driver")]
    driver: ErgastDriver,
    #[serde(rename = "Constructor")]
    constructor: ErgastConstructor,
    grid: Option<String>,
    laps: Option<String>,
    status: Option<String>,
    #[serde(rename = "Time")]
    time: Option<ResultTime>,
    #[serde(rename = "FastestLap")]
    fastest_lap: Option<FastestLap>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResultTime {
    millis: Option<String>,
    time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FastestLap {
    rank: Option<String>,
    lap: Option<String>,
    #[serde(rename = "Time")]
    time: Option<ResultTime>,
    #[serde(rename = "AverageSpeed")]
    average_speed: Option<AverageSpeed>,
}

#[derive(Debug, Clone, Deserialize)]
struct AverageSpeed {
    speed: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErgastQualifying {
    number: Option<String>,
    position: Option<String>,
    #[serde(rename = "Driver")]
    driver: ErgastDriver,
    #[serde(rename = "Constructor")]
    constructor: ErgastConstructor,
    #[serde(rename = "Q1")]
    q1: Option<String>,
    #[serde(rename = "Q2")]
    q2: Option<String>,
    #[serde(rename = "Q3")]
    q3: Option<String>,
}

/// Ergast-compatible historical results adapter
pub struct HistoricalSource {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter,
    overrides: Arc<IdentifierOverrides>,
}

impl HistoricalSource {
    pub fn new(
        settings: &SourceSettings,
        overrides: Arc<IdentifierOverrides>,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            http_client: build_http_client(SOURCE_NAME)?,
            base_url: settings.base_url.clone(),
            rate_limiter: RateLimiter::per_second(settings.requests_per_second),
            overrides,
        })
    }

    /// Fetch every page of `path`, handing each page's `MRData` to `collect`
    async fn fetch_all<T, F>(&self, path: &str, mut collect: F) -> Result<Vec<T>, SourceError>
    where
        F: FnMut(MrData) -> Vec<T>,
    {
        let url = format!("{}/{}", self.base_url, path);
        let mut items = Vec::new();
        let mut offset = 0usize;

        loop {
            let query = [
                ("limit", PAGE_LIMIT.to_string()),
                ("offset", offset.to_string()),
            ];
            let envelope: Envelope = self
                .rate_limiter
                .execute(|| get_json(&self.http_client, SOURCE_NAME, &url, &query))
                .await?;

            let total = parse_int(envelope.mr_data.total.as_deref())
                .map(|t| t.max(0) as usize)
                .unwrap_or(0);
            let page = collect(envelope.mr_data);
            let page_len = page.len();
            items.extend(page);

            offset += PAGE_LIMIT;
            if page_len == 0 || offset >= total {
                break;
            }
            tracing::debug!(source = SOURCE_NAME, path, offset, total, "Fetching next page");
        }

        Ok(items)
    }

    async fn fetch_race_table(&self, path: &str) -> Result<Vec<ErgastRace>, SourceError> {
        let races = self
            .fetch_all(path, |data| match data.race_table {
                Some(table) => table.races,
                None => Vec::new(),
            })
            .await?;
        Ok(merge_paged_races(races))
    }

    fn map_driver(&self, driver: &ErgastDriver) -> DriverRecord {
        DriverRecord {
            driver_id: self.overrides.canonical_driver_id(&driver.driver_id),
            code: non_empty(driver.code.as_deref()),
            forename: driver.given_name.trim().to_string(),
            surname: driver.family_name.trim().to_string(),
            date_of_birth: parse_date(driver.date_of_birth.as_deref()),
            nationality: non_empty(driver.nationality.as_deref()),
            url: non_empty(driver.url.as_deref()),
            permanent_number: parse_permanent_number(driver.permanent_number.as_deref()),
            ..Default::default()
        }
    }

    fn map_constructor(&self, constructor: &ErgastConstructor) -> ConstructorRecord {
        ConstructorRecord {
            constructor_id: self
                .overrides
                .canonical_constructor_id(&constructor.constructor_id),
            name: constructor.name.trim().to_string(),
            nationality: non_empty(constructor.nationality.as_deref()),
            url: non_empty(constructor.url.as_deref()),
        }
    }

    fn map_race(&self, race: &ErgastRace) -> RaceRecord {
        RaceRecord {
            season: parse_int(Some(race.season.as_str())).unwrap_or(0) as i32,
            round: parse_int(Some(race.round.as_str())).unwrap_or(0) as i32,
            name: race.race_name.trim().to_string(),
            circuit: map_circuit(&race.circuit),
            date: parse_date(race.date.as_deref()),
            time: non_empty(race.time.as_deref()),
            qualifying_date: race
                .qualifying
                .as_ref()
                .and_then(|s| parse_date(s.date.as_deref())),
            qualifying_time: race
                .qualifying
                .as_ref()
                .and_then(|s| non_empty(s.time.as_deref())),
            sprint_date: race
                .sprint
                .as_ref()
                .and_then(|s| parse_date(s.date.as_deref())),
            sprint_time: race.sprint.as_ref().and_then(|s| non_empty(s.time.as_deref())),
            url: non_empty(race.url.as_deref()),
        }
    }

    fn map_result(&self, result: &ErgastResult) -> ResultRecord {
        let fastest = result.fastest_lap.as_ref();
        ResultRecord {
            driver: self.map_driver(&result.driver),
            constructor: self.map_constructor(&result.constructor),
            number: parse_int(result.number.as_deref()),
            position: parse_position(result.position.as_deref()),
            position_text: non_empty(result.position_text.as_deref()),
            points: parse_float(result.points.as_deref()).unwrap_or(0.0),
            grid: parse_int(result.grid.as_deref()),
            laps: parse_int(result.laps.as_deref()),
            status: non_empty(result.status.as_deref()),
            time: result
                .time
                .as_ref()
                .and_then(|t| non_empty(t.time.as_deref())),
            milliseconds: result.time.as_ref().and_then(|t| parse_int(t.millis.as_deref())),
            fastest_lap: fastest.and_then(|f| parse_int(f.lap.as_deref())),
            fastest_lap_rank: fastest.and_then(|f| parse_int(f.rank.as_deref())),
            fastest_lap_time: fastest
                .and_then(|f| f.time.as_ref())
                .and_then(|t| non_empty(t.time.as_deref())),
            fastest_lap_speed: fastest
                .and_then(|f| f.average_speed.as_ref())
                .and_then(|s| parse_float(s.speed.as_deref())),
        }
    }

    fn map_qualifying(&self, result: &ErgastQualifying) -> QualifyingRecord {
        QualifyingRecord {
            driver: self.map_driver(&result.driver),
            constructor: self.map_constructor(&result.constructor),
            number: parse_int(result.number.as_deref()),
            position: parse_position(result.position.as_deref()),
            q1: non_empty(result.q1.as_deref()),
            q2: non_empty(result.q2.as_deref()),
            q3: non_empty(result.q3.as_deref()),
        }
    }
}

fn map_circuit(circuit: &ErgastCircuit) -> CircuitRecord {
    let location = circuit.location.clone().unwrap_or_default();
    CircuitRecord {
        circuit_id: circuit.circuit_id.trim().to_string(),
        name: circuit.circuit_name.trim().to_string(),
        locality: non_empty(location.locality.as_deref()),
        country: non_empty(location.country.as_deref()),
        lat: parse_float(location.lat.as_deref()),
        long: parse_float(location.long.as_deref()),
        altitude: parse_float(location.alt.as_deref()),
        url: non_empty(circuit.url.as_deref()),
    }
}

/// A round split across pages shows up once per page; fold the rows back together
fn merge_paged_races(races: Vec<ErgastRace>) -> Vec<ErgastRace> {
    let mut merged: Vec<ErgastRace> = Vec::with_capacity(races.len());
    for race in races {
        match merged
            .iter_mut()
            .find(|r| r.season == race.season && r.round == race.round)
        {
            Some(existing) => {
                existing.results.extend(race.results);
                existing.qualifying_results.extend(race.qualifying_results);
            }
            None => merged.push(race),
        }
    }
    merged
}

#[async_trait]
impl DataSource for HistoricalSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_races(&self, season: i32) -> Result<Vec<RaceRecord>, SourceError> {
        let races = self.fetch_race_table(&format!("{}.json", season)).await?;
        Ok(races.iter().map(|r| self.map_race(r)).collect())
    }

    async fn fetch_drivers(&self, season: i32) -> Result<Vec<DriverRecord>, SourceError> {
        let drivers = self
            .fetch_all(&format!("{}/drivers.json", season), |data| {
                data.driver_table.map(|t| t.drivers).unwrap_or_default()
            })
            .await?;
        Ok(drivers.iter().map(|d| self.map_driver(d)).collect())
    }

    async fn fetch_constructors(
        &self,
        season: i32,
    ) -> Result<Vec<ConstructorRecord>, SourceError> {
        let constructors = self
            .fetch_all(&format!("{}/constructors.json", season), |data| {
                data.constructor_table
                    .map(|t| t.constructors)
                    .unwrap_or_default()
            })
            .await?;
        Ok(constructors.iter().map(|c| self.map_constructor(c)).collect())
    }

    async fn fetch_circuits(&self) -> Result<Vec<CircuitRecord>, SourceError> {
        let circuits = self
            .fetch_all("circuits.json", |data| {
                data.circuit_table.map(|t| t.circuits).unwrap_or_default()
            })
            .await?;
        Ok(circuits.iter().map(map_circuit).collect())
    }

    async fn fetch_race_results(
        &self,
        season: i32,
        round: i32,
    ) -> Result<Vec<ResultRecord>, SourceError> {
        let races = self
            .fetch_race_table(&format!("{}/{}/results.json", season, round))
            .await?;
        Ok(races
            .iter()
            .flat_map(|race| race.results.iter())
            .map(|r| self.map_result(r))
            .collect())
    }

    async fn fetch_qualifying_results(
        &self,
        season: i32,
        round: i32,
    ) -> Result<Vec<QualifyingRecord>, SourceError> {
        let races = self
            .fetch_race_table(&format!("{}/{}/qualifying.json", season, round))
            .await?;
        Ok(races
            .iter()
            .flat_map(|race| race.qualifying_results.iter())
            .map(|q| self.map_qualifying(q))
            .collect())
    }
}
