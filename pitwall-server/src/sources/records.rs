//! Canonical records produced by source adapters
//!
//! Adapters map provider payloads into these shapes; the upsert layer consumes them.
//! Optional fields left as `None` are not touched on update.

use chrono::NaiveDate;
use pitwall_common::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverRecord {
    /// Canonical driver slug (natural key)
    pub driver_id: String,
    pub code: Option<String>,
    pub forename: String,
    pub surname: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub url: Option<String>,
    /// Already range-checked (1-99) by [`parse_permanent_number`]
    pub permanent_number: Option<i64>,
    /// Team display name
    pub current_team: Option<String>,
    pub is_active: Option<bool>,
    pub driver_championships: Option<i64>,
    pub constructor_championships: Option<i64>,
}

impl DriverRecord {
    pub fn validate(&self) -> Result<()> {
        if self.driver_id.trim().is_empty() {
            return Err(Error::InvalidInput("driver id is empty".to_string()));
        }
        if self.surname.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "driver '{}' has no surname",
                self.driver_id
            )));
        }
        if let Some(n) = self.permanent_number {
            if !(1..=99).contains(&n) {
                return Err(Error::InvalidInput(format!(
                    "driver '{}' permanent number {} outside 1-99",
                    self.driver_id, n
                )));
            }
        }
        for (field, value) in [
            ("driver_championships", self.driver_championships),
            ("constructor_championships", self.constructor_championships),
        ] {
            if matches!(value, Some(v) if v < 0) {
                return Err(Error::InvalidInput(format!(
                    "driver '{}' has negative {}",
                    self.driver_id, field
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstructorRecord {
    /// Canonical constructor slug (natural key)
    pub constructor_id: String,
    pub name: String,
    pub nationality: Option<String>,
    pub url: Option<String>,
}

impl ConstructorRecord {
    pub fn validate(&self) -> Result<()> {
        if self.constructor_id.trim().is_empty() {
            return Err(Error::InvalidInput("constructor id is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "constructor '{}' has no name",
                self.constructor_id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub circuit_id: String,
    pub name: String,
    pub locality: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub altitude: Option<f64>,
    pub url: Option<String>,
}

impl CircuitRecord {
    pub fn validate(&self) -> Result<()> {
        if self.circuit_id.trim().is_empty() {
            return Err(Error::InvalidInput("circuit id is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "circuit '{}' has no name",
                self.circuit_id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceRecord {
    pub season: i32,
    pub round: i32,
    pub name: String,
    pub circuit: CircuitRecord,
    /// Required; `None` only when the provider value was unparseable
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub qualifying_date: Option<NaiveDate>,
    pub qualifying_time: Option<String>,
    pub sprint_date: Option<NaiveDate>,
    pub sprint_time: Option<String>,
    pub url: Option<String>,
}

impl RaceRecord {
    pub fn validate(&self) -> Result<()> {
        if self.round < 1 {
            return Err(Error::InvalidInput(format!(
                "race {} round {} is not a valid round",
                self.season, self.round
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "race {} round {} has no name",
                self.season, self.round
            )));
        }
        if self.date.is_none() {
            return Err(Error::InvalidInput(format!(
                "race {} round {} has no date",
                self.season, self.round
            )));
        }
        self.circuit.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub driver: DriverRecord,
    pub constructor: ConstructorRecord,
    pub number: Option<i64>,
    /// `None` for retired/disqualified/excluded classifications
    pub position: Option<i64>,
    pub position_text: Option<String>,
    pub points: f64,
    pub grid: Option<i64>,
    pub laps: Option<i64>,
    pub status: Option<String>,
    pub time: Option<String>,
    pub milliseconds: Option<i64>,
    pub fastest_lap: Option<i64>,
    pub fastest_lap_rank: Option<i64>,
    pub fastest_lap_time: Option<String>,
    pub fastest_lap_speed: Option<f64>,
}

impl ResultRecord {
    pub fn validate(&self) -> Result<()> {
        self.driver.validate()?;
        self.constructor.validate()?;
        if !self.points.is_finite() || self.points < 0.0 {
            return Err(Error::InvalidInput(format!(
                "result for '{}' has invalid points {}",
                self.driver.driver_id, self.points
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualifyingRecord {
    pub driver: DriverRecord,
    pub constructor: ConstructorRecord,
    pub number: Option<i64>,
    pub position: Option<i64>,
    pub q1: Option<String>,
    pub q2: Option<String>,
    pub q3: Option<String>,
}

impl QualifyingRecord {
    pub fn validate(&self) -> Result<()> {
        self.driver.validate()?;
        self.constructor.validate()
    }
}

// Lenient parsing of provider string fields. Anything unparseable becomes `None`.

/// Trimmed non-empty string
pub fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

pub fn parse_float(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Finishing position; letter classifications (`R`, `D`, `E`, `W`, `F`, `N`) map to `None`
pub fn parse_position(raw: Option<&str>) -> Option<i64> {
    parse_int(raw).filter(|p| *p > 0)
}

/// Permanent car number, `None` outside 1-99
pub fn parse_permanent_number(raw: Option<&str>) -> Option<i64> {
    parse_int(raw).filter(|n| (1..=99).contains(n))
}

/// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS..` or `DD/MM/YYYY`
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains('/') {
        return NaiveDate::parse_from_str(s, "%d/%m/%Y").ok();
    }
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparseable_optional_numbers_become_none() {
        assert_eq!(parse_int(Some("12")), Some(12));
        assert_eq!(parse_int(Some(" 7 ")), Some(7));
        assert_eq!(parse_int(Some("n/a")), None);
        assert_eq!(parse_int(None), None);
        assert_eq!(parse_float(Some("43.7347")), Some(43.7347));
        assert_eq!(parse_float(Some("NaN")), None);
    }

    #[test]
    fn test_letter_positions_are_null() {
        assert_eq!(parse_position(Some("3")), Some(3));
        assert_eq!(parse_position(Some("R")), None);
        assert_eq!(parse_position(Some("D")), None);
        assert_eq!(parse_position(Some("E")), None);
    }

    #[test]
    fn test_permanent_number_range() {
        assert_eq!(parse_permanent_number(Some("44")), Some(44));
        assert_eq!(parse_permanent_number(Some("0")), None);
        assert_eq!(parse_permanent_number(Some("100")), None);
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1999, 11, 13);
        assert_eq!(parse_date(Some("13/11/1999")), expected);
        assert_eq!(parse_date(Some("1999-11-13")), expected);
        assert_eq!(parse_date(Some("1999-11-13T00:00:00Z")), expected);
        assert_eq!(parse_date(Some("31/02/1999")), None);
        assert_eq!(parse_date(Some("")), None);
    }

    #[test]
    fn test_race_without_name_or_date_is_invalid() {
        let mut race = RaceRecord {
            season: 2024,
            round: 1,
            name: "Bahrain Grand Prix".to_string(),
            circuit: CircuitRecord {
                circuit_id: "bahrain".to_string(),
                name: "Bahrain International Circuit".to_string(),
                ..Default::default()
            },
            date: NaiveDate::from_ymd_opt(2024, 3, 2),
            ..Default::default()
        };
        assert!(race.validate().is_ok());

        race.name = "  ".to_string();
        assert!(race.validate().unwrap_err().is_validation());

        race.name = "Bahrain Grand Prix".to_string();
        race.date = None;
        assert!(race.validate().unwrap_err().is_validation());
    }
}
