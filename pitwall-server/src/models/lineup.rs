//! Season lineup documents
//!
//! Stored one row per season per lineup type. The driver document nests drivers under
//! teams; the constructor document is a flat array of constructor ids. Both are validated
//! with serde on the way in and out of the database.

use pitwall_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// `{"teams":[{"teamName":..,"drivers":[{"driverId":..,"driverNumber":..}]}]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverLineupDocument {
    pub teams: Vec<LineupTeam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupTeam {
    pub team_name: String,
    #[serde(default)]
    pub drivers: Vec<LineupDriver>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupDriver {
    /// Provider driver identifier (often a three-letter code)
    pub driver_id: String,
    #[serde(default)]
    pub driver_number: Option<i64>,
}

impl DriverLineupDocument {
    pub fn parse(raw: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(raw)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<()> {
        for team in &self.teams {
            if team.team_name.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "lineup team with empty name".to_string(),
                ));
            }
            if team.drivers.iter().any(|d| d.driver_id.trim().is_empty()) {
                return Err(Error::InvalidInput(format!(
                    "lineup team '{}' has a driver with an empty id",
                    team.team_name
                )));
            }
        }
        Ok(())
    }

    /// Number of driver entries across all teams
    pub fn driver_count(&self) -> usize {
        self.teams.iter().map(|t| t.drivers.len()).sum()
    }
}

/// `["mclaren","ferrari",...]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstructorLineupDocument(pub Vec<String>);

impl ConstructorLineupDocument {
    pub fn parse(raw: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(raw)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<()> {
        if self.0.iter().any(|id| id.trim().is_empty()) {
            return Err(Error::InvalidInput(
                "constructor lineup contains an empty id".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_driver_document() {
        let raw = r#"{"teams":[{"teamName":"Ferrari","drivers":[
            {"driverId":"lec","driverNumber":16},{"driverId":"ham","driverNumber":44}]}]}"#;
        let doc = DriverLineupDocument::parse(raw).unwrap();
        assert_eq!(doc.teams[0].team_name, "Ferrari");
        assert_eq!(doc.teams[0].drivers[1].driver_id, "ham");
        assert_eq!(doc.driver_count(), 2);
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(DriverLineupDocument::parse(r#"["ham","lec"]"#).is_err());
        assert!(DriverLineupDocument::parse(r#"{"teams":[{"teamName":"","drivers":[]}]}"#)
            .unwrap_err()
            .is_validation());
        assert!(ConstructorLineupDocument::parse(r#"{"teams":[]}"#).is_err());
        assert!(ConstructorLineupDocument::parse(r#"["ferrari",""]"#).is_err());
    }

    #[test]
    fn test_constructor_document_is_flat_array() {
        let doc = ConstructorLineupDocument(vec!["mclaren".to_string(), "ferrari".to_string()]);
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"["mclaren","ferrari"]"#);
    }
}
