//! Bootstrap configuration
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary after resolution)
//! 2. Environment variables (`PITWALL_*`)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! The TOML file is optional. Every field in it is optional as well; missing values fall
//! through to the environment and then to defaults.

use crate::normalize::OverrideTables;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3001";
pub const DEFAULT_HISTORICAL_BASE_URL: &str = "https://api.jolpi.ca/ergast/f1";
pub const DEFAULT_ROSTER_BASE_URL: &str = "https://f1api.dev";
pub const DEFAULT_LINEUP_SERVICE_URL: &str = "http://localhost:8000";
pub const DEFAULT_HISTORICAL_RPS: u32 = 4;
pub const DEFAULT_ROSTER_RPS: u32 = 10;

/// TOML file shape
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP listen address (`host:port`)
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Allowed CORS origins
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,

    /// Run the current-season sync when the server starts
    #[serde(default)]
    pub sync_on_startup: Option<bool>,

    /// Historical results provider
    #[serde(default)]
    pub historical: SourceToml,

    /// Current-season roster provider
    #[serde(default)]
    pub roster: SourceToml,

    /// Lineup service (cold-startable sidecar)
    #[serde(default)]
    pub lineup_service: LineupServiceToml,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Provider identifier overrides appended to the built-in tables
    #[serde(default)]
    pub overrides: OverrideTables,
}

/// `[historical]` / `[roster]` tables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SourceToml {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

/// `[lineup_service]` table
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LineupServiceToml {
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// Resolved settings for one upstream provider
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub base_url: String,
    pub requests_per_second: u32,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub cors_origins: Vec<String>,
    pub sync_on_startup: bool,
    pub historical: SourceSettings,
    pub roster: SourceSettings,
    pub lineup_service_url: String,
    pub log_level: String,
    pub overrides: OverrideTables,
}

impl ServiceConfig {
    /// Resolve from a TOML config and the process environment
    pub fn from_toml_and_env(toml: TomlConfig) -> Result<Self> {
        Self::resolve(toml, |key| std::env::var(key).ok())
    }

    /// Resolve from a TOML config and an environment lookup
    pub fn resolve<F>(toml: TomlConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let database_path = env("PITWALL_DATABASE_PATH")
            .map(PathBuf::from)
            .or(toml.database_path)
            .unwrap_or_else(default_database_path);

        let bind_address = env("PITWALL_BIND_ADDRESS")
            .or(toml.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let cors_origins = env("PITWALL_CORS_ORIGINS")
            .map(|raw| split_list(&raw))
            .or(toml.cors_origins)
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        let sync_on_startup = match env("PITWALL_SYNC_ON_STARTUP") {
            Some(raw) => parse_bool("PITWALL_SYNC_ON_STARTUP", &raw)?,
            None => toml.sync_on_startup.unwrap_or(true),
        };

        let historical = resolve_source(
            &env,
            "HISTORICAL",
            toml.historical,
            DEFAULT_HISTORICAL_BASE_URL,
            DEFAULT_HISTORICAL_RPS,
        )?;
        let roster = resolve_source(
            &env,
            "ROSTER",
            toml.roster,
            DEFAULT_ROSTER_BASE_URL,
            DEFAULT_ROSTER_RPS,
        )?;

        let lineup_service_url = env("PITWALL_LINEUP_SERVICE_URL")
            .or(toml.lineup_service.base_url)
            .unwrap_or_else(|| DEFAULT_LINEUP_SERVICE_URL.to_string());

        let log_level = env("PITWALL_LOG_LEVEL")
            .or(toml.logging.level)
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            database_path,
            bind_address,
            cors_origins,
            sync_on_startup,
            historical,
            roster,
            lineup_service_url: trim_url(&lineup_service_url),
            log_level,
            overrides: toml.overrides,
        })
    }
}

fn resolve_source<F>(
    env: &F,
    prefix: &str,
    toml: SourceToml,
    default_url: &str,
    default_rps: u32,
) -> Result<SourceSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let url_key = format!("PITWALL_{}_BASE_URL", prefix);
    let rps_key = format!("PITWALL_{}_RPS", prefix);

    let base_url = env(&url_key)
        .or(toml.base_url)
        .unwrap_or_else(|| default_url.to_string());

    let requests_per_second = match env(&rps_key) {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|e| Error::Config(format!("{} must be an integer: {}", rps_key, e)))?,
        None => toml.requests_per_second.unwrap_or(default_rps),
    };

    if requests_per_second == 0 {
        return Err(Error::Config(format!(
            "{} requests_per_second must be greater than zero",
            prefix.to_lowercase()
        )));
    }

    Ok(SourceSettings {
        base_url: trim_url(&base_url),
        requests_per_second,
    })
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if present
///
/// An explicit path must exist. Without one, the default location is tried and a missing
/// file yields the all-defaults config.
pub fn load_optional_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        info!("Loading config from {}", path.display());
        return load_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        Some(path) => {
            info!(
                "No config file at {} (using environment and defaults)",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory (using environment and defaults)");
            Ok(TomlConfig::default())
        }
    }
}

/// `~/.config/pitwall/pitwall.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pitwall").join("pitwall.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pitwall"))
        .unwrap_or_else(|| PathBuf::from("./pitwall_data"))
        .join("pitwall.db")
}
