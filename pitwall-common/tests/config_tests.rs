//! Configuration resolution tests
//!
//! Environment lookups are injected as closures, so nothing here touches the process
//! environment and the tests can run in parallel.

use pitwall_common::config::{
    load_optional_config, load_toml_config, ServiceConfig, TomlConfig, DEFAULT_BIND_ADDRESS,
    DEFAULT_HISTORICAL_BASE_URL, DEFAULT_HISTORICAL_RPS, DEFAULT_ROSTER_RPS,
};
use pitwall_common::{Error, IdentifierOverrides};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_defaults_without_file_or_env() {
    let config = ServiceConfig::resolve(TomlConfig::default(), no_env).unwrap();

    assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
    assert_eq!(config.historical.base_url, DEFAULT_HISTORICAL_BASE_URL);
    assert_eq!(config.historical.requests_per_second, DEFAULT_HISTORICAL_RPS);
    assert_eq!(config.roster.requests_per_second, DEFAULT_ROSTER_RPS);
    assert!(config.sync_on_startup);
    assert_eq!(config.log_level, "info");
    assert!(config.database_path.ends_with("pitwall.db"));
}

#[test]
fn test_toml_values_override_defaults() {
    let toml: TomlConfig = toml::from_str(
        r#"
        database_path = "/var/lib/pitwall/f1.db"
        bind_address = "0.0.0.0:8080"
        sync_on_startup = false

        [historical]
        base_url = "http://ergast.local/f1/"
        requests_per_second = 2

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = ServiceConfig::resolve(toml, no_env).unwrap();
    assert_eq!(config.database_path, PathBuf::from("/var/lib/pitwall/f1.db"));
    assert_eq!(config.bind_address, "0.0.0.0:8080");
    assert!(!config.sync_on_startup);
    // Trailing slash trimmed
    assert_eq!(config.historical.base_url, "http://ergast.local/f1");
    assert_eq!(config.historical.requests_per_second, 2);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_environment_beats_toml() {
    let toml = TomlConfig {
        bind_address: Some("0.0.0.0:8080".to_string()),
        ..Default::default()
    };
    let env = env_from(&[
        ("PITWALL_BIND_ADDRESS", "127.0.0.1:9000"),
        ("PITWALL_ROSTER_RPS", "3"),
        ("PITWALL_CORS_ORIGINS", "http://a.test, http://b.test"),
        ("PITWALL_SYNC_ON_STARTUP", "off"),
    ]);

    let config = ServiceConfig::resolve(toml, env).unwrap();
    assert_eq!(config.bind_address, "127.0.0.1:9000");
    assert_eq!(config.roster.requests_per_second, 3);
    assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    assert!(!config.sync_on_startup);
}

#[test]
fn test_blank_environment_values_are_ignored() {
    let env = env_from(&[("PITWALL_BIND_ADDRESS", "   ")]);
    let config = ServiceConfig::resolve(TomlConfig::default(), env).unwrap();
    assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
}

#[test]
fn test_invalid_values_are_config_errors() {
    let env = env_from(&[("PITWALL_HISTORICAL_RPS", "fast")]);
    let err = ServiceConfig::resolve(TomlConfig::default(), env).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let env = env_from(&[("PITWALL_SYNC_ON_STARTUP", "maybe")]);
    let err = ServiceConfig::resolve(TomlConfig::default(), env).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let toml = TomlConfig {
        roster: pitwall_common::config::SourceToml {
            base_url: None,
            requests_per_second: Some(0),
        },
        ..Default::default()
    };
    let err = ServiceConfig::resolve(toml, no_env).unwrap_err();
    assert!(err.to_string().contains("roster"));
}

#[test]
fn test_override_tables_from_file_extend_builtins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pitwall.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
[overrides.constructors]
"Visa Cash App Racing Bulls" = "racing_bulls"

[overrides.team_names]
audi = "Audi F1 Team"
"#
    )
    .unwrap();

    let toml = load_toml_config(&path).unwrap();
    let config = ServiceConfig::resolve(toml, no_env).unwrap();
    let overrides = IdentifierOverrides::from_tables(&config.overrides);

    assert_eq!(
        overrides.canonical_constructor_id("visa_cash_app_racing_bulls"),
        "racing_bulls"
    );
    assert_eq!(overrides.team_display_name("audi"), "Audi F1 Team");
    assert_eq!(overrides.canonical_constructor_id("kick_sauber"), "sauber");
}

#[test]
fn test_explicit_config_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let err = load_optional_config(Some(&missing)).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_malformed_toml_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "bind_address = [unterminated").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("Parse"));
}
