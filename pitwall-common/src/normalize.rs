//! Identifier normalization
//!
//! Providers spell the same driver or team differently (`rb` / `Racing Bulls` /
//! `Visa Cash App RB`). Two forms are produced here:
//!
//! - [`normalize_key`]: a join token (lowercase, alphanumerics only) used for
//!   case/format-insensitive matching.
//! - [`slugify`]: the storage form of a natural key (`red_bull`) when no override exists.
//!
//! Known asymmetries live in [`IdentifierOverrides`], which is plain data: the built-in
//! tables below plus any `[overrides.*]` entries from the TOML config.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Provider spelling → canonical constructor slug
const DEFAULT_CONSTRUCTOR_OVERRIDES: &[(&str, &str)] = &[
    ("rb", "racing_bulls"),
    ("rb_f1_team", "racing_bulls"),
    ("visa_cash_app_rb", "racing_bulls"),
    ("visa_cash_app_rb_f1_team", "racing_bulls"),
    ("kick_sauber", "sauber"),
    ("stake_f1_team", "sauber"),
    ("sauber_f1_team", "sauber"),
    ("haas_f1_team", "haas"),
    ("red_bull_racing", "red_bull"),
    ("red_bull_racing_rbpt", "red_bull"),
    ("red_bull_racing_honda_rbpt", "red_bull"),
    ("alpine_f1_team", "alpine"),
    ("mclaren_f1_team", "mclaren"),
    ("mercedes_amg", "mercedes"),
    ("mercedes_amg_petronas", "mercedes"),
    ("scuderia_ferrari", "ferrari"),
    ("williams_racing", "williams"),
    ("aston_martin_aramco", "aston_martin"),
    ("aston_martin_f1_team", "aston_martin"),
    ("cadillac_f1_team", "cadillac"),
    ("audi_f1_team", "audi"),
];

/// Provider spelling → canonical driver slug (historical provider ids)
const DEFAULT_DRIVER_OVERRIDES: &[(&str, &str)] = &[
    ("lewis_hamilton", "hamilton"),
    ("fernando_alonso", "alonso"),
    ("charles_leclerc", "leclerc"),
    ("carlos_sainz", "sainz"),
    ("lando_norris", "norris"),
    ("george_russell", "russell"),
    ("oscar_piastri", "piastri"),
    ("sergio_perez", "perez"),
    ("kimi_antonelli", "antonelli"),
    ("andrea_kimi_antonelli", "antonelli"),
];

/// Team id or spelling → display name stored in `drivers.current_team`
const DEFAULT_TEAM_NAMES: &[(&str, &str)] = &[
    ("mclaren", "McLaren"),
    ("mercedes", "Mercedes"),
    ("red_bull", "Red Bull"),
    ("ferrari", "Ferrari"),
    ("williams", "Williams"),
    ("rb", "Racing Bulls"),
    ("racing_bulls", "Racing Bulls"),
    ("aston_martin", "Aston Martin"),
    ("haas", "Haas F1 Team"),
    ("sauber", "Sauber"),
    ("kick_sauber", "Sauber"),
    ("alpine", "Alpine"),
    ("cadillac", "Cadillac"),
    ("audi", "Audi"),
];

/// Join token: lowercase, every non-alphanumeric character removed
///
/// `"Max_Verstappen "` → `"maxverstappen"`, `"HAM"` → `"ham"`
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Storage slug: lowercase, runs of non-alphanumerics collapsed to a single `_`
///
/// `"  Red Bull-Racing "` → `"red_bull_racing"`
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    out
}

/// Override tables as they appear in the `[overrides]` TOML section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideTables {
    /// Provider driver spelling → canonical driver slug
    #[serde(default)]
    pub drivers: BTreeMap<String, String>,
    /// Provider constructor spelling → canonical constructor slug
    #[serde(default)]
    pub constructors: BTreeMap<String, String>,
    /// Team id or spelling → display name
    #[serde(default)]
    pub team_names: BTreeMap<String, String>,
}

/// Lookup tables mapping provider spellings to canonical identifiers
///
/// All keys are stored as [`normalize_key`] tokens, so `"Kick Sauber"`, `"kick_sauber"`
/// and `"KICK-SAUBER"` hit the same entry.
#[derive(Debug, Clone, Default)]
pub struct IdentifierOverrides {
    drivers: HashMap<String, String>,
    constructors: HashMap<String, String>,
    team_names: HashMap<String, String>,
}

impl IdentifierOverrides {
    /// Empty tables (no built-ins)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in tables covering the known provider asymmetries
    pub fn with_defaults() -> Self {
        let mut overrides = Self::empty();
        for (from, to) in DEFAULT_DRIVER_OVERRIDES {
            overrides.add_driver(from, to);
        }
        for (from, to) in DEFAULT_CONSTRUCTOR_OVERRIDES {
            overrides.add_constructor(from, to);
        }
        for (from, to) in DEFAULT_TEAM_NAMES {
            overrides.add_team_name(from, to);
        }
        overrides
    }

    /// Built-ins plus configured entries (configured entries win)
    pub fn from_tables(tables: &OverrideTables) -> Self {
        let mut overrides = Self::with_defaults();
        overrides.merge(tables);
        overrides
    }

    /// Append configured entries, replacing any existing entry for the same key
    pub fn merge(&mut self, tables: &OverrideTables) {
        for (from, to) in &tables.drivers {
            self.add_driver(from, to);
        }
        for (from, to) in &tables.constructors {
            self.add_constructor(from, to);
        }
        for (from, to) in &tables.team_names {
            self.add_team_name(from, to);
        }
    }

    pub fn add_driver(&mut self, provider_id: &str, canonical_id: &str) {
        self.drivers
            .insert(normalize_key(provider_id), canonical_id.trim().to_string());
    }

    pub fn add_constructor(&mut self, provider_id: &str, canonical_id: &str) {
        self.constructors
            .insert(normalize_key(provider_id), canonical_id.trim().to_string());
    }

    pub fn add_team_name(&mut self, provider_id: &str, display_name: &str) {
        self.team_names
            .insert(normalize_key(provider_id), display_name.trim().to_string());
    }

    /// Canonical driver slug: override if known, else `slugify(raw)`
    pub fn canonical_driver_id(&self, raw: &str) -> String {
        self.drivers
            .get(&normalize_key(raw))
            .cloned()
            .unwrap_or_else(|| slugify(raw))
    }

    /// Canonical driver slug derived from a human name (`forename_surname`)
    pub fn driver_id_from_name(&self, forename: &str, surname: &str) -> String {
        self.canonical_driver_id(&format!("{}_{}", forename, surname))
    }

    /// Canonical constructor slug: override if known, else `slugify(raw)`
    pub fn canonical_constructor_id(&self, raw: &str) -> String {
        self.constructors
            .get(&normalize_key(raw))
            .cloned()
            .unwrap_or_else(|| slugify(raw))
    }

    /// Display name for a team id/spelling, falling back to the trimmed input
    pub fn team_display_name(&self, raw: &str) -> String {
        self.team_names
            .get(&normalize_key(raw))
            .cloned()
            .unwrap_or_else(|| raw.trim().to_string())
    }

    /// Number of entries across all tables
    pub fn len(&self) -> usize {
        self.drivers.len() + self.constructors.len() + self.team_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
