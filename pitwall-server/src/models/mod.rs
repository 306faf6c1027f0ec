//! Typed documents persisted as JSON

pub mod lineup;

pub use lineup::{ConstructorLineupDocument, DriverLineupDocument, LineupDriver, LineupTeam};
