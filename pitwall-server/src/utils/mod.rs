//! Utility helpers

pub mod retry;
pub mod season;

pub use season::SeasonClock;
