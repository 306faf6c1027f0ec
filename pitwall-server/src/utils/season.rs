//! Running-season clock
//!
//! One value is handed to the roster source and to `AppState`, so "is this season active"
//! and "is this season in the future" are always answered against the same year.

use chrono::{Datelike, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonClock {
    pinned: Option<i32>,
}

impl SeasonClock {
    /// Reads the calendar year on every call
    pub fn system() -> Self {
        Self::default()
    }

    /// Always reports `year`
    pub fn pinned(year: i32) -> Self {
        Self { pinned: Some(year) }
    }

    pub fn current_year(&self) -> i32 {
        self.pinned.unwrap_or_else(|| Utc::now().year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_clock_ignores_calendar() {
        assert_eq!(SeasonClock::pinned(2031).current_year(), 2031);
    }

    #[test]
    fn test_system_clock_follows_calendar() {
        assert_eq!(SeasonClock::system().current_year(), Utc::now().year());
    }
}
