//! Utility functions for the brent_forecast crate

use chrono::{Duration, NaiveDate};

/// Create `horizon` consecutive calendar dates starting the day after `last`
///
/// Weekends and holidays are not skipped.
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon)
        .map(|offset| last + Duration::days(offset as i64))
        .collect()
}

/// Round to two decimal places for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
