//! Utility functions for forecast periods, splits and calendars

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Forecast horizons offered to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForecastPeriod {
    #[default]
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "15days")]
    FifteenDays,
}

impl ForecastPeriod {
    /// Parse a period token, falling back to seven days for anything unknown
    pub fn from_token(token: &str) -> Self {
        token.parse().unwrap_or_default()
    }

    pub fn days(&self) -> usize {
        match self {
            ForecastPeriod::SevenDays => 7,
            ForecastPeriod::FifteenDays => 15,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            ForecastPeriod::SevenDays => "7days",
            ForecastPeriod::FifteenDays => "15days",
        }
    }
}

impl fmt::Display for ForecastPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ForecastPeriod {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "7days" | "7" => Ok(ForecastPeriod::SevenDays),
            "15days" | "15" => Ok(ForecastPeriod::FifteenDays),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown forecast period '{}', expected 7days or 15days",
                other
            ))),
        }
    }
}

/// Number of trailing points held out for validation
///
/// A quarter of the history, at least `steps`, but never more than a third.
pub fn validation_size(len: usize, steps: usize) -> usize {
    (len / 4).max(steps).min(len / 3)
}

/// Split a series into training and validation parts
pub fn train_validation_split(data: &[f64], steps: usize) -> (&[f64], &[f64]) {
    let test = validation_size(data.len(), steps);
    data.split_at(data.len() - test)
}

/// The `horizon` calendar days following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon)
        .map(|offset| last + Duration::days(offset as i64))
        .collect()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Round to two decimal places for reporting
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to one decimal place for reporting
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage change from `base` to `value`; 0.0 when `base` is not positive
pub fn percent_change(value: f64, base: f64) -> f64 {
    if base > 0.0 {
        (value - base) / base * 100.0
    } else {
        0.0
    }
}
