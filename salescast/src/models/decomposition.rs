//! Weekly decomposition of a daily series
//!
//! A raw series is log-stabilized, split into a moving-average trend and a
//! day-of-week seasonal pattern, and the remainder is standardized. The
//! resulting [`DecomposedSeries`] remembers everything needed to map values
//! from the standardized space back to sales units.

use series_math::moving_averages::padded_centered_mean;
use series_math::statistics::{clip_outliers_iqr, mean, StandardScaler};
use tracing::debug;

/// Length of the seasonal cycle in days
pub const SEASONAL_PERIOD: usize = 7;

/// Values are clamped to this before the log transform
const MIN_VALUE: f64 = 0.01;

/// Splits a series into trend, weekly seasonality and a scaled residual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeriesDecomposer {
    clip_outliers: bool,
}

impl SeriesDecomposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace interquartile-range outliers after the log transform
    pub fn with_outlier_clipping(mut self, enabled: bool) -> Self {
        self.clip_outliers = enabled;
        self
    }

    pub fn decompose(&self, values: &[f64]) -> DecomposedSeries {
        let clamped: Vec<f64> = values.iter().map(|v| v.max(MIN_VALUE)).collect();

        let log_applied = !clamped.is_empty() && clamped.iter().all(|v| *v > 0.0);
        let mut stabilized: Vec<f64> = if log_applied {
            clamped.iter().map(|v| v.ln_1p()).collect()
        } else {
            clamped
        };

        if self.clip_outliers {
            stabilized = clip_outliers_iqr(&stabilized);
        }

        let trend = Self::trend(&stabilized);

        let detrended: Vec<f64> = stabilized.iter().zip(&trend).map(|(v, t)| v - t).collect();
        let pattern = Self::seasonal_pattern(&detrended);
        let seasonal: Vec<f64> = (0..stabilized.len())
            .map(|i| pattern.get(i % SEASONAL_PERIOD).copied().unwrap_or(0.0))
            .collect();

        let remainder: Vec<f64> = detrended.iter().zip(&seasonal).map(|(v, s)| v - s).collect();
        let (scaler, residual) = StandardScaler::fit_transform(&remainder);

        debug!(
            points = values.len(),
            log_applied,
            scale = scaler.scale(),
            "Decomposed series"
        );

        DecomposedSeries {
            trend,
            seasonal,
            residual,
            pattern,
            scaler,
            log_applied,
        }
    }

    /// Centered weekly moving average with repaired edges, or the global mean
    /// for series shorter than two cycles
    fn trend(values: &[f64]) -> Vec<f64> {
        let n = values.len();
        if n < 2 * SEASONAL_PERIOD {
            return vec![mean(values); n];
        }

        let mut trend = match padded_centered_mean(values, SEASONAL_PERIOD) {
            Ok(trend) => trend,
            Err(_) => return vec![mean(values); n],
        };

        // The zero padding drags the first and last half-window down
        let half = SEASONAL_PERIOD / 2;
        let head = mean(&values[..half + 1]);
        let tail = mean(&values[n - half..]);
        trend[..half].fill(head);
        trend[n - half..].fill(tail);

        trend
    }

    /// Mean detrended value for each day-of-week phase
    fn seasonal_pattern(detrended: &[f64]) -> Vec<f64> {
        if detrended.len() < SEASONAL_PERIOD {
            return Vec::new();
        }

        (0..SEASONAL_PERIOD)
            .map(|phase| {
                let at_phase: Vec<f64> = detrended
                    .iter()
                    .skip(phase)
                    .step_by(SEASONAL_PERIOD)
                    .copied()
                    .collect();
                mean(&at_phase)
            })
            .collect()
    }
}

/// A series split into trend, seasonal and standardized residual parts
#[derive(Debug, Clone, PartialEq)]
pub struct DecomposedSeries {
    trend: Vec<f64>,
    seasonal: Vec<f64>,
    residual: Vec<f64>,
    pattern: Vec<f64>,
    scaler: StandardScaler,
    log_applied: bool,
}

impl DecomposedSeries {
    pub fn len(&self) -> usize {
        self.residual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residual.is_empty()
    }

    pub fn trend(&self) -> &[f64] {
        &self.trend
    }

    pub fn seasonal(&self) -> &[f64] {
        &self.seasonal
    }

    /// Standardized remainder
    pub fn residual(&self) -> &[f64] {
        &self.residual
    }

    /// One value per day-of-week phase; empty for series shorter than a week
    pub fn seasonal_pattern(&self) -> &[f64] {
        &self.pattern
    }

    pub fn scaler(&self) -> StandardScaler {
        self.scaler
    }

    pub fn log_applied(&self) -> bool {
        self.log_applied
    }

    /// Map a standardized value at an in-sample position back to sales units
    ///
    /// Positions past the end are treated as projections.
    pub fn restore(&self, scaled: f64, position: usize) -> f64 {
        if position >= self.len() {
            return self.project(scaled, position);
        }
        let level = self.trend[position] + self.seasonal[position];
        self.finish(self.scaler.inverse_value(scaled) + level)
    }

    /// Map a standardized value at a future position back to sales units
    ///
    /// The last trend value is held constant and the seasonal phase is
    /// `position mod 7`.
    pub fn project(&self, scaled: f64, position: usize) -> f64 {
        let trend = self.trend.last().copied().unwrap_or(0.0);
        let seasonal = self
            .pattern
            .get(position % SEASONAL_PERIOD)
            .copied()
            .unwrap_or(0.0);
        self.finish(self.scaler.inverse_value(scaled) + trend + seasonal)
    }

    fn finish(&self, value: f64) -> f64 {
        let value = if self.log_applied { value.exp_m1() } else { value };
        if value.is_finite() {
            value.max(0.0)
        } else if value == f64::INFINITY {
            f64::MAX
        } else {
            0.0
        }
    }
}
