//! Descriptive statistics over plain `f64` slices
//!
//! Contains:
//! - Mean, population variance and standard deviation
//! - Median and linearly interpolated quantiles
//! - A z-score scaler that remembers its parameters
//! - Interquartile-range outlier clipping

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as zero spread
const MIN_SCALE: f64 = 1e-12;

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by `n`); 0.0 for an empty slice
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Median of the values; 0.0 for an empty slice
pub fn median(values: &[f64]) -> f64 {
    quantile(values, 0.5).unwrap_or(0.0)
}

/// Quantile with linear interpolation between closest ranks
///
/// Matches the default "linear" method: the rank is `q * (n - 1)` and the
/// result interpolates between the two surrounding order statistics.
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute a quantile of an empty series".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be within [0, 1], got {}",
            q
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Z-score scaler
///
/// Keeps the mean and scale it was fitted with so that values produced in
/// the scaled space can be mapped back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: f64,
    scale: f64,
}

impl StandardScaler {
    /// Fit the scaler to a series. A series without spread gets scale 1.0.
    pub fn fit(values: &[f64]) -> Self {
        let mean = mean(values);
        let sd = std_dev(values);
        let scale = if sd.is_finite() && sd > MIN_SCALE { sd } else { 1.0 };
        Self { mean, scale }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Map a single value into the scaled space
    pub fn transform_value(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }

    /// Map a single scaled value back
    pub fn inverse_value(&self, value: f64) -> f64 {
        value * self.scale + self.mean
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform_value(v)).collect()
    }

    pub fn inverse_transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.inverse_value(v)).collect()
    }

    /// Fit to the series and return it scaled
    pub fn fit_transform(values: &[f64]) -> (Self, Vec<f64>) {
        let scaler = Self::fit(values);
        let scaled = scaler.transform(values);
        (scaler, scaled)
    }
}

/// Replace interquartile-range outliers with the median of the inliers
///
/// Bounds are `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`. Series shorter than four
/// points are returned unchanged.
pub fn clip_outliers_iqr(values: &[f64]) -> Vec<f64> {
    if values.len() < 4 {
        return values.to_vec();
    }

    let (q1, q3) = match (quantile(values, 0.25), quantile(values, 0.75)) {
        (Ok(q1), Ok(q3)) => (q1, q3),
        _ => return values.to_vec(),
    };
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    let inliers: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| *v >= lower && *v <= upper)
        .collect();
    if inliers.len() == values.len() {
        return values.to_vec();
    }
    let replacement = median(&inliers);

    values
        .iter()
        .map(|&v| if v < lower || v > upper { replacement } else { v })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data), 5.0);
        assert_relative_eq!(variance(&data), 4.0);
        assert_relative_eq!(std_dev(&data), 2.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile(&data, 0.25).unwrap(), 1.75);
        assert_relative_eq!(quantile(&data, 0.75).unwrap(), 3.25);
        assert_relative_eq!(median(&data), 2.5);
        assert!(quantile(&[], 0.5).is_err());
        assert!(quantile(&data, 1.5).is_err());
    }

    #[test]
    fn test_scaler_round_trip() {
        let data = [10.0, 20.0, 30.0, 40.0, 50.0];
        let (scaler, scaled) = StandardScaler::fit_transform(&data);

        assert!(mean(&scaled).abs() < 1e-12);
        assert_relative_eq!(std_dev(&scaled), 1.0, epsilon = 1e-12);

        let restored = scaler.inverse_transform(&scaled);
        for (a, b) in restored.iter().zip(data.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_scaler_without_spread_uses_unit_scale() {
        let scaler = StandardScaler::fit(&[3.0, 3.0, 3.0]);
        assert_eq!(scaler.scale(), 1.0);
        assert_eq!(scaler.transform_value(3.0), 0.0);
    }

    #[test]
    fn test_clip_outliers_replaces_spike() {
        let data = [10.0, 11.0, 9.0, 10.0, 12.0, 10.0, 500.0, 11.0];
        let clipped = clip_outliers_iqr(&data);

        assert_eq!(clipped.len(), data.len());
        assert!(clipped[6] < 20.0);
        assert_eq!(clipped[0], 10.0);
    }

    #[test]
    fn test_clip_outliers_leaves_clean_series() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(clip_outliers_iqr(&data), data.to_vec());
    }
}
