//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use series_math::statistics::mean;

/// Mean absolute error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Mean squared error
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_squared_error(actual, predicted).sqrt()
}

/// Mean absolute percentage error, in percent
///
/// Actual values of zero are divided by `f64::EPSILON`, so a miss on a zero
/// day produces a very large error rather than a division by zero.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs() / a.abs().max(f64::EPSILON))
        .sum();
    total / actual.len() as f64 * 100.0
}

/// Error statistics of a forecast checked against held-out actuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Percent
    pub mape: f64,
    /// MAE divided by the mean actual value
    pub normalized_mae: f64,
    /// RMSE divided by the mean actual value
    pub normalized_rmse: f64,
    /// False for the poor-fit placeholder returned when there was too little data
    pub reliable: bool,
}

impl ValidationMetrics {
    /// Placeholder for "no reliable metric": MAE = RMSE = 1, MAPE = 100 %
    pub fn poor_fit() -> Self {
        Self {
            mae: 1.0,
            rmse: 1.0,
            mape: 100.0,
            normalized_mae: 1.0,
            normalized_rmse: 1.0,
            reliable: false,
        }
    }
}

impl std::fmt::Display for ValidationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MAE: {:.4}, RMSE: {:.4}, MAPE: {:.2}%{}",
            self.mae,
            self.rmse,
            self.mape,
            if self.reliable { "" } else { " (unreliable)" }
        )
    }
}

/// Evaluate a forecast against the values that actually happened
pub fn evaluate_forecast(actual: &[f64], predicted: &[f64]) -> Result<ValidationMetrics> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::DataError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let mae = mean_absolute_error(actual, predicted);
    let rmse = root_mean_squared_error(actual, predicted);
    let mape = mean_absolute_percentage_error(actual, predicted);

    let mean_actual = mean(actual);
    let (normalized_mae, normalized_rmse) = if mean_actual > 0.0 {
        (mae / mean_actual, rmse / mean_actual)
    } else {
        (1.0, 1.0)
    };

    Ok(ValidationMetrics {
        mae,
        rmse,
        mape,
        normalized_mae,
        normalized_rmse,
        reliable: true,
    })
}

/// In-sample error of a fitted model's residuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualDiagnostics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl ResidualDiagnostics {
    pub fn from_residuals(residuals: &[f64]) -> Self {
        if residuals.is_empty() {
            return Self {
                mse: 0.0,
                rmse: 0.0,
                mae: 0.0,
            };
        }
        let n = residuals.len() as f64;
        let mse = residuals.iter().map(|r| r * r).sum::<f64>() / n;
        let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n;
        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_evaluate_forecast() {
        let actual = [100.0, 200.0];
        let predicted = [110.0, 180.0];
        let metrics = evaluate_forecast(&actual, &predicted).unwrap();

        assert_relative_eq!(metrics.mae, 15.0);
        assert_relative_eq!(metrics.rmse, 250.0_f64.sqrt());
        assert_relative_eq!(metrics.mape, 10.0);
        assert_relative_eq!(metrics.normalized_mae, 0.1);
        assert!(metrics.reliable);
    }

    #[test]
    fn test_mismatched_lengths_are_rejected() {
        assert!(evaluate_forecast(&[1.0, 2.0], &[1.0]).is_err());
        assert!(evaluate_forecast(&[], &[]).is_err());
    }

    #[test]
    fn test_zero_actuals_do_not_divide_by_zero() {
        let mape = mean_absolute_percentage_error(&[0.0], &[0.0]);
        assert_eq!(mape, 0.0);
        assert!(mean_absolute_percentage_error(&[0.0], &[1.0]).is_finite());
    }

    #[test]
    fn test_residual_diagnostics() {
        let d = ResidualDiagnostics::from_residuals(&[1.0, -1.0, 2.0, -2.0]);
        assert_relative_eq!(d.mse, 2.5);
        assert_relative_eq!(d.mae, 1.5);
    }
}
