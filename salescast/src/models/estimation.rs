//! Coefficient estimation for the AR and MA parts
//!
//! AR coefficients come from the Yule-Walker equations, MA coefficients from a
//! moment heuristic on the autocorrelation of the AR residuals. Neither is a
//! maximum-likelihood fit.

use crate::error::{ForecastError, Result};
use series_math::correlation::autocorrelation;
use series_math::linalg::{add_ridge, solve, toeplitz};
use tracing::debug;

/// Coefficients are clipped to this magnitude to keep the process stable
pub const COEFFICIENT_BOUND: f64 = 0.95;

/// Added to the Yule-Walker diagonal
const RIDGE: f64 = 1e-6;

/// Outcome of AR estimation
#[derive(Debug, Clone, PartialEq)]
pub enum ArEstimate {
    /// Yule-Walker solution, clipped
    Solved(Vec<f64>),
    /// Small default used when the system could not be solved
    Fallback(Vec<f64>),
}

impl ArEstimate {
    pub fn coefficients(&self) -> &[f64] {
        match self {
            ArEstimate::Solved(c) | ArEstimate::Fallback(c) => c,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ArEstimate::Fallback(_))
    }
}

/// Estimates AR and MA coefficients for a centered series
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterEstimator;

impl ParameterEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Yule-Walker estimate of `p` AR coefficients
    pub fn estimate_ar(&self, series: &[f64], p: usize) -> ArEstimate {
        if p == 0 {
            return ArEstimate::Solved(Vec::new());
        }

        let acf = autocorrelation(series, p);
        match solve_yule_walker(&acf, p) {
            Ok(coefficients) => ArEstimate::Solved(coefficients.into_iter().map(clip).collect()),
            Err(err) => {
                debug!(p, error = %err, "Using default AR coefficients");
                ArEstimate::Fallback(fallback_ar(p))
            }
        }
    }

    /// Moment estimate of `q` MA coefficients: `-0.5` times the
    /// autocorrelation of the AR residuals, clipped
    pub fn estimate_ma(&self, series: &[f64], ar: &[f64], q: usize) -> Vec<f64> {
        if q == 0 {
            return Vec::new();
        }

        let residuals = ar_residuals(series, ar);
        let acf = autocorrelation(&residuals, q);
        acf[1..=q].iter().map(|r| clip(-0.5 * r)).collect()
    }
}

/// Solve `R·φ = r` for `p` unclipped AR coefficients
///
/// `acf` holds the autocorrelations for lags `0..=p`. A ridge of `1e-6` is
/// added to the diagonal of the Toeplitz matrix.
fn solve_yule_walker(acf: &[f64], p: usize) -> Result<Vec<f64>> {
    if acf.len() <= p {
        return Err(ForecastError::InsufficientData(format!(
            "Yule-Walker for p = {} needs {} autocorrelations, have {}",
            p,
            p + 1,
            acf.len()
        )));
    }

    let mut matrix = toeplitz(acf, p)?;
    add_ridge(&mut matrix, RIDGE);
    let coefficients = solve(&matrix, &acf[1..=p])?;

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(ForecastError::NumericalInstability(
            "Yule-Walker solution is not finite".to_string(),
        ));
    }
    Ok(coefficients)
}

/// One-step AR prediction errors `x[t] - Σ φ[i]·x[t-i-1]` for `t ≥ p`
///
/// With no AR coefficients the series itself is returned.
pub fn ar_residuals(series: &[f64], ar: &[f64]) -> Vec<f64> {
    let p = ar.len();
    if p == 0 {
        return series.to_vec();
    }

    (p..series.len())
        .map(|t| {
            let predicted: f64 = ar.iter().enumerate().map(|(i, phi)| phi * series[t - i - 1]).sum();
            series[t] - predicted
        })
        .collect()
}

/// Evenly spaced values from 0.3 to 0.3·p, divided by p
fn fallback_ar(p: usize) -> Vec<f64> {
    (1..=p).map(|i| 0.3 * i as f64 / p as f64).collect()
}

fn clip(value: f64) -> f64 {
    value.clamp(-COEFFICIENT_BOUND, COEFFICIENT_BOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ar1(phi: f64, n: usize) -> Vec<f64> {
        // Deterministic pseudo-noise keeps the test reproducible
        let mut state: u64 = 42;
        let mut x = vec![0.0; n];
        for t in 1..n {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let shock = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
            x[t] = phi * x[t - 1] + shock;
        }
        x
    }

    #[test]
    fn test_zero_order_gives_no_coefficients() {
        let estimator = ParameterEstimator::new();
        assert_eq!(estimator.estimate_ar(&[1.0, 2.0], 0), ArEstimate::Solved(vec![]));
        assert!(estimator.estimate_ma(&[1.0, 2.0], &[], 0).is_empty());
    }

    #[test]
    fn test_recovers_sign_of_ar1() {
        let series = ar1(0.6, 400);
        let estimate = ParameterEstimator::new().estimate_ar(&series, 1);
        assert!(!estimate.is_fallback());
        assert!(estimate.coefficients()[0] > 0.3);
    }

    #[test]
    fn test_coefficients_are_clipped() {
        // A straight line is almost perfectly autocorrelated
        let series: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let estimate = ParameterEstimator::new().estimate_ar(&series, 2);
        for c in estimate.coefficients() {
            assert!(c.abs() <= COEFFICIENT_BOUND);
        }
    }

    #[test]
    fn test_constant_series_has_zero_coefficients() {
        let estimate = ParameterEstimator::new().estimate_ar(&[0.0; 20], 2);
        assert_eq!(estimate, ArEstimate::Solved(vec![0.0, 0.0]));
    }

    #[test]
    fn test_degenerate_yule_walker_systems() {
        // A NaN on the diagonal leaves no usable pivot
        assert!(matches!(
            solve_yule_walker(&[f64::NAN, 0.5, 0.1], 2),
            Err(ForecastError::MathError(_))
        ));
        // Finite pivots, but an infinite right-hand side
        assert!(matches!(
            solve_yule_walker(&[1.0, 0.0, f64::INFINITY], 2),
            Err(ForecastError::NumericalInstability(_))
        ));
        assert!(matches!(
            solve_yule_walker(&[1.0, 0.5], 2),
            Err(ForecastError::InsufficientData(_))
        ));
        assert_eq!(solve_yule_walker(&[1.0, 0.0], 1).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_fallback_values() {
        assert_eq!(fallback_ar(1), vec![0.3]);
        let two = fallback_ar(2);
        assert_relative_eq!(two[0], 0.15);
        assert_relative_eq!(two[1], 0.3);
    }

    #[test]
    fn test_ar_residuals() {
        let residuals = ar_residuals(&[1.0, 2.0, 4.0], &[0.5]);
        assert_eq!(residuals, vec![1.5, 3.0]);
    }

    #[test]
    fn test_ma_coefficients_are_bounded() {
        let series = ar1(-0.8, 200);
        let ma = ParameterEstimator::new().estimate_ma(&series, &[], 2);
        assert_eq!(ma.len(), 2);
        assert!(ma.iter().all(|m| m.abs() <= 0.5));
    }
}
