//! Moving average calculations over whole series
//!
//! Contains:
//! - Centered moving average with zero padding (same-length convolution)
//! - Centered rolling mean over partial windows at the edges
//! - Trailing window sums

use crate::{MathError, Result};

/// Centered moving average with implicit zero padding
///
/// Equivalent to convolving with a box kernel of `window` ones divided by
/// `window` and keeping the centered, input-length part. Entries near the
/// edges are biased towards zero because the padding counts in the divisor;
/// callers are expected to repair them.
pub fn padded_centered_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(MathError::InvalidInput(
            "Window must be greater than zero".to_string(),
        ));
    }

    let n = values.len();
    let back = (window - 1) / 2;
    let ahead = window - 1 - back;

    let averaged = (0..n)
        .map(|i| {
            let start = i.saturating_sub(ahead);
            let end = (i + back).min(n.saturating_sub(1));
            values[start..=end].iter().sum::<f64>() / window as f64
        })
        .collect();

    Ok(averaged)
}

/// Centered rolling mean that shrinks the window at the edges
///
/// Each output is the mean of the values that exist inside a window of size
/// `window` centered on the position, so the first and last entries average
/// fewer points instead of being dropped.
pub fn centered_rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(MathError::InvalidInput(
            "Window must be greater than zero".to_string(),
        ));
    }

    let n = values.len();
    let before = window / 2;
    let after = (window - 1) / 2;

    let smoothed = (0..n)
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after).min(n - 1);
            let slice = &values[start..=end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect();

    Ok(smoothed)
}

/// Sum of the last `window` values (all values when the series is shorter)
pub fn trailing_sum(values: &[f64], window: usize) -> f64 {
    values[values.len().saturating_sub(window)..].iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_padded_centered_mean_interior_and_edges() {
        let data = [7.0; 10];
        let result = padded_centered_mean(&data, 7).unwrap();

        assert_eq!(result.len(), data.len());
        // Full windows in the middle
        for value in &result[3..7] {
            assert_relative_eq!(*value, 7.0, epsilon = 1e-12);
        }
        // First entry only sees four real values
        assert_relative_eq!(result[0], 4.0, epsilon = 1e-12);
        assert_relative_eq!(result[9], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_padded_centered_mean_rejects_zero_window() {
        assert!(padded_centered_mean(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn test_centered_rolling_mean_partial_edges() {
        let data = [3.0, 6.0, 9.0, 12.0];
        let result = centered_rolling_mean(&data, 3).unwrap();

        assert_relative_eq!(result[0], 4.5);
        assert_relative_eq!(result[1], 6.0);
        assert_relative_eq!(result[2], 9.0);
        assert_relative_eq!(result[3], 10.5);
    }

    #[test]
    fn test_centered_rolling_mean_single_point() {
        assert_eq!(centered_rolling_mean(&[5.0], 3).unwrap(), vec![5.0]);
        assert!(centered_rolling_mean(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_sum() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(trailing_sum(&data, 2), 7.0);
        assert_eq!(trailing_sum(&data, 10), 10.0);
        assert_eq!(trailing_sum(&[], 3), 0.0);
    }
}
