//! Autocorrelation of a univariate series

/// Sample autocorrelation for lags `0..=max_lag`
///
/// The series is centered, the lag-k autocovariance is divided by `n` and
/// then by the lag-0 autocovariance. Lag 0 is always 1.0. A series with fewer
/// than two points or no variance yields 0.0 at every other lag, as do lags
/// that reach past the end of the series.
pub fn autocorrelation(values: &[f64], max_lag: usize) -> Vec<f64> {
    let mut acf = vec![0.0; max_lag + 1];
    acf[0] = 1.0;

    let n = values.len();
    if n < 2 {
        return acf;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let c0 = centered.iter().map(|v| v * v).sum::<f64>() / n as f64;
    if c0 == 0.0 || !c0.is_finite() {
        return acf;
    }

    for (lag, slot) in acf.iter_mut().enumerate().take(max_lag.min(n - 1) + 1).skip(1) {
        let covariance = centered[..n - lag]
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        *slot = covariance / c0;
    }

    acf
}
