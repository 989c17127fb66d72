//! Forecasting models for daily sales series

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

pub mod arima;
pub mod decomposition;
pub mod estimation;
pub mod order;

/// ARIMA order: AR lags, differencing passes, MA lags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ModelOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Number of estimated parameters: AR and MA lags plus the mean
    pub fn parameter_count(&self) -> usize {
        self.p + self.q + 1
    }
}

impl Default for ModelOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Fitted model that can project a series forward
pub trait TrainedForecastModel: Debug {
    /// Forecast `steps` values past the end of the fitted series
    fn forecast(&self, steps: usize) -> Vec<f64>;

    /// In-sample fitted values in the original scale
    fn fitted_values(&self) -> &[f64];

    /// Name of the model
    fn name(&self) -> String;
}

/// Unfitted model that can be fitted to a daily series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Fit the model to a series
    fn fit(&self, series: &[f64]) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> String;
}
