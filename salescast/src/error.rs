//! Error types for the salescast crate

use polars::prelude::PolarsError;
use series_math::MathError;
use thiserror::Error;

/// Custom error types for the salescast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Fewer observations than an operation needs
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Degenerate numerics (singular system, zero variance, undefined AIC)
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// A forecast was requested for something without a retained model
    #[error("No model available for {0}")]
    MissingModel(String),

    /// Nothing has been loaded yet
    #[error("No data available")]
    NoData,

    /// The transaction source could not be read or was empty
    #[error("Failed to load data from {path}: {reason}")]
    DataLoad { path: String, reason: String },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be assembled
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from the series math helpers
    #[error("Math error: {0}")]
    MathError(#[from] MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl ForecastError {
    /// True for the lookup failures an API layer reports as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForecastError::MissingModel(_) | ForecastError::NoData)
    }
}
