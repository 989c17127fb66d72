//! # Series Math
//!
//! Numerical building blocks for univariate daily series.
//! This crate provides the descriptive statistics, smoothing windows,
//! autocorrelation, differencing and small dense linear solves that the
//! forecasting models are assembled from.

use thiserror::Error;

pub mod correlation;
pub mod differencing;
pub mod linalg;
pub mod moving_averages;
pub mod statistics;

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Singular matrix: zero pivot in column {0}")]
    SingularMatrix(usize),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
