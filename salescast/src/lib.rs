//! # Salescast
//!
//! Near-term revenue and per-category demand forecasts from a transaction log.
//!
//! ## Features
//!
//! - Transaction ingestion from CSV and gap-free daily aggregation
//! - Weekly decomposition with log stabilization and standardization
//! - ARIMA with Yule-Walker AR and moment-based MA estimation
//! - Order selection by AIC over small grids
//! - Holdout validation with bias adjustment
//! - Per-category forecasts and top-product rankings
//! - A service object that swaps fitted models atomically on retrain
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use salescast::config::Settings;
//! use salescast::{ForecastPeriod, ForecastService};
//!
//! let settings = Settings::new()?;
//! let service = ForecastService::new(settings);
//!
//! let forecast = service.generate_forecast(ForecastPeriod::SevenDays);
//! println!("Next week: {:.2}", forecast.summary.predicted_revenue);
//!
//! for category in service.category_forecasts(ForecastPeriod::FifteenDays)?.categories {
//!     println!("{}: {} units", category.category, category.total_predicted_quantity);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod report;
pub mod service;
pub mod utils;

// Re-export commonly used types
pub use crate::data::{SalesHistory, Transaction, TransactionLog};
pub use crate::engine::EngineSnapshot;
pub use crate::error::ForecastError;
pub use crate::models::arima::{ArimaModel, FittedArima};
pub use crate::models::ModelOrder;
pub use crate::report::ForecastResult;
pub use crate::service::ForecastService;
pub use crate::utils::ForecastPeriod;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
