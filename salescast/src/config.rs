//! Layered settings for the forecasting service
//!
//! Built-in defaults are overridden by optional `config/default`,
//! `config/{ENVIRONMENT}` and `config/local` files, then by environment
//! variables prefixed with `SALESCAST__` (for example
//! `SALESCAST__ENGINE__WEEKEND_FACTOR=0.75`).

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub data: DataSettings,
    pub model: ModelSettings,
    pub engine: EngineSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    /// Transaction CSV read at start-up and on retrain
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    /// Search bounds for categories without a retained model
    pub category_max_p: usize,
    pub category_max_d: usize,
    pub category_max_q: usize,
    /// Replace IQR outliers before decomposition
    pub clip_outliers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Category models validating above this MAPE (percent) are not retained
    pub category_rejection_mape: f64,
    /// Categories validating above this MAPE are left out of category forecasts
    pub category_ranking_mape: f64,
    /// Multiplier for predicted revenue on Saturdays and Sundays
    pub weekend_factor: f64,
    pub top_products_limit: usize,
    /// Trailing days used for the average unit price
    pub price_window_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Settings {
    /// Load settings from the default file locations and the environment
    pub fn new() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    /// Load settings from one explicit file on top of the defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let defaults = Settings::default();

        Config::builder()
            .set_default("data.file", defaults.data.file)?
            .set_default("model.max_p", defaults.model.max_p as i64)?
            .set_default("model.max_d", defaults.model.max_d as i64)?
            .set_default("model.max_q", defaults.model.max_q as i64)?
            .set_default("model.category_max_p", defaults.model.category_max_p as i64)?
            .set_default("model.category_max_d", defaults.model.category_max_d as i64)?
            .set_default("model.category_max_q", defaults.model.category_max_q as i64)?
            .set_default("model.clip_outliers", defaults.model.clip_outliers)?
            .set_default(
                "engine.category_rejection_mape",
                defaults.engine.category_rejection_mape,
            )?
            .set_default(
                "engine.category_ranking_mape",
                defaults.engine.category_ranking_mape,
            )?
            .set_default("engine.weekend_factor", defaults.engine.weekend_factor)?
            .set_default(
                "engine.top_products_limit",
                defaults.engine.top_products_limit as i64,
            )?
            .set_default(
                "engine.price_window_days",
                defaults.engine.price_window_days as i64,
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)
    }

    fn environment() -> Environment {
        Environment::with_prefix("SALESCAST")
            .separator("__")
            .try_parsing(true)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data: DataSettings {
                file: "cleaned_customer_data.csv".to_string(),
            },
            model: ModelSettings {
                max_p: 2,
                max_d: 1,
                max_q: 2,
                category_max_p: 1,
                category_max_d: 1,
                category_max_q: 1,
                clip_outliers: false,
            },
            engine: EngineSettings {
                category_rejection_mape: 200.0,
                category_ranking_mape: 300.0,
                weekend_factor: 0.8,
                top_products_limit: 10,
                price_window_days: 14,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
