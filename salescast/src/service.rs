//! Long-lived forecasting service
//!
//! The service owns the current [`EngineSnapshot`] behind a `parking_lot`
//! `RwLock<Arc<_>>`. Queries clone the `Arc` and drop the lock straight
//! away. Retraining builds a complete new snapshot without holding the lock
//! and swaps it in under a short write lock, so readers see either the old or
//! the new state, never a mix.

use crate::config::Settings;
use crate::data::{Transaction, TransactionLog};
use crate::engine::EngineSnapshot;
use crate::error::Result;
use crate::report::{
    CategoryForecastEntry, CategoryReport, DataStatus, ForecastResult, HealthReport, MetricsReport,
    ModelInfoReport, RetrainOutcome, TopProductEntry,
};
use crate::utils::ForecastPeriod;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct ForecastService {
    settings: Settings,
    data_path: PathBuf,
    snapshot: RwLock<Arc<EngineSnapshot>>,
}

impl ForecastService {
    /// Start from the transaction file named in the settings
    ///
    /// A file that cannot be loaded leaves the service running with an empty
    /// snapshot; every forecast is then the empty result.
    pub fn new(settings: Settings) -> Self {
        let data_path = PathBuf::from(&settings.data.file);
        let snapshot = match Self::load(&data_path, &settings) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(path = %data_path.display(), error = %err, "Starting without data");
                EngineSnapshot::empty(&settings)
            }
        };

        Self {
            settings,
            data_path,
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Start from transactions already in memory
    pub fn from_transactions(transactions: &[Transaction], settings: Settings) -> Result<Self> {
        let snapshot = EngineSnapshot::build(transactions, &settings)?;
        Ok(Self {
            data_path: PathBuf::from(&settings.data.file),
            settings,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    fn load(path: &Path, settings: &Settings) -> Result<EngineSnapshot> {
        let transactions = TransactionLog::from_csv(path)?;
        EngineSnapshot::build(&transactions, settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// The snapshot currently answering queries
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    pub fn generate_forecast(&self, period: ForecastPeriod) -> ForecastResult {
        self.snapshot().generate_forecast(period)
    }

    pub fn metrics(&self, period: ForecastPeriod) -> Result<MetricsReport> {
        self.snapshot().metrics(period)
    }

    pub fn category_forecasts(&self, period: ForecastPeriod) -> Result<CategoryReport> {
        let categories = self.snapshot().category_forecasts(period)?;
        Ok(CategoryReport {
            total_categories: categories.len(),
            categories,
            period,
            forecast_steps: period.days(),
        })
    }

    pub fn category_forecast(&self, name: &str, period: ForecastPeriod) -> Result<CategoryForecastEntry> {
        self.snapshot().category_forecast(name, period)
    }

    pub fn top_products(&self, period: ForecastPeriod) -> Result<Vec<TopProductEntry>> {
        self.snapshot().top_products(period)
    }

    pub fn model_info(&self) -> Result<ModelInfoReport> {
        self.snapshot().model_info()
    }

    pub fn data_status(&self) -> DataStatus {
        self.snapshot().data_status()
    }

    pub fn health(&self) -> HealthReport {
        self.snapshot().health()
    }

    /// Reload the transaction file and refit every model
    ///
    /// On failure the current snapshot stays in place.
    #[instrument(skip(self), fields(path = %self.data_path.display()))]
    pub fn retrain(&self) -> RetrainOutcome {
        match Self::load(&self.data_path, &self.settings) {
            Ok(snapshot) => self.install(snapshot),
            Err(err) => {
                warn!(error = %err, "Retrain failed, keeping current models");
                self.failed(format!("Retrain failed: {}", err))
            }
        }
    }

    /// Refit every model from the given transactions
    #[instrument(skip_all, fields(transactions = transactions.len()))]
    pub fn retrain_with(&self, transactions: &[Transaction]) -> RetrainOutcome {
        match EngineSnapshot::build(transactions, &self.settings) {
            Ok(snapshot) => self.install(snapshot),
            Err(err) => {
                warn!(error = %err, "Retrain failed, keeping current models");
                self.failed(format!("Retrain failed: {}", err))
            }
        }
    }

    fn install(&self, snapshot: EngineSnapshot) -> RetrainOutcome {
        let outcome = RetrainOutcome {
            success: true,
            message: "Retrained".to_string(),
            main_model: snapshot.main_model().is_some(),
            category_models: snapshot.category_models().len(),
            categories: snapshot.category_models().keys().cloned().collect(),
        };

        *self.snapshot.write() = Arc::new(snapshot);
        info!(
            main_model = outcome.main_model,
            category_models = outcome.category_models,
            "Installed new engine snapshot"
        );
        outcome
    }

    fn failed(&self, message: String) -> RetrainOutcome {
        let current = self.snapshot();
        RetrainOutcome {
            success: false,
            message,
            main_model: current.main_model().is_some(),
            category_models: current.category_models().len(),
            categories: current.category_models().keys().cloned().collect(),
        }
    }
}

impl std::fmt::Debug for ForecastService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("ForecastService")
            .field("data_path", &self.data_path)
            .field("main_model", &snapshot.main_model().map(|m| m.order()))
            .field("category_models", &snapshot.category_models().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn sales(days: usize, level: f64) -> Vec<Transaction> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        (0..days)
            .map(|i| {
                let bump = [0.0, 10.0, -5.0, 5.0, 15.0, -10.0, 0.0][i % 7];
                Transaction::completed(start + Duration::days(i as i64), "Tablets", level + bump, 2.0)
            })
            .collect()
    }

    fn missing_file_settings() -> Settings {
        let mut settings = Settings::default();
        settings.data.file = "does/not/exist.csv".to_string();
        settings
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let service = ForecastService::new(missing_file_settings());
        assert!(service.generate_forecast(ForecastPeriod::SevenDays).is_empty());
        assert!(!service.data_status().data_available);
        assert!(!service.health().models.data_loaded);
    }

    #[test]
    fn test_failed_retrain_keeps_snapshot() {
        let service = ForecastService::from_transactions(&sales(30, 100.0), missing_file_settings()).unwrap();
        assert!(service.snapshot().main_model().is_some());

        let outcome = service.retrain();
        assert!(!outcome.success);
        assert!(outcome.main_model);
        assert!(service.snapshot().main_model().is_some());
    }

    #[test]
    fn test_retrain_with_swaps_snapshot() {
        let service = ForecastService::from_transactions(&sales(5, 100.0), missing_file_settings()).unwrap();
        let before = service.snapshot();
        assert!(before.main_model().is_none());

        let outcome = service.retrain_with(&sales(30, 100.0));
        assert!(outcome.success);
        assert!(outcome.main_model);
        // Readers holding the old snapshot keep a consistent view
        assert!(before.main_model().is_none());
        assert!(service.snapshot().main_model().is_some());
    }
}
