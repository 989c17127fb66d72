//! Forecast orchestration over a loaded sales history
//!
//! An [`EngineSnapshot`] is built once from a batch of transactions: it
//! aggregates the daily series, fits the main revenue model and one quantity
//! model per product category, and from then on only answers queries. It is
//! never mutated; reloading data means building a new snapshot.

use crate::config::Settings;
use crate::data::{DailySeries, SalesHistory, Transaction};
use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate_forecast, ValidationMetrics};
use crate::models::arima::{holdout_sizes, ArimaModel, FittedArima, MIN_OBSERVATIONS};
use crate::models::decomposition::SeriesDecomposer;
use crate::models::order::{OrderSelector, MIN_SEARCH_OBSERVATIONS};
use crate::models::ModelOrder;
use crate::report::{
    CategoryDayForecast, CategoryForecastEntry, CategoryModelInfo, CategoryStatus, DailyForecastEntry,
    DataStatus, ForecastResult, ForecastSummary, HealthModels, HealthReport, LinePoint, LinePointKind,
    MainModelMetrics, MetricsReport, ModelInfo, ModelInfoReport, TopProductEntry, TrendDirection,
    TrendInsights,
};
use crate::utils::{
    future_dates, is_weekend, percent_change, round1, round2, validation_size, ForecastPeriod,
};
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use series_math::moving_averages::trailing_sum;
use series_math::statistics::{mean, std_dev};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Name reported by the health check
pub const ENGINE_NAME: &str = "Salescast ARIMA engine";

/// Holdout length used when deciding whether to keep a category model
const CATEGORY_VALIDATION_STEPS: usize = 7;

/// Days at each end of the history compared for the trend insight
const TREND_WINDOW: usize = 7;

/// Coefficient of variation above which revenue counts as volatile
const VOLATILITY_THRESHOLD: f64 = 0.3;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A retained per-category model and its holdout score
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryModel {
    pub fitted: FittedArima,
    pub validation: ValidationMetrics,
}

/// Immutable state behind every forecast query
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    settings: Settings,
    history: Option<SalesHistory>,
    main_model: Option<FittedArima>,
    category_models: BTreeMap<String, CategoryModel>,
    built_at: DateTime<Utc>,
}

impl EngineSnapshot {
    /// A snapshot with no data and no models
    pub fn empty(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
            history: None,
            main_model: None,
            category_models: BTreeMap::new(),
            built_at: Utc::now(),
        }
    }

    /// Aggregate the transactions and fit every model
    #[instrument(skip_all, fields(transactions = transactions.len()))]
    pub fn build(transactions: &[Transaction], settings: &Settings) -> Result<Self> {
        let mut snapshot = Self::empty(settings);

        let history = match SalesHistory::from_transactions(transactions)? {
            Some(history) => history,
            None => {
                warn!("No completed transactions, engine starts without models");
                return Ok(snapshot);
            }
        };

        if history.daily().len() >= MIN_SEARCH_OBSERVATIONS {
            snapshot.main_model = snapshot.fit_main_model(history.daily());
            if snapshot.main_model.is_some() {
                snapshot.category_models = snapshot.fit_category_models(&history);
            }
        } else {
            warn!(
                days = history.daily().len(),
                "History too short to fit models"
            );
        }
        snapshot.history = Some(history);

        let main_label = snapshot
            .main_model
            .as_ref()
            .map(|m| m.order().to_string())
            .unwrap_or_else(|| "none".to_string());
        info!(
            main_model = %main_label,
            category_models = snapshot.category_models.len(),
            "Engine snapshot ready"
        );
        Ok(snapshot)
    }

    fn fit_main_model(&self, daily: &DailySeries) -> Option<FittedArima> {
        let revenue = daily.revenue_smoothed();
        let selection = self.main_selector().select(revenue);

        match self.model(selection.order).fit(revenue) {
            Ok(fitted) => {
                info!(order = %fitted.order(), aic = fitted.aic(), "Fitted main revenue model");
                Some(fitted)
            }
            Err(err) => {
                warn!(error = %err, "Main revenue model could not be fitted");
                None
            }
        }
    }

    fn fit_category_models(&self, history: &SalesHistory) -> BTreeMap<String, CategoryModel> {
        let threshold = self.settings.engine.category_rejection_mape;
        let mut models = BTreeMap::new();

        for (name, series) in history.categories() {
            if !is_eligible(series) {
                debug!(category = %name, "Category not eligible for a model");
                continue;
            }

            let quantity = series.quantity_smoothed();
            let selection = self.main_selector().select(quantity);
            let fitted = match self.model(selection.order).fit(quantity) {
                Ok(fitted) => fitted,
                Err(err) => {
                    debug!(category = %name, error = %err, "Category model could not be fitted");
                    continue;
                }
            };

            let validation = fitted.validation_metrics(CATEGORY_VALIDATION_STEPS);
            if validation.mape < threshold {
                debug!(category = %name, order = %fitted.order(), mape = validation.mape, "Retained category model");
                models.insert(name.clone(), CategoryModel { fitted, validation });
            } else {
                debug!(category = %name, mape = validation.mape, "Rejected category model");
            }
        }

        models
    }

    fn decomposer(&self) -> SeriesDecomposer {
        SeriesDecomposer::new().with_outlier_clipping(self.settings.model.clip_outliers)
    }

    fn model(&self, order: ModelOrder) -> ArimaModel {
        ArimaModel::new(order).with_decomposer(self.decomposer())
    }

    fn main_selector(&self) -> OrderSelector {
        let m = &self.settings.model;
        OrderSelector::new(m.max_p, m.max_d, m.max_q).with_decomposer(self.decomposer())
    }

    fn category_selector(&self) -> OrderSelector {
        let m = &self.settings.model;
        OrderSelector::new(m.category_max_p, m.category_max_d, m.category_max_q)
            .with_decomposer(self.decomposer())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> Option<&SalesHistory> {
        self.history.as_ref()
    }

    pub fn main_model(&self) -> Option<&FittedArima> {
        self.main_model.as_ref()
    }

    pub fn category_models(&self) -> &BTreeMap<String, CategoryModel> {
        &self.category_models
    }

    pub fn category_model(&self, name: &str) -> Option<&CategoryModel> {
        self.category_models.get(name)
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Full forecast payload; the empty result when no model is available
    #[instrument(skip_all, fields(period = %period))]
    pub fn generate_forecast(&self, period: ForecastPeriod) -> ForecastResult {
        let (main, history) = match (&self.main_model, &self.history) {
            (Some(main), Some(history)) => (main, history),
            _ => {
                debug!("No model available, returning empty forecast");
                return ForecastResult::empty();
            }
        };

        match self.assemble_forecast(main, history, period) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Forecast assembly failed, returning empty forecast");
                ForecastResult::empty()
            }
        }
    }

    fn assemble_forecast(
        &self,
        main: &FittedArima,
        history: &SalesHistory,
        period: ForecastPeriod,
    ) -> Result<ForecastResult> {
        let steps = period.days();
        let daily = history.daily();
        let (first_date, last_date) = match (daily.first_date(), daily.last_date()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(ForecastResult::empty()),
        };

        let n = daily.len();
        let test_size = validation_size(n, steps);
        let train_size = n - test_size;
        let smoothed = daily.revenue_smoothed();
        let weekend_factor = self.settings.engine.weekend_factor;

        // Holdout: refit on the training part and forecast the validation span
        let validation_model = self.model(main.requested_order()).fit(&smoothed[..train_size])?;
        let validation_forecast = validation_model.forecast(test_size);
        let held_out = &smoothed[train_size..];

        let forecast_mean = mean(&validation_forecast);
        let adjustment_factor = if forecast_mean > 0.0 {
            1.0 + (mean(held_out) - forecast_mean) / forecast_mean
        } else {
            1.0
        };
        let metrics = evaluate_forecast(held_out, &validation_forecast)
            .unwrap_or_else(|_| ValidationMetrics::poor_fit());

        let mut line_graph_data = Vec::with_capacity(n + steps + 1);
        for (offset, actual) in daily.revenue()[..train_size].iter().enumerate() {
            line_graph_data.push(LinePoint {
                date: daily.dates()[offset],
                actual: Some(*actual),
                test_predicted: None,
                future_predicted: None,
                kind: LinePointKind::Training,
            });
        }
        for (i, predicted) in validation_forecast.iter().enumerate() {
            let index = train_size + i;
            let date = daily.dates()[index];
            let revenue = damp_weekend((predicted * adjustment_factor).max(0.0), date, weekend_factor);
            line_graph_data.push(LinePoint {
                date,
                actual: Some(daily.revenue()[index]),
                test_predicted: Some(round2(revenue)),
                future_predicted: None,
                kind: LinePointKind::Test,
            });
        }
        let last_actual = daily.revenue().last().copied().unwrap_or(0.0);
        line_graph_data.push(LinePoint {
            date: last_date,
            actual: Some(last_actual),
            test_predicted: None,
            future_predicted: Some(last_actual),
            kind: LinePointKind::Bridge,
        });

        // The main model was fitted on the whole history
        let future = main.forecast(steps);
        let mut daily_forecast = Vec::with_capacity(steps);
        for (date, predicted) in future_dates(last_date, steps).into_iter().zip(future) {
            let revenue = round2(damp_weekend(predicted.max(0.0), date, weekend_factor));
            daily_forecast.push(DailyForecastEntry {
                date,
                day_name: day_name(date),
                predicted: revenue,
                is_weekend: is_weekend(date),
            });
            line_graph_data.push(LinePoint {
                date,
                actual: None,
                test_predicted: None,
                future_predicted: Some(revenue),
                kind: LinePointKind::Forecast,
            });
        }

        let total: f64 = daily_forecast.iter().map(|d| d.predicted).sum();
        let historical = trailing_sum(daily.revenue(), steps);
        let (best_case, worst_case) = scenario_band(total, metrics.mape);

        let summary = ForecastSummary {
            predicted_revenue: round2(total),
            growth_rate: round1(percent_change(total, historical)),
            best_case: round2(best_case),
            worst_case: round2(worst_case),
            daily_average: round2(total / steps as f64),
            historical_revenue: round2(historical),
        };

        let model_info = ModelInfo {
            model_type: main.order().to_string(),
            data_points: n,
            forecast_horizon: steps,
            validation_period: test_size,
            last_data_date: Some(last_date),
            train_end_date: daily.dates().get(train_size.saturating_sub(1)).copied().or(Some(first_date)),
            accuracy: round1((100.0 - metrics.mape).max(0.0)),
            mape: round1(metrics.mape),
            category_models: self.category_models.len(),
            train_size,
            test_size,
            mae_percent: round1(metrics.normalized_mae * 100.0),
            rmse_percent: round1(metrics.normalized_rmse * 100.0),
            adjustment_factor,
        };

        info!(
            steps,
            predicted_revenue = summary.predicted_revenue,
            mape = metrics.mape,
            "Generated forecast"
        );

        Ok(ForecastResult {
            summary,
            daily_forecast,
            category_forecast: self.category_entries(history, steps, train_size),
            line_graph_data,
            top_products: self.top_product_entries(history, steps, train_size),
            model_info,
            insights: trend_insights(daily),
        })
    }

    /// Per-category demand forecasts, largest total quantity first
    pub fn category_forecasts(&self, period: ForecastPeriod) -> Result<Vec<CategoryForecastEntry>> {
        let history = self.history.as_ref().ok_or(ForecastError::NoData)?;
        let steps = period.days();
        let n = history.daily().len();
        let train_size = n - validation_size(n, steps);
        Ok(self.category_entries(history, steps, train_size))
    }

    /// Forecast for one category that has a retained model
    pub fn category_forecast(&self, name: &str, period: ForecastPeriod) -> Result<CategoryForecastEntry> {
        if !self.category_models.contains_key(name) {
            return Err(ForecastError::MissingModel(format!("category '{}'", name)));
        }
        self.category_forecasts(period)?
            .into_iter()
            .find(|entry| entry.category == name)
            .ok_or_else(|| ForecastError::MissingModel(format!("category '{}'", name)))
    }

    /// Categories ranked by projected revenue
    pub fn top_products(&self, period: ForecastPeriod) -> Result<Vec<TopProductEntry>> {
        let history = self.history.as_ref().ok_or(ForecastError::NoData)?;
        let steps = period.days();
        let n = history.daily().len();
        let train_size = n - validation_size(n, steps);
        Ok(self.top_product_entries(history, steps, train_size))
    }

    fn category_entries(
        &self,
        history: &SalesHistory,
        steps: usize,
        train_size: usize,
    ) -> Vec<CategoryForecastEntry> {
        let last_date = match history.daily().last_date() {
            Some(date) => date,
            None => return Vec::new(),
        };
        let ranking_threshold = self.settings.engine.category_ranking_mape;
        let mut entries = Vec::new();

        for (name, series) in history.categories() {
            if !is_eligible(series) {
                continue;
            }

            let quantity = series.quantity_smoothed();
            let cat_train = train_size.min(quantity.len());
            if cat_train < MIN_OBSERVATIONS {
                continue;
            }
            let cat_test = quantity.len() - cat_train;

            let order = self.category_order(name, &quantity[..cat_train]);
            let validation = match self.model(order).fit(&quantity[..cat_train]) {
                Ok(fitted) => fitted.validation_metrics(cat_test.min(steps)),
                Err(err) => {
                    debug!(category = %name, error = %err, "Skipping category forecast");
                    continue;
                }
            };
            if validation.mape > ranking_threshold {
                debug!(category = %name, mape = validation.mape, "Category validation too poor to report");
                continue;
            }

            let future = match self.category_projection(name, series, order, steps) {
                Some(future) => future,
                None => continue,
            };
            let price = series
                .average_unit_price(self.settings.engine.price_window_days)
                .unwrap_or(0.0);

            let daily_forecasts: Vec<CategoryDayForecast> = future_dates(last_date, steps)
                .into_iter()
                .zip(future)
                .map(|(date, qty)| {
                    let qty = qty.max(0.0);
                    CategoryDayForecast {
                        date,
                        day_name: day_name(date),
                        predicted_quantity: qty.round(),
                        predicted_revenue: if price > 0.0 { round2(qty * price) } else { 0.0 },
                        is_weekend: is_weekend(date),
                    }
                })
                .collect();

            if daily_forecasts.is_empty() {
                continue;
            }
            let total: f64 = daily_forecasts.iter().map(|d| d.predicted_quantity).sum();
            entries.push(CategoryForecastEntry {
                category: name.clone(),
                total_predicted_quantity: total,
                daily_average: round1(total / daily_forecasts.len() as f64),
                daily_forecasts,
                validation_mape: round1(validation.mape),
            });
        }

        entries.sort_by(|a, b| b.total_predicted_quantity.total_cmp(&a.total_predicted_quantity));
        entries
    }

    fn top_product_entries(
        &self,
        history: &SalesHistory,
        steps: usize,
        train_size: usize,
    ) -> Vec<TopProductEntry> {
        let mut products = Vec::new();

        for (name, series) in history.categories() {
            if !is_eligible(series) {
                continue;
            }

            let quantity = series.quantity_smoothed();
            let cat_train = train_size.min(quantity.len());
            if cat_train < MIN_OBSERVATIONS {
                continue;
            }

            let price = match series.average_unit_price(self.settings.engine.price_window_days) {
                Some(price) => price,
                None => continue,
            };

            let order = self.category_order(name, &quantity[..cat_train]);
            let future = match self.category_projection(name, series, order, steps) {
                Some(future) => future,
                None => continue,
            };

            let total_quantity: f64 = future.iter().map(|q| q.max(0.0)).sum();
            let predicted_sales = total_quantity * price;
            let recent_quantity = trailing_sum(series.quantity(), steps);

            if predicted_sales > 0.0 {
                products.push(TopProductEntry {
                    name: name.clone(),
                    predicted_sales: round2(predicted_sales),
                    predicted_quantity: total_quantity.floor(),
                    growth: round1(percent_change(total_quantity, recent_quantity)),
                    avg_price: round2(price),
                });
            }
        }

        products.sort_by(|a, b| b.predicted_sales.total_cmp(&a.predicted_sales));
        products.truncate(self.settings.engine.top_products_limit);
        products
    }

    /// Order of the retained model, or a small search on the training slice
    fn category_order(&self, name: &str, train: &[f64]) -> ModelOrder {
        match self.category_models.get(name) {
            Some(model) => model.fitted.requested_order(),
            None => self.category_selector().select(train).order,
        }
    }

    /// Future quantities from the retained model, or from a fresh fit
    fn category_projection(
        &self,
        name: &str,
        series: &DailySeries,
        order: ModelOrder,
        steps: usize,
    ) -> Option<Vec<f64>> {
        if let Some(model) = self.category_models.get(name) {
            if model.fitted.requested_order() == order {
                return Some(model.fitted.forecast(steps));
            }
        }

        match self.model(order).fit(series.quantity_smoothed()) {
            Ok(fitted) => Some(fitted.forecast(steps)),
            Err(err) => {
                debug!(category = %name, error = %err, "Category projection failed");
                None
            }
        }
    }

    /// Holdout scores of the main model
    pub fn metrics(&self, period: ForecastPeriod) -> Result<MetricsReport> {
        let main = self
            .main_model
            .as_ref()
            .ok_or_else(|| ForecastError::MissingModel("main revenue series".to_string()))?;

        let steps = period.days();
        let metrics = main.validation_metrics(steps);
        let (train_size, test_size) = if metrics.reliable {
            holdout_sizes(main.observations().len(), steps).unwrap_or((0, 0))
        } else {
            (0, 0)
        };

        Ok(MetricsReport {
            main_model: MainModelMetrics {
                model_type: main.order().to_string(),
                metrics,
                accuracy: round1((100.0 - metrics.mape).max(0.0)),
                forecast_period: period,
                train_size,
                test_size,
            },
            data_points: self.history.as_ref().map_or(0, |h| h.daily().len()),
            category_models: self.category_models.len(),
        })
    }

    /// Coefficients and in-sample diagnostics of the fitted models
    pub fn model_info(&self) -> Result<ModelInfoReport> {
        let main = self
            .main_model
            .as_ref()
            .ok_or_else(|| ForecastError::MissingModel("main revenue series".to_string()))?;

        let aic = main.aic();
        Ok(ModelInfoReport {
            model_type: main.order().to_string(),
            ar_coefficients: main.ar_coefficients().to_vec(),
            ma_coefficients: main.ma_coefficients().to_vec(),
            mean: main.mean(),
            aic: aic.is_finite().then_some(aic),
            ar_fallback: main.used_ar_fallback(),
            residuals: main.diagnostics(),
            data_points: main.observations().len(),
            category_models: self
                .category_models
                .iter()
                .map(|(name, model)| CategoryModelInfo {
                    name: name.clone(),
                    model_type: model.fitted.order().to_string(),
                    validation_mape: round1(model.validation.mape),
                })
                .collect(),
        })
    }

    pub fn data_status(&self) -> DataStatus {
        let history = match &self.history {
            Some(history) => history,
            None => {
                return DataStatus {
                    data_available: false,
                    record_count: 0,
                    daily_points: 0,
                    models_trained: false,
                    category_models: 0,
                    categories: Vec::new(),
                }
            }
        };

        DataStatus {
            data_available: true,
            record_count: history.record_count(),
            daily_points: history.daily().len(),
            models_trained: self.main_model.is_some(),
            category_models: self.category_models.len(),
            categories: history
                .categories()
                .iter()
                .map(|(name, series)| CategoryStatus {
                    name: name.clone(),
                    data_points: series.len(),
                    total_quantity: series.total_quantity(),
                    total_revenue: round2(series.total_revenue()),
                    has_model: self.category_models.contains_key(name),
                })
                .collect(),
        }
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            engine: ENGINE_NAME.to_string(),
            timestamp: Utc::now(),
            models: HealthModels {
                main: self.main_model.is_some(),
                categories: self.category_models.len(),
                data_loaded: self.history.is_some(),
            },
        }
    }
}

/// Categories need two weeks of history and at least one unit sold
fn is_eligible(series: &DailySeries) -> bool {
    series.len() >= MIN_SEARCH_OBSERVATIONS && series.total_quantity() > 0.0
}

fn damp_weekend(value: f64, date: NaiveDate, factor: f64) -> f64 {
    if is_weekend(date) {
        value * factor
    } else {
        value
    }
}

/// Best and worst case around `total` for a holdout MAPE in percent
///
/// The uncertainty is the MAPE as a fraction, capped at 0.5. The upside
/// widens by half of it and the downside by 0.3 of it.
fn scenario_band(total: f64, mape: f64) -> (f64, f64) {
    let uncertainty = (mape / 100.0).min(0.5);
    (total * (1.0 + 0.5 * uncertainty), total * (1.0 - 0.3 * uncertainty))
}

fn day_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Weekday pattern, direction and volatility of daily revenue
///
/// Needs at least two weeks of history.
pub fn trend_insights(daily: &DailySeries) -> Option<TrendInsights> {
    let revenue = daily.revenue();
    if revenue.len() < 2 * TREND_WINDOW {
        return None;
    }

    let mut totals = [0.0_f64; 7];
    let mut counts = [0_usize; 7];
    for (date, value) in daily.dates().iter().zip(revenue) {
        let index = date.weekday().num_days_from_monday() as usize;
        totals[index] += value;
        counts[index] += 1;
    }
    let averages: Vec<(Weekday, f64)> = WEEK
        .iter()
        .enumerate()
        .filter(|(i, _)| counts[*i] > 0)
        .map(|(i, day)| (*day, totals[i] / counts[i] as f64))
        .collect();

    let peak = averages.iter().max_by(|a, b| a.1.total_cmp(&b.1))?;
    let low = averages.iter().min_by(|a, b| a.1.total_cmp(&b.1))?;

    let head = mean(&revenue[..TREND_WINDOW]);
    let tail = mean(&revenue[revenue.len() - TREND_WINDOW..]);
    let trend = if tail > head {
        TrendDirection::Increasing
    } else if tail < head {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    let average = mean(revenue);
    let coefficient_of_variation = if average > 0.0 {
        std_dev(revenue) / average
    } else {
        0.0
    };

    Some(TrendInsights {
        peak_day: weekday_name(peak.0).to_string(),
        low_day: weekday_name(low.0).to_string(),
        trend,
        trend_change: round1(percent_change(tail, head)),
        coefficient_of_variation: round2(coefficient_of_variation),
        volatile: coefficient_of_variation > VOLATILITY_THRESHOLD,
    })
}
