//! Typed payloads returned by the forecasting service
//!
//! Everything here serializes with camelCase field names.

use crate::metrics::{ResidualDiagnostics, ValidationMetrics};
use crate::utils::ForecastPeriod;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Model label reported when nothing has been fitted
pub const NO_MODEL: &str = "No model";

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummary {
    pub predicted_revenue: f64,
    /// Percent change against the same number of trailing historical days
    pub growth_rate: f64,
    pub best_case: f64,
    pub worst_case: f64,
    pub daily_average: f64,
    pub historical_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecastEntry {
    pub date: NaiveDate,
    pub day_name: String,
    pub predicted: f64,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDayForecast {
    pub date: NaiveDate,
    pub day_name: String,
    pub predicted_quantity: f64,
    pub predicted_revenue: f64,
    pub is_weekend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForecastEntry {
    pub category: String,
    pub total_predicted_quantity: f64,
    pub daily_average: f64,
    pub daily_forecasts: Vec<CategoryDayForecast>,
    pub validation_mape: f64,
}

/// Role of a point in the chart series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePointKind {
    Training,
    Test,
    /// Last observed day, repeated so the forecast line joins the history
    Bridge,
    Forecast,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePoint {
    pub date: NaiveDate,
    pub actual: Option<f64>,
    pub test_predicted: Option<f64>,
    pub future_predicted: Option<f64>,
    #[serde(rename = "type")]
    pub kind: LinePointKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProductEntry {
    pub name: String,
    pub predicted_sales: f64,
    pub predicted_quantity: f64,
    /// Percent change of quantity against the trailing days
    pub growth: f64,
    pub avg_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(rename = "type")]
    pub model_type: String,
    pub data_points: usize,
    pub forecast_horizon: usize,
    pub validation_period: usize,
    pub last_data_date: Option<NaiveDate>,
    pub train_end_date: Option<NaiveDate>,
    /// `100 - MAPE`, floored at zero
    pub accuracy: f64,
    pub mape: f64,
    pub category_models: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub mae_percent: f64,
    pub rmse_percent: f64,
    pub adjustment_factor: f64,
}

impl ModelInfo {
    fn empty() -> Self {
        Self {
            model_type: NO_MODEL.to_string(),
            data_points: 0,
            forecast_horizon: 0,
            validation_period: 0,
            last_data_date: None,
            train_end_date: None,
            accuracy: 0.0,
            mape: 0.0,
            category_models: 0,
            train_size: 0,
            test_size: 0,
            mae_percent: 0.0,
            rmse_percent: 0.0,
            adjustment_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Descriptive observations about the revenue history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendInsights {
    /// Weekday with the highest average revenue
    pub peak_day: String,
    /// Weekday with the lowest average revenue
    pub low_day: String,
    pub trend: TrendDirection,
    /// Percent change of the last week's mean against the first week's
    pub trend_change: f64,
    pub coefficient_of_variation: f64,
    pub volatile: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub summary: ForecastSummary,
    pub daily_forecast: Vec<DailyForecastEntry>,
    pub category_forecast: Vec<CategoryForecastEntry>,
    pub line_graph_data: Vec<LinePoint>,
    pub top_products: Vec<TopProductEntry>,
    pub model_info: ModelInfo,
    pub insights: Option<TrendInsights>,
}

impl ForecastResult {
    /// Result returned when no model is available: zero summary, no entries
    pub fn empty() -> Self {
        Self {
            summary: ForecastSummary::default(),
            daily_forecast: Vec::new(),
            category_forecast: Vec::new(),
            line_graph_data: Vec::new(),
            top_products: Vec::new(),
            model_info: ModelInfo::empty(),
            insights: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.model_info.model_type == NO_MODEL
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainModelMetrics {
    #[serde(rename = "type")]
    pub model_type: String,
    #[serde(flatten)]
    pub metrics: ValidationMetrics,
    pub accuracy: f64,
    pub forecast_period: ForecastPeriod,
    pub train_size: usize,
    pub test_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub main_model: MainModelMetrics,
    pub data_points: usize,
    pub category_models: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub categories: Vec<CategoryForecastEntry>,
    pub period: ForecastPeriod,
    pub forecast_steps: usize,
    pub total_categories: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryModelInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub validation_mape: f64,
}

/// Coefficients and in-sample error of the main model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfoReport {
    #[serde(rename = "type")]
    pub model_type: String,
    pub ar_coefficients: Vec<f64>,
    pub ma_coefficients: Vec<f64>,
    pub mean: f64,
    /// Absent when undefined
    pub aic: Option<f64>,
    pub ar_fallback: bool,
    pub residuals: ResidualDiagnostics,
    pub data_points: usize,
    pub category_models: Vec<CategoryModelInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatus {
    pub name: String,
    pub data_points: usize,
    pub total_quantity: f64,
    pub total_revenue: f64,
    pub has_model: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStatus {
    pub data_available: bool,
    pub record_count: usize,
    pub daily_points: usize,
    pub models_trained: bool,
    pub category_models: usize,
    pub categories: Vec<CategoryStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthModels {
    pub main: bool,
    pub categories: usize,
    pub data_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: String,
    pub engine: String,
    pub timestamp: DateTime<Utc>,
    pub models: HealthModels,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrainOutcome {
    pub success: bool,
    pub message: String,
    pub main_model: bool,
    pub category_models: usize,
    pub categories: Vec<String>,
}
