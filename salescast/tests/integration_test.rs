use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use salescast::config::Settings;
use salescast::metrics::evaluate_forecast;
use salescast::report::LinePointKind;
use salescast::utils::{is_weekend, percent_change, round1, round2};
use salescast::{ArimaModel, EngineSnapshot, ForecastError, ForecastPeriod, ForecastService, Transaction};
use series_math::moving_averages::trailing_sum;
use series_math::statistics::mean;
use std::io::Write;
use tempfile::NamedTempFile;

const PATTERN: [f64; 7] = [100.0, 120.0, 90.0, 110.0, 130.0, 95.0, 105.0];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

// Helper building a store history with a sellable category and a
// category that never records a unit
fn create_transactions(days: usize) -> Vec<Transaction> {
    (0..days)
        .flat_map(|i| {
            let date = start() + Duration::days(i as i64);
            let revenue = PATTERN[i % 7];
            vec![
                Transaction::completed(date, "Smartphone", revenue * 0.7, 2.0 + (i % 3) as f64),
                Transaction::completed(date, "Smartwatch", revenue * 0.3, 1.0 + (i % 2) as f64),
                Transaction::completed(date, "Gift Card", 5.0, 0.0),
                Transaction::new(date, "Cancelled", "Smartphone", 999.0, 9.0),
            ]
        })
        .collect()
}

fn create_sample_csv(days: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Purchase Date,Order Status,Product Type,Total Price,Quantity").unwrap();
    for t in create_transactions(days) {
        writeln!(
            file,
            "{},{},{},{},{}",
            t.date.format("%Y-%m-%d"),
            t.status,
            t.category,
            t.revenue,
            t.quantity
        )
        .unwrap();
    }
    file
}

fn settings_for(path: &str) -> Settings {
    let mut settings = Settings::default();
    settings.data.file = path.to_string();
    settings
}

#[test]
fn test_empty_forecast_without_model() {
    let snapshot = EngineSnapshot::build(&create_transactions(8), &Settings::default()).unwrap();
    let result = snapshot.generate_forecast(ForecastPeriod::FifteenDays);

    assert!(result.is_empty());
    assert_eq!(result.summary.predicted_revenue, 0.0);
    assert_eq!(result.summary.growth_rate, 0.0);
    assert!(result.daily_forecast.is_empty());
    assert!(result.line_graph_data.is_empty());
    assert!(result.top_products.is_empty());
}

#[test]
fn test_cancelled_orders_are_ignored() {
    let snapshot = EngineSnapshot::build(&create_transactions(21), &Settings::default()).unwrap();
    let daily = snapshot.history().unwrap().daily();

    assert_eq!(daily.revenue()[0], PATTERN[0] * 0.7 + PATTERN[0] * 0.3 + 5.0);
}

#[test]
fn test_zero_quantity_category_never_gets_model() {
    let snapshot = EngineSnapshot::build(&create_transactions(42), &Settings::default()).unwrap();

    assert!(snapshot.main_model().is_some());
    assert!(snapshot.category_model("Gift Card").is_none());

    let status = snapshot.data_status();
    let gift_card = status.categories.iter().find(|c| c.name == "Gift Card").unwrap();
    assert_eq!(gift_card.total_quantity, 0.0);
    assert!(!gift_card.has_model);

    let forecast = snapshot.generate_forecast(ForecastPeriod::SevenDays);
    assert!(forecast.category_forecast.iter().all(|c| c.category != "Gift Card"));
    assert!(forecast.top_products.iter().all(|p| p.name != "Gift Card"));
}

#[test]
fn test_forecast_payload_structure() {
    let snapshot = EngineSnapshot::build(&create_transactions(42), &Settings::default()).unwrap();
    let result = snapshot.generate_forecast(ForecastPeriod::SevenDays);

    assert!(!result.is_empty());
    assert_eq!(result.daily_forecast.len(), 7);
    assert_eq!(
        result.daily_forecast[0].date,
        start() + Duration::days(42)
    );

    let bridges: Vec<_> = result
        .line_graph_data
        .iter()
        .filter(|p| p.kind == LinePointKind::Bridge)
        .collect();
    assert_eq!(bridges.len(), 1);
    assert_eq!(bridges[0].actual, bridges[0].future_predicted);

    for entry in &result.daily_forecast {
        assert!(entry.predicted >= 0.0);
        assert_eq!(entry.day_name, entry.date.format("%A").to_string());
    }

    let categories = &result.category_forecast;
    for pair in categories.windows(2) {
        assert!(pair[0].total_predicted_quantity >= pair[1].total_predicted_quantity);
    }
    for pair in result.top_products.windows(2) {
        assert!(pair[0].predicted_sales >= pair[1].predicted_sales);
    }
    assert!(result.top_products.len() <= 10);
    assert!(result.insights.is_some());
}

#[test]
fn test_weekend_days_are_damped() {
    let settings = Settings::default();
    let snapshot = EngineSnapshot::build(&create_transactions(42), &settings).unwrap();
    let result = snapshot.generate_forecast(ForecastPeriod::FifteenDays);
    let projection = snapshot.main_model().unwrap().forecast(15);

    let mut weekend_days = 0;
    for (entry, raw) in result.daily_forecast.iter().zip(&projection) {
        let expected = if entry.is_weekend {
            weekend_days += 1;
            raw.max(0.0) * settings.engine.weekend_factor
        } else {
            raw.max(0.0)
        };
        assert_eq!(entry.predicted, round2(expected));
    }
    assert_eq!(weekend_days, 4);
}

#[test]
fn test_summary_follows_holdout_forecast() {
    let settings = Settings::default();
    let snapshot = EngineSnapshot::build(&create_transactions(42), &settings).unwrap();
    let result = snapshot.generate_forecast(ForecastPeriod::SevenDays);
    let daily = snapshot.history().unwrap().daily();
    let info = &result.model_info;

    // Refit the main order on the training part, as the engine does
    let smoothed = daily.revenue_smoothed();
    let order = snapshot.main_model().unwrap().requested_order();
    let validation_forecast = ArimaModel::new(order)
        .fit(&smoothed[..info.train_size])
        .unwrap()
        .forecast(info.test_size);
    let held_out = &smoothed[info.train_size..];

    let adjustment = mean(held_out) / mean(&validation_forecast);
    assert_relative_eq!(info.adjustment_factor, adjustment, max_relative = 1e-9);

    let test_points: Vec<_> = result
        .line_graph_data
        .iter()
        .filter(|p| p.kind == LinePointKind::Test)
        .collect();
    assert_eq!(test_points.len(), info.test_size);
    for (point, predicted) in test_points.iter().zip(&validation_forecast) {
        let adjusted = (predicted * info.adjustment_factor).max(0.0);
        let expected = if is_weekend(point.date) {
            adjusted * settings.engine.weekend_factor
        } else {
            adjusted
        };
        assert_relative_eq!(point.test_predicted.unwrap(), round2(expected), epsilon = 0.011);
    }

    // Growth against the trailing week of actual revenue
    let total: f64 = result.daily_forecast.iter().map(|d| d.predicted).sum();
    let historical = trailing_sum(daily.revenue(), 7);
    assert_eq!(result.summary.predicted_revenue, round2(total));
    assert_eq!(result.summary.historical_revenue, round2(historical));
    assert_eq!(result.summary.growth_rate, round1(percent_change(total, historical)));

    // Band widths come from the unadjusted holdout MAPE
    let mape = evaluate_forecast(held_out, &validation_forecast).unwrap().mape;
    let uncertainty = (mape / 100.0).min(0.5);
    assert_eq!(result.summary.best_case, round2(total * (1.0 + 0.5 * uncertainty)));
    assert_eq!(result.summary.worst_case, round2(total * (1.0 - 0.3 * uncertainty)));
}

#[test]
fn test_category_rejection_threshold() {
    let baseline = EngineSnapshot::build(&create_transactions(42), &Settings::default()).unwrap();
    let (worst_name, worst) = baseline
        .category_models()
        .iter()
        .max_by(|a, b| a.1.validation.mape.total_cmp(&b.1.validation.mape))
        .expect("at least one category model is retained");

    // Retention needs a MAPE strictly below the threshold
    let mut settings = Settings::default();
    settings.engine.category_rejection_mape = worst.validation.mape;
    let strict = EngineSnapshot::build(&create_transactions(42), &settings).unwrap();

    assert!(strict.category_model(worst_name).is_none());
    assert!(strict.category_models().len() < baseline.category_models().len());
    for model in strict.category_models().values() {
        assert!(model.validation.mape < worst.validation.mape);
    }

    settings.engine.category_rejection_mape = 0.0;
    let none = EngineSnapshot::build(&create_transactions(42), &settings).unwrap();
    assert!(none.category_models().is_empty());
    assert!(none.main_model().is_some());
}

#[test]
fn test_service_queries() {
    let service =
        ForecastService::from_transactions(&create_transactions(42), settings_for("unused.csv")).unwrap();

    let metrics = service.metrics(ForecastPeriod::SevenDays).unwrap();
    assert_eq!(metrics.data_points, 42);
    assert!(metrics.main_model.metrics.mae >= 0.0);

    let info = service.model_info().unwrap();
    assert_eq!(info.data_points, 42);
    assert_eq!(info.ar_coefficients.len(), service.snapshot().main_model().unwrap().order().p);
    assert!(info.ar_coefficients.iter().all(|c| c.abs() <= 0.95));

    let report = service.category_forecasts(ForecastPeriod::FifteenDays).unwrap();
    assert_eq!(report.forecast_steps, 15);
    assert_eq!(report.total_categories, report.categories.len());
    for category in &report.categories {
        assert_eq!(category.daily_forecasts.len(), 15);
    }

    assert!(matches!(
        service.category_forecast("Gift Card", ForecastPeriod::SevenDays),
        Err(ForecastError::MissingModel(_))
    ));

    let health = service.health();
    assert_eq!(health.status, "healthy");
    assert!(health.models.main);
}

#[test]
fn test_service_from_csv_and_retrain() {
    let file = create_sample_csv(35);
    let path = file.path().to_str().unwrap().to_string();
    let service = ForecastService::new(settings_for(&path));

    let status = service.data_status();
    assert!(status.data_available);
    assert_eq!(status.daily_points, 35);
    assert!(status.models_trained);

    let forecast = service.generate_forecast(ForecastPeriod::SevenDays);
    assert_eq!(forecast.model_info.data_points, 35);

    let outcome = service.retrain();
    assert!(outcome.success);
    assert!(outcome.main_model);

    // Replace the file with too little history: the retrain succeeds but
    // leaves no main model
    let short = create_sample_csv(5);
    std::fs::copy(short.path(), file.path()).unwrap();
    let outcome = service.retrain();
    assert!(outcome.success);
    assert!(!outcome.main_model);
    assert!(service.generate_forecast(ForecastPeriod::SevenDays).is_empty());
}

#[test]
fn test_concurrent_readers_during_retrain() {
    let service = std::sync::Arc::new(
        ForecastService::from_transactions(&create_transactions(30), settings_for("unused.csv")).unwrap(),
    );

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = std::sync::Arc::clone(&service);
            std::thread::spawn(move || {
                for _ in 0..3 {
                    let result = service.generate_forecast(ForecastPeriod::SevenDays);
                    assert_eq!(result.daily_forecast.len(), 7);
                }
            })
        })
        .collect();

    let outcome = service.retrain_with(&create_transactions(35));
    assert!(outcome.success);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(service.data_status().daily_points, 35);
}
