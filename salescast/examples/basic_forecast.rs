use chrono::{Duration, NaiveDate};
use salescast::config::Settings;
use salescast::models::order::OrderSelector;
use salescast::models::ModelOrder;
use salescast::{ArimaModel, ForecastPeriod, ForecastService, Transaction};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Salescast: Basic Forecasting Example");
    println!("====================================\n");

    // Create sample data
    println!("Creating sample transactions...");
    let transactions = create_sample_transactions(56);
    println!("Sample data created: {} transactions\n", transactions.len());

    // Fit a single model by hand first
    let revenue: Vec<f64> = daily_revenue(&transactions);
    let selection = OrderSelector::default().select(&revenue);
    println!(
        "Selected {} (AIC {:.2}) out of {} candidates",
        selection.order,
        selection.aic,
        selection.candidates.len()
    );

    let fitted = ArimaModel::new(selection.order).fit(&revenue)?;
    println!("AR coefficients: {:?}", fitted.ar_coefficients());
    println!("MA coefficients: {:?}", fitted.ma_coefficients());
    println!("Holdout: {}\n", fitted.validation_metrics(7));

    let fixed = ArimaModel::new(ModelOrder::new(1, 1, 1)).fit(&revenue)?;
    println!("ARIMA(1,1,1) next week: {:.2?}\n", fixed.forecast(7));

    // Then let the service do the whole pipeline
    println!("Building forecast service...");
    let service = ForecastService::from_transactions(&transactions, Settings::default())?;

    let forecast = service.generate_forecast(ForecastPeriod::SevenDays);
    println!(
        "Predicted revenue: {:.2} (best {:.2}, worst {:.2}, growth {:.1}%)",
        forecast.summary.predicted_revenue,
        forecast.summary.best_case,
        forecast.summary.worst_case,
        forecast.summary.growth_rate
    );
    for day in &forecast.daily_forecast {
        println!("  {} {:<9} {:>8.2}", day.date, day.day_name, day.predicted);
    }

    println!("\nCategory demand:");
    for category in &forecast.category_forecast {
        println!(
            "  {:<12} {:>5} units (validation MAPE {:.1}%)",
            category.category, category.total_predicted_quantity, category.validation_mape
        );
    }

    if let Some(insights) = &forecast.insights {
        println!(
            "\nBusiest day: {}, quietest day: {}, trend {:?}",
            insights.peak_day, insights.low_day, insights.trend
        );
    }

    Ok(())
}

fn create_sample_transactions(days: usize) -> Vec<Transaction> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap_or_default();
    let weekly = [1.0, 1.1, 0.9, 1.0, 1.3, 1.4, 0.8];

    (0..days)
        .flat_map(|i| {
            let date = start + Duration::days(i as i64);
            let growth = 1.0 + i as f64 * 0.005;
            let factor = weekly[i % 7] * growth;
            vec![
                Transaction::completed(date, "Smartphone", 650.0 * factor, (2.0 * factor).round()),
                Transaction::completed(date, "Laptop", 1100.0 * factor, factor.round()),
                Transaction::completed(date, "Headphones", 80.0 * factor, (4.0 * factor).round()),
            ]
        })
        .collect()
}

fn daily_revenue(transactions: &[Transaction]) -> Vec<f64> {
    let mut totals = std::collections::BTreeMap::new();
    for t in transactions {
        *totals.entry(t.date).or_insert(0.0) += t.revenue;
    }
    totals.into_values().collect()
}
