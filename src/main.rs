use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use salescast::config::{LoggingSettings, Settings};
use salescast::{ForecastPeriod, ForecastService};
use serde::Serialize;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

/// Revenue and category demand forecasts from a transaction log
#[derive(Debug, Parser)]
#[command(name = "salescast", version, about)]
struct Cli {
    /// Settings file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<String>,

    /// Transaction CSV, overriding the configured file
    #[arg(long, global = true)]
    data: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Full forecast payload for the next 7 or 15 days
    Forecast {
        #[arg(long, default_value = "7days")]
        period: ForecastPeriod,
    },
    /// Holdout scores of the main revenue model
    Metrics {
        #[arg(long, default_value = "7days")]
        period: ForecastPeriod,
    },
    /// Demand forecasts for every category that can be projected
    Categories {
        #[arg(long, default_value = "7days")]
        period: ForecastPeriod,
    },
    /// Demand forecast for one category with a retained model
    Category {
        name: String,
        #[arg(long, default_value = "7days")]
        period: ForecastPeriod,
    },
    /// Categories ranked by projected revenue
    TopProducts {
        #[arg(long, default_value = "7days")]
        period: ForecastPeriod,
    },
    /// Coefficients and diagnostics of the fitted models
    ModelInfo,
    /// What data is loaded and which models exist
    Status,
    /// Liveness summary
    Health,
    /// Reload the transaction file and refit every model
    Retrain,
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path))?,
        None => Settings::new().context("Failed to load settings")?,
    };
    if let Some(data) = &cli.data {
        settings.data.file = data.clone();
    }
    Ok(settings)
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "compact" => builder.compact().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[instrument(skip_all)]
fn run(cli: Cli, settings: Settings) -> Result<()> {
    let service = ForecastService::new(settings);
    info!(path = %service.data_path().display(), "Forecast service ready");

    match cli.command {
        Command::Forecast { period } => print_json(&service.generate_forecast(period)),
        Command::Metrics { period } => print_json(&service.metrics(period)?),
        Command::Categories { period } => print_json(&service.category_forecasts(period)?),
        Command::Category { name, period } => print_json(&service.category_forecast(&name, period)?),
        Command::TopProducts { period } => print_json(&service.top_products(period)?),
        Command::ModelInfo => print_json(&service.model_info()?),
        Command::Status => print_json(&service.data_status()),
        Command::Health => print_json(&service.health()),
        Command::Retrain => print_json(&service.retrain()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    init_tracing(&settings.logging);

    run(cli, settings)
}
