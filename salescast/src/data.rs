//! Transaction ingestion and daily aggregation
//!
//! Transactions come either from memory or from a CSV file read with
//! polars. Completed transactions are rolled up into gap-free daily series,
//! one for the whole store and one per product category.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use series_math::moving_averages::{centered_rolling_mean, trailing_sum};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Window of the centered smoothing pass applied before modeling
pub const SMOOTHING_WINDOW: usize = 3;

const COMPLETED: &str = "completed";

/// One cleaned sales transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Order status label, e.g. "Completed" or "Cancelled"
    pub status: String,
    /// Product category label
    pub category: String,
    /// Total price paid
    pub revenue: f64,
    pub quantity: f64,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        status: impl Into<String>,
        category: impl Into<String>,
        revenue: f64,
        quantity: f64,
    ) -> Self {
        Self {
            date,
            status: status.into(),
            category: category.into(),
            revenue,
            quantity,
        }
    }

    /// Shorthand for a transaction with status "Completed"
    pub fn completed(date: NaiveDate, category: impl Into<String>, revenue: f64, quantity: f64) -> Self {
        Self::new(date, "Completed", category, revenue, quantity)
    }

    pub fn is_completed(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(COMPLETED)
    }
}

/// Loader for transaction files
#[derive(Debug)]
pub struct TransactionLog;

/// Column names resolved from a file header
#[derive(Debug, Clone, PartialEq)]
struct TransactionColumns {
    date: String,
    status: Option<String>,
    category: String,
    revenue: String,
    quantity: String,
}

impl TransactionLog {
    /// Load transactions from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        let transactions = Self::from_dataframe(&df)?;
        if transactions.is_empty() {
            return Err(ForecastError::DataLoad {
                path: path.display().to_string(),
                reason: "no usable transactions".to_string(),
            });
        }

        info!(
            path = %path.display(),
            rows = df.height(),
            transactions = transactions.len(),
            "Loaded transaction log"
        );
        Ok(transactions)
    }

    /// Extract transactions from an existing DataFrame
    ///
    /// Rows with an unparseable date, a missing category, or a missing,
    /// negative or non-finite amount are dropped. Without a status column
    /// every row counts as completed.
    pub fn from_dataframe(df: &DataFrame) -> Result<Vec<Transaction>> {
        let columns = Self::detect_columns(df)?;

        let dates = Self::string_column(df, &columns.date)?;
        let categories = Self::string_column(df, &columns.category)?;
        let revenues = Self::float_column(df, &columns.revenue)?;
        let quantities = Self::float_column(df, &columns.quantity)?;
        let statuses = match &columns.status {
            Some(name) => Self::string_column(df, name)?,
            None => vec![Some("Completed".to_string()); df.height()],
        };

        let mut transactions = Vec::with_capacity(df.height());
        let mut dropped = 0usize;

        for i in 0..df.height() {
            let date = dates[i].as_deref().and_then(parse_date);
            let category = categories[i]
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty());
            let revenue = revenues[i].filter(|v| v.is_finite() && *v >= 0.0);
            let quantity = quantities[i].filter(|v| v.is_finite() && *v >= 0.0);

            match (date, category, revenue, quantity) {
                (Some(date), Some(category), Some(revenue), Some(quantity)) => {
                    let status = statuses[i].as_deref().unwrap_or("").trim().to_string();
                    transactions.push(Transaction::new(date, status, category, revenue, quantity));
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(dropped, "Dropped invalid transaction rows");
        }
        Ok(transactions)
    }

    fn detect_columns(df: &DataFrame) -> Result<TransactionColumns> {
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();

        let find = |patterns: &[&str]| -> Option<String> {
            // Exact matches win over substring matches
            for pattern in patterns {
                if let Some(name) = names.iter().find(|n| normalize_header(n) == *pattern) {
                    return Some(name.clone());
                }
            }
            for pattern in patterns {
                if let Some(name) = names.iter().find(|n| normalize_header(n).contains(pattern)) {
                    return Some(name.clone());
                }
            }
            None
        };

        let require = |found: Option<String>, what: &str| {
            found.ok_or_else(|| ForecastError::DataError(format!("No {} column found in data", what)))
        };

        Ok(TransactionColumns {
            date: require(find(&["date", "purchase_date"]), "date")?,
            status: find(&["order_status", "status"]),
            category: require(find(&["product_type", "category", "product"]), "category")?,
            revenue: require(find(&["revenue", "total_price", "sales"]), "revenue")?,
            quantity: require(find(&["quantity", "units"]), "quantity")?,
        })
    }

    fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
        let col = df.column(name)?.cast(&DataType::Utf8)?;
        let values = col
            .utf8()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(values)
    }

    fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
        let col = df.column(name)?.cast(&DataType::Float64)?;
        let values = col.f64()?.into_iter().collect();
        Ok(values)
    }
}

fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Parse the calendar date at the start of a date or timestamp string
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%m/%d/%Y"))
        .ok()
}

/// Gap-free daily totals with their smoothed counterparts
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    revenue: Vec<f64>,
    quantity: Vec<f64>,
    revenue_smoothed: Vec<f64>,
    quantity_smoothed: Vec<f64>,
}

impl DailySeries {
    /// Build a series covering `start..=end`; days without totals are zero
    pub fn from_totals(
        start: NaiveDate,
        end: NaiveDate,
        totals: &BTreeMap<NaiveDate, (f64, f64)>,
    ) -> Result<Self> {
        if end < start {
            return Err(ForecastError::DataError(format!(
                "Series end {} precedes start {}",
                end, start
            )));
        }

        let days = (end - start).num_days() as usize + 1;
        let mut dates = Vec::with_capacity(days);
        let mut revenue = Vec::with_capacity(days);
        let mut quantity = Vec::with_capacity(days);

        for offset in 0..days {
            let date = start + Duration::days(offset as i64);
            let (rev, qty) = totals.get(&date).copied().unwrap_or((0.0, 0.0));
            dates.push(date);
            revenue.push(rev);
            quantity.push(qty);
        }

        let revenue_smoothed = centered_rolling_mean(&revenue, SMOOTHING_WINDOW)?;
        let quantity_smoothed = centered_rolling_mean(&quantity, SMOOTHING_WINDOW)?;

        Ok(Self {
            dates,
            revenue,
            quantity,
            revenue_smoothed,
            quantity_smoothed,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn revenue(&self) -> &[f64] {
        &self.revenue
    }

    pub fn quantity(&self) -> &[f64] {
        &self.quantity
    }

    pub fn revenue_smoothed(&self) -> &[f64] {
        &self.revenue_smoothed
    }

    pub fn quantity_smoothed(&self) -> &[f64] {
        &self.quantity_smoothed
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn total_revenue(&self) -> f64 {
        self.revenue.iter().sum()
    }

    pub fn total_quantity(&self) -> f64 {
        self.quantity.iter().sum()
    }

    /// Revenue per unit over the trailing `window` days, if any units sold
    pub fn average_unit_price(&self, window: usize) -> Option<f64> {
        let units = trailing_sum(&self.quantity, window);
        if units > 0.0 {
            Some(trailing_sum(&self.revenue, window) / units)
        } else {
            None
        }
    }
}

/// Completed sales rolled up per day, overall and per category
#[derive(Debug, Clone, PartialEq)]
pub struct SalesHistory {
    daily: DailySeries,
    categories: BTreeMap<String, DailySeries>,
    record_count: usize,
}

impl SalesHistory {
    /// Aggregate the completed transactions; `None` when there are none
    pub fn from_transactions(transactions: &[Transaction]) -> Result<Option<Self>> {
        let completed: Vec<&Transaction> = transactions.iter().filter(|t| t.is_completed()).collect();
        let (start, end) = match (
            completed.iter().map(|t| t.date).min(),
            completed.iter().map(|t| t.date).max(),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => return Ok(None),
        };

        let mut overall: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
        let mut per_category: BTreeMap<String, BTreeMap<NaiveDate, (f64, f64)>> = BTreeMap::new();

        for t in &completed {
            let entry = overall.entry(t.date).or_insert((0.0, 0.0));
            entry.0 += t.revenue;
            entry.1 += t.quantity;

            let entry = per_category
                .entry(t.category.clone())
                .or_default()
                .entry(t.date)
                .or_insert((0.0, 0.0));
            entry.0 += t.revenue;
            entry.1 += t.quantity;
        }

        let daily = DailySeries::from_totals(start, end, &overall)?;
        let categories = per_category
            .iter()
            .map(|(name, totals)| Ok((name.clone(), DailySeries::from_totals(start, end, totals)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        debug!(
            days = daily.len(),
            categories = categories.len(),
            %start,
            %end,
            "Prepared daily sales series"
        );

        Ok(Some(Self {
            daily,
            categories,
            record_count: completed.len(),
        }))
    }

    pub fn daily(&self) -> &DailySeries {
        &self.daily
    }

    pub fn categories(&self) -> &BTreeMap<String, DailySeries> {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&DailySeries> {
        self.categories.get(name)
    }

    /// Number of completed transactions aggregated
    pub fn record_count(&self) -> usize {
        self.record_count
    }
}
