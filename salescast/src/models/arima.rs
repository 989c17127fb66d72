//! ARIMA models for daily sales series
//!
//! [`ArimaModel`] is the unfitted model: an order plus preprocessing.
//! Fitting decomposes the series, differences the standardized residual, estimates AR and MA
//! coefficients on the centered result and returns a [`FittedArima`], which is
//! the only thing that can forecast. A fitted model always forecasts from the
//! series it was fitted on.
//!
//! Series shorter than [`MIN_OBSERVATIONS`] get a constant-mean model instead.

use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate_forecast, ResidualDiagnostics, ValidationMetrics};
use crate::models::decomposition::{DecomposedSeries, SeriesDecomposer};
use crate::models::estimation::{ArEstimate, ParameterEstimator};
use crate::models::{ForecastModel, ModelOrder, TrainedForecastModel};
use series_math::differencing::{difference_levels, integrate_from_heads, integrate_from_tails};
use series_math::statistics::{mean, variance};
use tracing::debug;

/// Fewer observations than this produce a constant-mean model
pub const MIN_OBSERVATIONS: usize = 10;

/// Holdout validation needs at least this many observations
pub const MIN_VALIDATION_OBSERVATIONS: usize = 20;

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone, Copy, Default)]
pub struct ArimaModel {
    order: ModelOrder,
    decomposer: SeriesDecomposer,
    estimator: ParameterEstimator,
}

impl ArimaModel {
    /// Create a new ARIMA model
    pub fn new(order: ModelOrder) -> Self {
        Self {
            order,
            decomposer: SeriesDecomposer::new(),
            estimator: ParameterEstimator::new(),
        }
    }

    pub fn with_decomposer(mut self, decomposer: SeriesDecomposer) -> Self {
        self.decomposer = decomposer;
        self
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn decomposer(&self) -> SeriesDecomposer {
        self.decomposer
    }

    /// Fit the model to a daily series
    pub fn fit(&self, series: &[f64]) -> Result<FittedArima> {
        if series.is_empty() {
            return Err(ForecastError::DataError(
                "Cannot fit a model to an empty series".to_string(),
            ));
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Series contains non-finite values".to_string(),
            ));
        }

        if series.len() < MIN_OBSERVATIONS {
            debug!(
                points = series.len(),
                "Too few observations for {}, using constant mean", self.order
            );
            return Ok(self.constant_mean(series));
        }

        let decomposition = self.decomposer.decompose(series);

        let (levels, d) = match difference_levels(decomposition.residual(), self.order.d) {
            Some(levels) => (levels, self.order.d),
            None => {
                debug!(
                    points = series.len(),
                    d = self.order.d,
                    "Differencing exhausted the series, fitting undifferenced"
                );
                (vec![decomposition.residual().to_vec()], 0)
            }
        };
        let heads: Vec<f64> = levels[..d].iter().map(|level| level[0]).collect();
        let tails: Vec<f64> = levels[..d]
            .iter()
            .map(|level| level[level.len() - 1])
            .collect();
        let differenced = &levels[d];

        let level_mean = mean(differenced);
        let centered: Vec<f64> = differenced.iter().map(|x| x - level_mean).collect();

        let ar_estimate = self.estimator.estimate_ar(&centered, self.order.p);
        let ma = self
            .estimator
            .estimate_ma(&centered, ar_estimate.coefficients(), self.order.q);

        let (fitted_centered, innovations) =
            one_step_fit(&centered, ar_estimate.coefficients(), &ma);

        let fitted_differenced: Vec<f64> = fitted_centered.iter().map(|f| f + level_mean).collect();
        let fitted_scaled = integrate_from_heads(&fitted_differenced, &heads);
        let fitted_values: Vec<f64> = fitted_scaled
            .iter()
            .enumerate()
            .map(|(i, v)| decomposition.restore(*v, i))
            .collect();

        let order = ModelOrder::new(self.order.p, d, self.order.q);
        let fitted = FittedArima {
            model: *self,
            order,
            observations: series.to_vec(),
            fitted_values,
            innovations,
            state: FitState::Arima(Box::new(ArimaState {
                decomposition,
                centered,
                level_mean,
                tails,
                ar_estimate,
                ma,
            })),
        };

        debug!(
            order = %fitted.order,
            points = series.len(),
            aic = fitted.aic(),
            "Fitted model"
        );
        Ok(fitted)
    }

    fn constant_mean(&self, series: &[f64]) -> FittedArima {
        let level = mean(series);
        FittedArima {
            model: *self,
            order: self.order,
            observations: series.to_vec(),
            fitted_values: vec![level; series.len()],
            innovations: series.iter().map(|v| v - level).collect(),
            state: FitState::ConstantMean { level },
        }
    }
}

impl ForecastModel for ArimaModel {
    type Trained = FittedArima;

    fn fit(&self, series: &[f64]) -> Result<FittedArima> {
        ArimaModel::fit(self, series)
    }

    fn name(&self) -> String {
        self.order.to_string()
    }
}

/// Which kind of model a fit produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitKind {
    /// Too little data; every value is the series mean
    ConstantMean,
    /// Full ARIMA recursion on the decomposed series
    Arima,
}

#[derive(Debug, Clone, PartialEq)]
enum FitState {
    ConstantMean { level: f64 },
    Arima(Box<ArimaState>),
}

#[derive(Debug, Clone, PartialEq)]
struct ArimaState {
    decomposition: DecomposedSeries,
    /// Differenced, centered standardized residual
    centered: Vec<f64>,
    level_mean: f64,
    /// Last value of every level before the final differencing pass
    tails: Vec<f64>,
    ar_estimate: ArEstimate,
    ma: Vec<f64>,
}

/// ARIMA model fitted to one series
#[derive(Debug, Clone, PartialEq)]
pub struct FittedArima {
    model: ArimaModel,
    /// Effective order; `d` is 0 when differencing had to be abandoned
    order: ModelOrder,
    observations: Vec<f64>,
    fitted_values: Vec<f64>,
    innovations: Vec<f64>,
    state: FitState,
}

impl PartialEq for ArimaModel {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.decomposer == other.decomposer
    }
}

impl FittedArima {
    pub fn kind(&self) -> FitKind {
        match self.state {
            FitState::ConstantMean { .. } => FitKind::ConstantMean,
            FitState::Arima(_) => FitKind::Arima,
        }
    }

    /// Order the model was fitted with
    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Order originally requested
    pub fn requested_order(&self) -> ModelOrder {
        self.model.order
    }

    /// The series the model was fitted on
    pub fn observations(&self) -> &[f64] {
        &self.observations
    }

    /// In-sample fitted values in sales units
    ///
    /// Differencing is undone from the first value of every level, so the
    /// reconstruction is anchored at the start of the series.
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted_values
    }

    /// One-step prediction errors in the modeled (differenced, scaled) space
    pub fn residuals(&self) -> &[f64] {
        &self.innovations
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        match &self.state {
            FitState::Arima(state) => state.ar_estimate.coefficients(),
            FitState::ConstantMean { .. } => &[],
        }
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        match &self.state {
            FitState::Arima(state) => &state.ma,
            FitState::ConstantMean { .. } => &[],
        }
    }

    /// True when the AR coefficients are the default rather than a solution
    pub fn used_ar_fallback(&self) -> bool {
        match &self.state {
            FitState::Arima(state) => state.ar_estimate.is_fallback(),
            FitState::ConstantMean { .. } => false,
        }
    }

    /// Centering mean of the modeled series (the plain mean for a constant model)
    pub fn mean(&self) -> f64 {
        match &self.state {
            FitState::Arima(state) => state.level_mean,
            FitState::ConstantMean { level } => *level,
        }
    }

    pub fn decomposition(&self) -> Option<&DecomposedSeries> {
        match &self.state {
            FitState::Arima(state) => Some(&state.decomposition),
            FitState::ConstantMean { .. } => None,
        }
    }

    /// Forecast `steps` days past the end of the fitted series
    ///
    /// The MA term only contributes to the first step. Values are never
    /// negative.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let state = match &self.state {
            FitState::ConstantMean { level } => return vec![level.max(0.0); steps],
            FitState::Arima(state) => state,
        };

        let ar = state.ar_estimate.coefficients();
        let mut history = state.centered.clone();
        let mut differenced = Vec::with_capacity(steps);

        for step in 0..steps {
            let ar_term: f64 = ar
                .iter()
                .enumerate()
                .filter_map(|(i, phi)| history.len().checked_sub(i + 1).map(|k| phi * history[k]))
                .sum();
            let ma_term: f64 = if step == 0 {
                state
                    .ma
                    .iter()
                    .enumerate()
                    .filter_map(|(i, theta)| {
                        self.innovations
                            .len()
                            .checked_sub(i + 1)
                            .map(|k| theta * self.innovations[k])
                    })
                    .sum()
            } else {
                0.0
            };

            let next = ar_term + ma_term;
            history.push(next);
            differenced.push(next + state.level_mean);
        }

        let n = state.decomposition.len();
        integrate_from_tails(&differenced, &state.tails)
            .iter()
            .enumerate()
            .map(|(step, v)| state.decomposition.project(*v, n + step))
            .collect()
    }

    /// Akaike information criterion `n·ln(var) + 2k`
    ///
    /// Infinite when there are no more residuals than parameters, when the
    /// residual variance is not positive, and for constant-mean models.
    pub fn aic(&self) -> f64 {
        if self.kind() == FitKind::ConstantMean {
            return f64::INFINITY;
        }

        let n = self.innovations.len();
        let k = self.order.parameter_count();
        if n <= k {
            return f64::INFINITY;
        }

        let var = variance(&self.innovations);
        if !var.is_finite() || var <= 0.0 {
            return f64::INFINITY;
        }

        n as f64 * var.ln() + 2.0 * k as f64
    }

    /// Holdout check of the model's order on its own series
    ///
    /// The last `max(n/4, test_steps)` points are held out, the same order is
    /// refitted on the rest and its forecast scored against the holdout.
    /// Returns [`ValidationMetrics::poor_fit`] when there is too little data.
    pub fn validation_metrics(&self, test_steps: usize) -> ValidationMetrics {
        let (train, test) = match holdout_sizes(self.observations.len(), test_steps) {
            Ok(sizes) => sizes,
            Err(err) => {
                debug!(error = %err, "Scoring as a poor fit");
                return ValidationMetrics::poor_fit();
            }
        };

        let refit = match self.model.fit(&self.observations[..train]) {
            Ok(refit) => refit,
            Err(err) => {
                debug!(error = %err, "Validation refit failed");
                return ValidationMetrics::poor_fit();
            }
        };

        let predicted = refit.forecast(test);
        evaluate_forecast(&self.observations[train..], &predicted)
            .unwrap_or_else(|_| ValidationMetrics::poor_fit())
    }

    /// In-sample error of the fitted values, in sales units
    pub fn diagnostics(&self) -> ResidualDiagnostics {
        let errors: Vec<f64> = self
            .observations
            .iter()
            .zip(&self.fitted_values)
            .map(|(actual, fitted)| actual - fitted)
            .collect();
        ResidualDiagnostics::from_residuals(&errors)
    }
}

impl TrainedForecastModel for FittedArima {
    fn forecast(&self, steps: usize) -> Vec<f64> {
        FittedArima::forecast(self, steps)
    }

    fn fitted_values(&self) -> &[f64] {
        &self.fitted_values
    }

    fn name(&self) -> String {
        self.order.to_string()
    }
}

/// Train and test sizes used by [`FittedArima::validation_metrics`]
///
/// Fails with [`ForecastError::InsufficientData`] when the series is shorter
/// than [`MIN_VALIDATION_OBSERVATIONS`] or the training part would be shorter
/// than [`MIN_OBSERVATIONS`].
pub fn holdout_sizes(len: usize, test_steps: usize) -> Result<(usize, usize)> {
    if len < MIN_VALIDATION_OBSERVATIONS {
        return Err(ForecastError::InsufficientData(format!(
            "holdout validation needs {} observations, got {}",
            MIN_VALIDATION_OBSERVATIONS, len
        )));
    }
    let test = (len / 4).max(test_steps);
    let train = len.saturating_sub(test);
    if train < MIN_OBSERVATIONS || test == 0 {
        return Err(ForecastError::InsufficientData(format!(
            "holding out {} of {} observations leaves too few to train on",
            test, len
        )));
    }
    Ok((train, test))
}

/// Recursive one-step fit on a centered series
///
/// Returns the fitted values and the innovations `x[t] - fitted[t]`, using
/// only lags that fall inside the series.
fn one_step_fit(centered: &[f64], ar: &[f64], ma: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = centered.len();
    let mut fitted = Vec::with_capacity(n);
    let mut innovations: Vec<f64> = Vec::with_capacity(n);

    for t in 0..n {
        let ar_term: f64 = ar
            .iter()
            .enumerate()
            .filter_map(|(i, phi)| t.checked_sub(i + 1).map(|k| phi * centered[k]))
            .sum();
        let ma_term: f64 = ma
            .iter()
            .enumerate()
            .filter_map(|(i, theta)| t.checked_sub(i + 1).map(|k| theta * innovations[k]))
            .sum();

        let value = ar_term + ma_term;
        fitted.push(value);
        innovations.push(centered[t] - value);
    }

    (fitted, innovations)
}
