//! Grid search over small ARIMA orders by AIC

use crate::models::arima::ArimaModel;
use crate::models::decomposition::SeriesDecomposer;
use crate::models::ModelOrder;
use serde::Serialize;
use tracing::{debug, instrument};

/// Series shorter than this get the default order without searching
pub const MIN_SEARCH_OBSERVATIONS: usize = 15;

/// Observations required beyond `p + d + q` for a candidate to be tried
const PARAMETER_MARGIN: usize = 10;

/// One order that was fitted during the search
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderCandidate {
    pub order: ModelOrder,
    pub aic: f64,
}

/// Result of an order search
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSelection {
    pub order: ModelOrder,
    /// AIC of the chosen order; infinite when no search took place
    pub aic: f64,
    /// Every candidate with a finite AIC, in search order
    pub candidates: Vec<OrderCandidate>,
}

impl OrderSelection {
    fn default_order() -> Self {
        Self {
            order: ModelOrder::default(),
            aic: f64::INFINITY,
            candidates: Vec::new(),
        }
    }

    /// True when the default order was used because nothing was compared
    pub fn is_default(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Exhaustive search over `p ≤ max_p`, `d ≤ max_d`, `q ≤ max_q`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSelector {
    max_p: usize,
    max_d: usize,
    max_q: usize,
    decomposer: SeriesDecomposer,
}

impl Default for OrderSelector {
    fn default() -> Self {
        Self::new(2, 1, 2)
    }
}

impl OrderSelector {
    pub fn new(max_p: usize, max_d: usize, max_q: usize) -> Self {
        Self {
            max_p,
            max_d,
            max_q,
            decomposer: SeriesDecomposer::new(),
        }
    }

    /// Decomposer used for every candidate fit
    pub fn with_decomposer(mut self, decomposer: SeriesDecomposer) -> Self {
        self.decomposer = decomposer;
        self
    }

    /// Pick the order with the lowest AIC
    ///
    /// Pure differencing orders (`p = q = 0`) are never considered. Ties keep
    /// the first order in p, d, q iteration order. Candidates whose fit fails
    /// or whose AIC is undefined are skipped.
    #[instrument(skip(self, series), fields(points = series.len()))]
    pub fn select(&self, series: &[f64]) -> OrderSelection {
        let n = series.len();
        if n < MIN_SEARCH_OBSERVATIONS {
            debug!("Series too short for an order search, using {}", ModelOrder::default());
            return OrderSelection::default_order();
        }

        let mut best: Option<OrderCandidate> = None;
        let mut candidates = Vec::new();

        for p in 0..=self.max_p {
            for d in 0..=self.max_d {
                for q in 0..=self.max_q {
                    if p + q == 0 || n <= p + d + q + PARAMETER_MARGIN {
                        continue;
                    }

                    let order = ModelOrder::new(p, d, q);
                    let fitted = match ArimaModel::new(order)
                        .with_decomposer(self.decomposer)
                        .fit(series)
                    {
                        Ok(fitted) => fitted,
                        Err(err) => {
                            debug!(%order, error = %err, "Skipping candidate");
                            continue;
                        }
                    };

                    let aic = fitted.aic();
                    if !aic.is_finite() {
                        debug!(%order, "Skipping candidate with undefined AIC");
                        continue;
                    }

                    let candidate = OrderCandidate { order, aic };
                    candidates.push(candidate);
                    if best.map_or(true, |b| aic < b.aic) {
                        best = Some(candidate);
                    }
                }
            }
        }

        match best {
            Some(best) => {
                debug!(order = %best.order, aic = best.aic, tried = candidates.len(), "Selected order");
                OrderSelection {
                    order: best.order,
                    aic: best.aic,
                    candidates,
                }
            }
            None => {
                debug!("No candidate order could be fitted, using {}", ModelOrder::default());
                OrderSelection::default_order()
            }
        }
    }
}
