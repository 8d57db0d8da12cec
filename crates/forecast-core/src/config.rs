use serde::{Deserialize, Serialize};

/// Configuration for the trend + seasonality forecast model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub daily_seasonality: bool,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
    /// Fourier order for the weekly component.
    pub weekly_order: usize,
    /// Fourier order for the yearly component.
    pub yearly_order: usize,
    /// Number of potential trend changepoints.
    pub n_changepoints: usize,
    /// Fraction of history in which changepoints are placed.
    pub changepoint_range: f64,
    /// Ridge prior scale on changepoint deltas. Smaller = stiffer trend.
    pub changepoint_prior_scale: f64,
    /// Credible-interval width, e.g. 0.8 for an 80% interval.
    pub interval_width: f64,
    /// Monte Carlo draws used for the interval estimate.
    pub uncertainty_samples: usize,
    /// Fixed RNG seed for reproducible intervals.
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            daily_seasonality: true,
            weekly_seasonality: true,
            yearly_seasonality: true,
            weekly_order: 3,
            yearly_order: 10,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: None,
        }
    }
}

impl ModelConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
