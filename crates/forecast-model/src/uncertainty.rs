use forecast_core::ModelConfig;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use statrs::distribution::{Laplace, Normal};

/// Simulated credible interval for the forecast horizon, in scaled units.
///
/// Future trend uncertainty follows the model's own history: new
/// changepoints arrive at the historical changepoint frequency with
/// Laplace-distributed slope deltas whose scale matches the fitted deltas,
/// on top of Gaussian observation noise. Per-date empirical quantiles of
/// the simulated paths give the bounds.
pub(crate) struct IntervalSimulator {
    changepoint_prob: f64,
    delta_scale: f64,
    sigma_obs: f64,
}

impl IntervalSimulator {
    pub fn new(deltas: &[f64], n_history: usize, sigma_obs: f64, config: &ModelConfig) -> Self {
        let changepoint_prob = if n_history > 0 {
            deltas.len() as f64 / n_history as f64
        } else {
            0.0
        };

        let mean_abs_delta = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64
        };
        // A perfectly straight fit still gets the prior's worth of wiggle.
        let delta_scale = mean_abs_delta.max(config.changepoint_prior_scale * 1e-2);

        Self {
            changepoint_prob,
            delta_scale,
            sigma_obs: sigma_obs.max(1e-12),
        }
    }

    /// Returns (lower, upper) per future step, aligned with `yhat` /
    /// `t_future`.
    pub fn simulate(
        &self,
        yhat: &[f64],
        t_future: &[f64],
        config: &ModelConfig,
    ) -> (Vec<f64>, Vec<f64>) {
        let horizon = yhat.len();
        if horizon == 0 || config.uncertainty_samples == 0 {
            return (yhat.to_vec(), yhat.to_vec());
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // Fitted scales are always finite and positive here, so these
        // constructors cannot fail.
        let laplace = Laplace::new(0.0, self.delta_scale)
            .unwrap_or_else(|_| Laplace::new(0.0, 1e-6).unwrap());
        let noise = Normal::new(0.0, self.sigma_obs)
            .unwrap_or_else(|_| Normal::new(0.0, 1e-6).unwrap());

        let mut paths: Vec<Vec<f64>> = vec![Vec::with_capacity(config.uncertainty_samples); horizon];

        for _ in 0..config.uncertainty_samples {
            let mut slope_change = 0.0;
            let mut deviation = 0.0;
            let mut prev_t = 1.0;

            for (i, &t) in t_future.iter().enumerate() {
                if self.changepoint_prob > 0.0 && rng.gen::<f64>() < self.changepoint_prob {
                    slope_change += laplace.sample(&mut rng);
                }
                deviation += slope_change * (t - prev_t);
                prev_t = t;

                paths[i].push(yhat[i] + deviation + noise.sample(&mut rng));
            }
        }

        let lower_q = (1.0 - config.interval_width) / 2.0;
        let upper_q = 1.0 - lower_q;

        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for samples in paths.iter_mut() {
            samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            lower.push(quantile(samples, lower_q));
            upper.push(quantile(samples, upper_q));
        }

        (lower, upper)
    }
}

/// Empirical quantile of a sorted sample.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
