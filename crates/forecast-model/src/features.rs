use chrono::{Datelike, NaiveDate};
use forecast_core::ModelConfig;

const DAYS_PER_YEAR: f64 = 365.25;
const DAYS_PER_WEEK: f64 = 7.0;

/// Column layout of the design matrix, shared between fit and predict so a
/// future row lines up with the fitted coefficient vector.
///
/// Columns: intercept, base slope, changepoint basis, weekly Fourier pairs,
/// yearly Fourier pairs, standardized regressors.
#[derive(Debug, Clone)]
pub(crate) struct FeatureLayout {
    /// Changepoint locations in scaled time (0, changepoint_range].
    pub changepoints: Vec<f64>,
    pub weekly_order: usize,
    pub yearly_order: usize,
    /// Per-regressor (mean, std) used for standardization.
    pub regressor_scales: Vec<(f64, f64)>,
}

impl FeatureLayout {
    pub fn new(config: &ModelConfig, n_points: usize, regressors: &[Vec<f64>]) -> Self {
        // Never place more changepoints than the history can support.
        let n_cp = config.n_changepoints.min(n_points.saturating_sub(2));
        let changepoints = (1..=n_cp)
            .map(|j| config.changepoint_range * j as f64 / (n_cp + 1) as f64)
            .collect();

        // Daily seasonality carries no signal on date-resolution bars (every
        // sample sits at the same intraday phase), so it never contributes
        // columns even when the config flag is set.
        let weekly_order = if config.weekly_seasonality {
            config.weekly_order
        } else {
            0
        };
        let yearly_order = if config.yearly_seasonality {
            config.yearly_order
        } else {
            0
        };

        let regressor_scales = regressors
            .iter()
            .map(|col| {
                let n = col.len() as f64;
                let mean = col.iter().sum::<f64>() / n;
                let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                // Constant columns (e.g. broadcast sentiment) standardize to
                // zero rather than dividing by zero.
                (mean, if std > 0.0 { std } else { 1.0 })
            })
            .collect();

        Self {
            changepoints,
            weekly_order,
            yearly_order,
            regressor_scales,
        }
    }

    pub fn n_columns(&self) -> usize {
        2 + self.changepoints.len()
            + 2 * self.weekly_order
            + 2 * self.yearly_order
            + self.regressor_scales.len()
    }

    /// Index of the first changepoint column.
    pub fn changepoint_offset(&self) -> usize {
        2
    }

    /// One design-matrix row. `t` is scaled time, `date` drives seasonality,
    /// `regressors` are raw (unstandardized) values for this row.
    pub fn row(&self, t: f64, date: NaiveDate, regressors: &[f64]) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.n_columns());
        row.push(1.0);
        row.push(t);

        for &cp in &self.changepoints {
            row.push((t - cp).max(0.0));
        }

        let day = date.num_days_from_ce() as f64;
        for k in 1..=self.weekly_order {
            let arg = 2.0 * std::f64::consts::PI * k as f64 * day / DAYS_PER_WEEK;
            row.push(arg.sin());
            row.push(arg.cos());
        }
        for k in 1..=self.yearly_order {
            let arg = 2.0 * std::f64::consts::PI * k as f64 * day / DAYS_PER_YEAR;
            row.push(arg.sin());
            row.push(arg.cos());
        }

        for (value, (mean, std)) in regressors.iter().zip(&self.regressor_scales) {
            row.push((value - mean) / std);
        }

        row
    }

    /// Per-column ridge penalties. The trend intercept and slope are nearly
    /// unpenalized; changepoint deltas take their stiffness from
    /// `changepoint_prior_scale`; seasonality and regressors share a loose
    /// prior.
    pub fn penalties(&self, config: &ModelConfig) -> Vec<f64> {
        const SEASONALITY_PRIOR_SCALE: f64 = 10.0;
        const REGRESSOR_PRIOR_SCALE: f64 = 10.0;

        let mut penalties = vec![1e-8, 1e-8];
        let cp_penalty = 1.0 / config.changepoint_prior_scale.powi(2).max(1e-12);
        penalties.extend(std::iter::repeat(cp_penalty).take(self.changepoints.len()));

        let seas_penalty = 1.0 / SEASONALITY_PRIOR_SCALE.powi(2);
        penalties.extend(
            std::iter::repeat(seas_penalty).take(2 * self.weekly_order + 2 * self.yearly_order),
        );

        let reg_penalty = 1.0 / REGRESSOR_PRIOR_SCALE.powi(2);
        penalties.extend(std::iter::repeat(reg_penalty).take(self.regressor_scales.len()));

        penalties
    }
}
