use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use nalgebra::{DMatrix, DVector};

use forecast_core::{
    ForecastError, ForecastPoint, ForecastResult, ModelConfig, PriceSeries, RegressorFrame,
};

mod features;
mod uncertainty;


use features::FeatureLayout;
use uncertainty::IntervalSimulator;

/// Additive trend + seasonality regression over a daily price series:
/// piecewise-linear trend with ridge-penalized changepoints, Fourier
/// weekly/yearly seasonality, and optional external regressor columns.
pub struct SeasonalTrendModel {
    config: ModelConfig,
}

impl SeasonalTrendModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Fits the model on `series`, optionally with an aligned regressor
    /// frame. Series rows without a matching regressor row are excluded from
    /// the fit, never imputed; baseline mode (no frame) fits on price alone.
    pub fn fit(
        &self,
        series: &PriceSeries,
        regressors: Option<&RegressorFrame>,
    ) -> Result<FittedModel, ForecastError> {
        let rows = select_rows(series, regressors);
        let n = rows.len();
        if n < 2 {
            return Err(ForecastError::ModelFitError(format!(
                "at least 2 usable points required, got {}",
                n
            )));
        }

        for (date, close, regs) in &rows {
            if !close.is_finite() || regs.iter().any(|v| !v.is_finite()) {
                return Err(ForecastError::ModelFitError(format!(
                    "non-finite value at {}",
                    date
                )));
            }
        }

        let ds0 = rows[0].0;
        let t_span = (rows[n - 1].0 - ds0).num_days().max(1) as f64;

        let y_scale = rows
            .iter()
            .map(|(_, close, _)| close.abs())
            .fold(0.0, f64::max)
            .max(1e-12);
        let y_scaled: Vec<f64> = rows.iter().map(|(_, close, _)| close / y_scale).collect();

        let n_regressors = rows[0].2.len();
        let mut regressor_cols: Vec<Vec<f64>> = vec![Vec::with_capacity(n); n_regressors];
        for (_, _, regs) in &rows {
            for (col, value) in regressor_cols.iter_mut().zip(regs) {
                col.push(*value);
            }
        }

        let layout = FeatureLayout::new(&self.config, n, &regressor_cols);
        let p = layout.n_columns();

        let mut flat = Vec::with_capacity(n * p);
        for (date, _, regs) in &rows {
            let t = (*date - ds0).num_days() as f64 / t_span;
            flat.extend(layout.row(t, *date, regs));
        }

        let x = DMatrix::from_row_slice(n, p, &flat);
        let y = DVector::from_vec(y_scaled);

        let penalty = DMatrix::from_diagonal(&DVector::from_vec(layout.penalties(&self.config)));
        let xtx = x.transpose() * &x + penalty;
        let xty = x.transpose() * &y;

        let beta = match xtx.clone().cholesky() {
            Some(chol) => chol.solve(&xty),
            None => xtx
                .svd(true, true)
                .solve(&xty, 1e-12)
                .map_err(|e| ForecastError::ModelFitError(format!("solve failed: {}", e)))?,
        };

        let residuals = &y - &x * &beta;
        let sigma_obs = (residuals.iter().map(|r| r * r).sum::<f64>() / n as f64).sqrt();

        let cp_offset = layout.changepoint_offset();
        let deltas: Vec<f64> = beta
            .iter()
            .skip(cp_offset)
            .take(layout.changepoints.len())
            .copied()
            .collect();

        let last_regressors = rows[n - 1].2.clone();

        tracing::debug!(
            symbol = series.symbol(),
            rows = n,
            columns = p,
            sigma_obs,
            "fitted seasonal trend model"
        );

        Ok(FittedModel {
            config: self.config.clone(),
            history: series.clone(),
            ds0,
            t_span,
            y_scale,
            layout,
            beta: beta.iter().copied().collect(),
            deltas,
            sigma_obs,
            n_rows: n,
            last_regressors,
        })
    }
}

/// A fitted model ready to produce future-dated forecasts.
#[derive(Debug)]
pub struct FittedModel {
    config: ModelConfig,
    history: PriceSeries,
    ds0: NaiveDate,
    t_span: f64,
    y_scale: f64,
    layout: FeatureLayout,
    beta: Vec<f64>,
    deltas: Vec<f64>,
    sigma_obs: f64,
    n_rows: usize,
    /// Raw regressor values of the last fitted row, held constant over the
    /// horizon.
    last_regressors: Vec<f64>,
}

impl FittedModel {
    /// Forecasts `horizon_days` calendar days beyond the last historical
    /// date, with credible-interval bounds at the configured width.
    pub fn predict(&self, horizon_days: u32) -> Result<ForecastResult, ForecastError> {
        if horizon_days == 0 {
            return Err(ForecastError::InvalidRequest(
                "horizon_days must be positive".to_string(),
            ));
        }

        let last_date = self
            .history
            .last_date()
            .ok_or_else(|| ForecastError::ModelFitError("empty history".to_string()))?;

        let mut dates = Vec::with_capacity(horizon_days as usize);
        let mut t_future = Vec::with_capacity(horizon_days as usize);
        let mut yhat_scaled = Vec::with_capacity(horizon_days as usize);

        for i in 1..=horizon_days as i64 {
            let date = last_date + Duration::days(i);
            let t = (date - self.ds0).num_days() as f64 / self.t_span;
            let row = self.layout.row(t, date, &self.last_regressors);
            let yhat: f64 = row.iter().zip(&self.beta).map(|(a, b)| a * b).sum();

            dates.push(date);
            t_future.push(t);
            yhat_scaled.push(yhat);
        }

        let simulator =
            IntervalSimulator::new(&self.deltas, self.n_rows, self.sigma_obs, &self.config);
        let (lower_scaled, upper_scaled) = simulator.simulate(&yhat_scaled, &t_future, &self.config);

        let forecast = dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| {
                ForecastPoint::new(
                    date,
                    yhat_scaled[i] * self.y_scale,
                    lower_scaled[i] * self.y_scale,
                    upper_scaled[i] * self.y_scale,
                )
            })
            .collect();

        Ok(ForecastResult {
            symbol: self.history.symbol().to_string(),
            history: self.history.clone(),
            forecast,
            config: self.config.clone(),
        })
    }
}

/// Rows entering the fit: (date, close, regressor values). With a frame the
/// series is restricted to dates the frame covers.
fn select_rows(
    series: &PriceSeries,
    regressors: Option<&RegressorFrame>,
) -> Vec<(NaiveDate, f64, Vec<f64>)> {
    match regressors {
        None => series
            .points()
            .iter()
            .map(|point| (point.date, point.close, Vec::new()))
            .collect(),
        Some(frame) => {
            let by_date: HashMap<NaiveDate, usize> = frame
                .dates
                .iter()
                .enumerate()
                .map(|(i, &date)| (date, i))
                .collect();

            series
                .points()
                .iter()
                .filter_map(|point| {
                    by_date.get(&point.date).map(|&i| {
                        let regs = vec![
                            frame.macd[i],
                            frame.signal[i],
                            frame.rsi[i],
                            frame.sentiment[i],
                        ];
                        (point.date, point.close, regs)
                    })
                })
                .collect()
        }
    }
}
