use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use forecast_core::{
    format_years, ChartMetadata, ChartStore, ForecastError, ForecastRequest, ForecastResult,
    MarketDataProvider, ModelConfig, PriceSeries, RegressorFrame,
};
use forecast_model::SeasonalTrendModel;

#[cfg(test)]
mod orchestrator_tests;

/// Which pipeline the orchestrator runs: the indicator-enhanced variant
/// feeds MACD/signal/RSI plus sentiment into the model as regressors, the
/// baseline variant fits on price history alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineVariant {
    IndicatorEnhanced,
    Baseline,
}

impl std::str::FromStr for PipelineVariant {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Ok(PipelineVariant::Baseline),
            "indicators" | "indicator" | "indicator-enhanced" => {
                Ok(PipelineVariant::IndicatorEnhanced)
            }
            other => Err(ForecastError::InvalidRequest(format!(
                "unknown pipeline variant: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub variant: PipelineVariant,
    /// Broadcast in place of sentiment when the provider has no coverage.
    /// 3.0 is the neutral analyst recommendation mean.
    pub neutral_sentiment: f64,
    pub data_timeout: Duration,
    pub fit_timeout: Duration,
    /// Symbols unfinished at this deadline resolve to a timeout failure.
    pub request_deadline: Duration,
    pub model: ModelConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            variant: PipelineVariant::IndicatorEnhanced,
            neutral_sentiment: 3.0,
            data_timeout: Duration::from_secs(30),
            fit_timeout: Duration::from_secs(60),
            request_deadline: Duration::from_secs(300),
            model: ModelConfig::default(),
        }
    }
}

/// Per-symbol summary returned after the chart store handoff. The core drops
/// the full ForecastResult once the chart is persisted.
#[derive(Debug, Clone)]
pub struct SymbolForecast {
    pub symbol: String,
    pub filename: String,
    pub title: String,
    pub horizon_days: u32,
    pub last_forecast_date: NaiveDate,
    pub sentiment_observed: bool,
}

/// Ordered per-symbol outcomes of one batch request.
#[derive(Debug)]
pub struct BatchOutcome {
    pub outcomes: Vec<(String, Result<SymbolForecast, ForecastError>)>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// True when not a single symbol resolved.
    pub fn is_total_failure(&self) -> bool {
        self.succeeded() == 0
    }

    pub fn get(&self, symbol: &str) -> Option<&Result<SymbolForecast, ForecastError>> {
        self.outcomes
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, r)| r)
    }
}

/// Drives the forecast pipeline per requested symbol: retrieve history, run
/// indicators and sentiment, assemble regressors, fit, predict, and hand the
/// result to the chart store. Symbols are processed concurrently and fail
/// independently.
#[derive(Clone)]
pub struct ForecastOrchestrator {
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<dyn ChartStore>,
    config: OrchestratorConfig,
}

impl ForecastOrchestrator {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn ChartStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ChartStore> {
        &self.store
    }

    /// Runs the batch. One symbol's failure never aborts its siblings; the
    /// outcome map preserves request order.
    pub async fn run(&self, request: &ForecastRequest) -> BatchOutcome {
        let deadline = tokio::time::Instant::now() + self.config.request_deadline;

        let mut handles = Vec::with_capacity(request.symbols.len());
        for symbol in &request.symbols {
            let this = self.clone();
            let symbol = symbol.clone();
            let request = request.clone();
            handles.push((
                symbol.clone(),
                tokio::spawn(async move { this.process_symbol(&symbol, &request).await }),
            ));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (symbol, handle) in handles {
            let outcome = match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(ForecastError::ModelFitError(format!(
                    "pipeline task failed: {}",
                    join_err
                ))),
                Err(_) => {
                    tracing::warn!("Request deadline hit before {} finished", symbol);
                    Err(ForecastError::DataSourceTimeout(
                        self.config.request_deadline,
                    ))
                }
            };

            match &outcome {
                Ok(s) => tracing::info!("Forecast for {} saved as {:?}", symbol, s.filename),
                Err(e) => tracing::warn!("Forecast for {} failed: {}", symbol, e),
            }
            outcomes.push((symbol, outcome));
        }

        BatchOutcome { outcomes }
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        request: &ForecastRequest,
    ) -> Result<SymbolForecast, ForecastError> {
        let end = Utc::now().date_naive();
        let start = end - ChronoDuration::days(request.lookback_days());

        let history = tokio::time::timeout(
            self.config.data_timeout,
            self.provider.get_history(symbol, start, end),
        )
        .await
        .map_err(|_| ForecastError::DataSourceTimeout(self.config.data_timeout))??;

        // Sentiment is an enhancement: timeouts and provider errors are
        // absorbed into absence.
        let sentiment = match self.config.variant {
            PipelineVariant::IndicatorEnhanced => tokio::time::timeout(
                self.config.data_timeout,
                self.provider.get_sentiment(symbol),
            )
            .await
            .unwrap_or(None),
            PipelineVariant::Baseline => None,
        };

        let regressors = match self.config.variant {
            PipelineVariant::IndicatorEnhanced => {
                let frame = indicator_engine::compute(&history)?;
                Some(regressor_assembler::assemble(
                    &history,
                    &frame,
                    sentiment,
                    self.config.neutral_sentiment,
                )?)
            }
            PipelineVariant::Baseline => None,
        };

        let result = self
            .fit_predict(history, regressors, request.horizon_days)
            .await?;

        let metadata = self.build_metadata(&result, request)?;
        let artifact = self.store.render(&result, &metadata)?;
        let filename = self.store.save(artifact, &metadata).await?;

        Ok(SymbolForecast {
            symbol: result.symbol.clone(),
            filename,
            title: metadata.title,
            horizon_days: request.horizon_days,
            last_forecast_date: result
                .last_forecast_date()
                .unwrap_or_else(|| Utc::now().date_naive()),
            sentiment_observed: sentiment.is_some(),
        })
    }

    /// The nalgebra solve and interval simulation are CPU-bound, so the fit
    /// runs on the blocking pool under its own timeout.
    async fn fit_predict(
        &self,
        history: PriceSeries,
        regressors: Option<RegressorFrame>,
        horizon_days: u32,
    ) -> Result<ForecastResult, ForecastError> {
        let model_config = self.config.model.clone();
        let fit_timeout = self.config.fit_timeout;

        let handle = tokio::task::spawn_blocking(move || {
            let model = SeasonalTrendModel::new(model_config);
            model
                .fit(&history, regressors.as_ref())?
                .predict(horizon_days)
        });

        match tokio::time::timeout(fit_timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ForecastError::ModelFitError(format!(
                "fit task failed: {}",
                join_err
            ))),
            Err(_) => Err(ForecastError::ModelFitTimeout(fit_timeout)),
        }
    }

    fn build_metadata(
        &self,
        result: &ForecastResult,
        request: &ForecastRequest,
    ) -> Result<ChartMetadata, ForecastError> {
        let last = result
            .last_forecast_date()
            .ok_or_else(|| ForecastError::ModelFitError("empty forecast".to_string()))?;

        let title = format!(
            "Forecast for {}, with {} years of past data, predicting {} days into the future, until {}",
            result.symbol,
            format_years(request.years_history),
            request.horizon_days,
            last.format("%B %-d, %Y"),
        );

        Ok(ChartMetadata {
            symbol: result.symbol.clone(),
            generated_at: Utc::now(),
            horizon_days: request.horizon_days,
            years_history: request.years_history,
            title,
        })
    }
}
