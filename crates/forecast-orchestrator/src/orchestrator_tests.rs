#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use forecast_core::{
        ChartArtifact, ChartEntry, ChartMetadata, ChartStore, ForecastError, ForecastRequest,
        ForecastResult, MarketDataProvider, ModelConfig, PricePoint, PriceSeries,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::{ForecastOrchestrator, OrchestratorConfig, PipelineVariant};

    struct MockProvider {
        histories: HashMap<String, PriceSeries>,
        sentiments: HashMap<String, f64>,
        history_delay: Duration,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                histories: HashMap::new(),
                sentiments: HashMap::new(),
                history_delay: Duration::ZERO,
            }
        }

        fn with_series(mut self, symbol: &str, days: usize) -> Self {
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let points = (0..days)
                .map(|i| {
                    let close = 120.0 + i as f64 * 0.25 + (i as f64 * 0.4).sin() * 2.0;
                    PricePoint {
                        date: start + ChronoDuration::days(i as i64),
                        open: close,
                        high: close + 1.0,
                        low: close - 1.0,
                        close,
                        volume: 1_000_000.0,
                    }
                })
                .collect();
            self.histories
                .insert(symbol.to_string(), PriceSeries::new(symbol, points));
            self
        }

        fn with_sentiment(mut self, symbol: &str, value: f64) -> Self {
            self.sentiments.insert(symbol.to_string(), value);
            self
        }

        fn with_history_delay(mut self, delay: Duration) -> Self {
            self.history_delay = delay;
            self
        }
    }

    #[async_trait]
    impl MarketDataProvider for MockProvider {
        async fn get_history(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<PriceSeries, ForecastError> {
            if !self.history_delay.is_zero() {
                tokio::time::sleep(self.history_delay).await;
            }
            self.histories
                .get(symbol)
                .cloned()
                .ok_or_else(|| ForecastError::SymbolNotFound(symbol.to_string()))
        }

        async fn get_sentiment(&self, symbol: &str) -> Option<f64> {
            self.sentiments.get(symbol).copied()
        }
    }

    #[derive(Default)]
    struct MockStore {
        saved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChartStore for MockStore {
        fn render(
            &self,
            result: &ForecastResult,
            _metadata: &ChartMetadata,
        ) -> Result<ChartArtifact, ForecastError> {
            Ok(ChartArtifact {
                html: "<html></html>".to_string(),
                filename_stem: format!("{}-test-chart", result.symbol),
            })
        }

        async fn save(
            &self,
            artifact: ChartArtifact,
            _metadata: &ChartMetadata,
        ) -> Result<String, ForecastError> {
            let filename = format!("{}.html", artifact.filename_stem);
            self.saved.lock().unwrap().push(filename.clone());
            Ok(filename)
        }

        async fn list(&self) -> Result<Vec<ChartEntry>, ForecastError> {
            Ok(Vec::new())
        }

        async fn delete(&self, _filename: &str) -> Result<bool, ForecastError> {
            Ok(false)
        }
    }

    fn orchestrator_with(
        provider: MockProvider,
        variant: PipelineVariant,
    ) -> (ForecastOrchestrator, Arc<MockStore>) {
        let store = Arc::new(MockStore::default());
        let config = OrchestratorConfig {
            variant,
            model: ModelConfig::default().with_seed(7),
            ..OrchestratorConfig::default()
        };
        (
            ForecastOrchestrator::new(Arc::new(provider), store.clone(), config),
            store,
        )
    }

    fn request(symbols: &[&str]) -> ForecastRequest {
        ForecastRequest::new(symbols.iter().copied(), 1.0, 14).unwrap()
    }

    #[tokio::test]
    async fn test_mixed_batch_isolates_failures() {
        let provider = MockProvider::new().with_series("AAPL", 200);
        let (orchestrator, store) =
            orchestrator_with(provider, PipelineVariant::IndicatorEnhanced);

        let outcome = orchestrator.run(&request(&["AAPL", "BOGUS123"])).await;

        assert_eq!(outcome.outcomes.len(), 2);
        assert_eq!(outcome.succeeded(), 1);
        assert_eq!(outcome.failed(), 1);
        assert!(!outcome.is_total_failure());

        assert!(outcome.get("AAPL").unwrap().is_ok());
        match outcome.get("BOGUS123").unwrap() {
            Err(ForecastError::SymbolNotFound(sym)) => assert_eq!(sym, "BOGUS123"),
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_short_history_fails_indicator_variant_only() {
        let provider = MockProvider::new().with_series("TINY", 10);
        let (orchestrator, _) = orchestrator_with(provider, PipelineVariant::IndicatorEnhanced);

        let outcome = orchestrator.run(&request(&["TINY"])).await;
        match outcome.get("TINY").unwrap() {
            Err(ForecastError::InsufficientHistory { actual, .. }) => assert_eq!(*actual, 10),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let provider = MockProvider::new().with_series("TINY", 10);
        let (orchestrator, _) = orchestrator_with(provider, PipelineVariant::Baseline);

        let outcome = orchestrator.run(&request(&["TINY"])).await;
        assert!(outcome.get("TINY").unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_absent_sentiment_does_not_change_outcome() {
        let with_sentiment = MockProvider::new()
            .with_series("AAPL", 150)
            .with_sentiment("AAPL", 1.8);
        let without_sentiment = MockProvider::new().with_series("AAPL", 150);

        let (orchestrator, _) =
            orchestrator_with(with_sentiment, PipelineVariant::IndicatorEnhanced);
        let observed = orchestrator.run(&request(&["AAPL"])).await;

        let (orchestrator, _) =
            orchestrator_with(without_sentiment, PipelineVariant::IndicatorEnhanced);
        let absent = orchestrator.run(&request(&["AAPL"])).await;

        let observed = observed.get("AAPL").unwrap().as_ref().unwrap();
        let absent = absent.get("AAPL").unwrap().as_ref().unwrap();
        assert!(observed.sentiment_observed);
        assert!(!absent.sentiment_observed);
        assert_eq!(observed.horizon_days, absent.horizon_days);
    }

    #[tokio::test]
    async fn test_all_failures_is_total_failure() {
        let provider = MockProvider::new();
        let (orchestrator, _) = orchestrator_with(provider, PipelineVariant::Baseline);

        let outcome = orchestrator.run(&request(&["NOPE1", "NOPE2"])).await;
        assert!(outcome.is_total_failure());
        assert_eq!(outcome.failed(), 2);
    }

    #[tokio::test]
    async fn test_data_timeout_marks_symbol_failed() {
        let provider = MockProvider::new()
            .with_series("SLOW", 150)
            .with_history_delay(Duration::from_millis(200));
        let store = Arc::new(MockStore::default());
        let config = OrchestratorConfig {
            variant: PipelineVariant::Baseline,
            data_timeout: Duration::from_millis(20),
            model: ModelConfig::default().with_seed(7),
            ..OrchestratorConfig::default()
        };
        let orchestrator = ForecastOrchestrator::new(Arc::new(provider), store, config);

        let outcome = orchestrator.run(&request(&["SLOW"])).await;
        match outcome.get("SLOW").unwrap() {
            Err(ForecastError::DataSourceTimeout(_)) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_deadline_resolves_unfinished_symbols() {
        let provider = MockProvider::new()
            .with_series("SLOW", 150)
            .with_history_delay(Duration::from_millis(500));
        let store = Arc::new(MockStore::default());
        let config = OrchestratorConfig {
            variant: PipelineVariant::Baseline,
            // Data timeout alone would still allow the fetch; only the
            // request deadline can cut this symbol off.
            data_timeout: Duration::from_secs(30),
            request_deadline: Duration::from_millis(50),
            model: ModelConfig::default().with_seed(7),
            ..OrchestratorConfig::default()
        };
        let orchestrator = ForecastOrchestrator::new(Arc::new(provider), store, config);

        let outcome = orchestrator.run(&request(&["SLOW"])).await;
        match outcome.get("SLOW").unwrap() {
            Err(ForecastError::DataSourceTimeout(d)) => {
                assert_eq!(*d, Duration::from_millis(50));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fit_timeout_marks_symbol_failed() {
        let provider = MockProvider::new().with_series("HEAVY", 300);
        let store = Arc::new(MockStore::default());
        let config = OrchestratorConfig {
            variant: PipelineVariant::Baseline,
            fit_timeout: Duration::from_millis(1),
            // Enough simulation draws that the fit cannot finish in time.
            model: ModelConfig {
                uncertainty_samples: 500_000,
                ..ModelConfig::default().with_seed(7)
            },
            ..OrchestratorConfig::default()
        };
        let orchestrator = ForecastOrchestrator::new(Arc::new(provider), store, config);

        let outcome = orchestrator.run(&request(&["HEAVY"])).await;
        match outcome.get("HEAVY").unwrap() {
            Err(ForecastError::ModelFitTimeout(d)) => {
                assert_eq!(*d, Duration::from_millis(1));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_symbols_normalized_and_ordered() {
        let provider = MockProvider::new()
            .with_series("AAPL", 150)
            .with_series("MSFT", 150);
        let (orchestrator, _) = orchestrator_with(provider, PipelineVariant::Baseline);

        let request = ForecastRequest::new(["  aapl ", "msft", "AAPL"], 0.5, 7).unwrap();
        assert_eq!(request.symbols, vec!["AAPL", "MSFT"]);

        let outcome = orchestrator.run(&request).await;
        let order: Vec<&str> = outcome.outcomes.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["AAPL", "MSFT"]);
        assert_eq!(outcome.succeeded(), 2);
    }

    #[test]
    fn test_pipeline_variant_parsing() {
        assert_eq!(
            "baseline".parse::<PipelineVariant>().unwrap(),
            PipelineVariant::Baseline
        );
        assert_eq!(
            "indicators".parse::<PipelineVariant>().unwrap(),
            PipelineVariant::IndicatorEnhanced
        );
        assert!("bogus".parse::<PipelineVariant>().is_err());
    }
}
