use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{ChartArtifact, ChartEntry, ChartMetadata, ForecastError, ForecastResult, PriceSeries};

/// External price/fundamentals provider.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily OHLCV history for `symbol` over `[start, end]`.
    async fn get_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ForecastError>;

    /// Market-sentiment scalar for `symbol`, if the provider covers it.
    /// Sentiment is an enhancement: implementations absorb every provider
    /// error into `None` instead of failing.
    async fn get_sentiment(&self, symbol: &str) -> Option<f64>;
}

/// External chart artifact store: renders, persists, lists and deletes
/// generated charts. The forecast core holds no reference to a result after
/// handing it off here.
#[async_trait]
pub trait ChartStore: Send + Sync {
    fn render(
        &self,
        result: &ForecastResult,
        metadata: &ChartMetadata,
    ) -> Result<ChartArtifact, ForecastError>;

    /// Persists the artifact and its metadata, returning the stored
    /// filename.
    async fn save(
        &self,
        artifact: ChartArtifact,
        metadata: &ChartMetadata,
    ) -> Result<String, ForecastError>;

    async fn list(&self) -> Result<Vec<ChartEntry>, ForecastError>;

    /// Removes a stored chart. Returns false when no such chart exists.
    async fn delete(&self, filename: &str) -> Result<bool, ForecastError>;
}
