use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use forecast_core::{ForecastError, MarketDataProvider, PricePoint, PriceSeries};
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; stock-prophet/0.1)";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let wait_until = match ts.front().and_then(|f| f.checked_add(self.window)) {
                Some(t) => t,
                None => now + self.window,
            };
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for Yahoo API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Yahoo Finance market-data client: daily OHLCV history via the v8 chart
/// API and the analyst `recommendationMean` scalar via quoteSummary.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooClient {
    pub fn new() -> Self {
        // Yahoo throttles unauthenticated clients aggressively; 60/min is a
        // safe default, overridable via YAHOO_RATE_LIMIT.
        let rate_limit: usize = std::env::var("YAHOO_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: BASE_URL.to_string(),
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ForecastError> {
        let request = builder
            .build()
            .map_err(|e| ForecastError::DataSourceUnavailable(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request.try_clone().ok_or_else(|| {
                ForecastError::DataSourceUnavailable("Cannot clone request".to_string())
            })?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| ForecastError::DataSourceUnavailable(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 5u64 * (attempt as u64 + 1);
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(ForecastError::DataSourceUnavailable(
            "Rate limited by Yahoo after 3 retries".to_string(),
        ))
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ChartResponse, ForecastError> {
        let period1 = to_unix(start);
        let period2 = to_unix(end.succ_opt().unwrap_or(end));
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ]))
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ForecastError::SymbolNotFound(symbol.to_string()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ForecastError::DataSourceUnavailable(e.to_string()))?;

        let parsed: ChartResponse = serde_json::from_str(&body).map_err(|e| {
            ForecastError::DataSourceUnavailable(format!("HTTP {}: {}", status, e))
        })?;

        Ok(parsed)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn get_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ForecastError> {
        tracing::info!("Downloading {} history from {} to {}", symbol, start, end);

        let chart = self.fetch_chart(symbol, start, end).await?;
        parse_chart(symbol, chart)
    }

    async fn get_sentiment(&self, symbol: &str) -> Option<f64> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);
        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("modules", "financialData")]),
            )
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Sentiment fetch failed for {}: {}", symbol, e);
                return None;
            }
        };

        let parsed: QuoteSummaryResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("Sentiment response unparseable for {}: {}", symbol, e);
                return None;
            }
        };

        let sentiment = parsed
            .quote_summary
            .and_then(|qs| qs.result)
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .and_then(|r| r.financial_data)
            .and_then(|fd| fd.recommendation_mean)
            .and_then(|rm| rm.raw);

        match sentiment {
            Some(value) => {
                tracing::info!("Sentiment for {} (recommendationMean): {}", symbol, value);
                Some(value)
            }
            None => {
                tracing::debug!("No sentiment coverage for {}", symbol);
                None
            }
        }
    }
}

fn to_unix(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Maps a chart response into a normalized price series. Rows where Yahoo
/// reports partial data (nulls on market holidays) are skipped.
fn parse_chart(symbol: &str, chart: ChartResponse) -> Result<PriceSeries, ForecastError> {
    let chart = chart.chart;

    if let Some(error) = chart.error {
        let code = error.code.unwrap_or_default();
        return if code == "Not Found" {
            Err(ForecastError::SymbolNotFound(symbol.to_string()))
        } else {
            Err(ForecastError::DataSourceUnavailable(format!(
                "{}: {}",
                code,
                error.description.unwrap_or_default()
            )))
        };
    }

    let result = chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| ForecastError::SymbolNotFound(symbol.to_string()))?;

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| {
            ForecastError::DataSourceUnavailable("chart response missing quote data".to_string())
        })?;

    let mut points = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let date = match DateTime::<Utc>::from_timestamp(ts, 0) {
            Some(dt) => dt.date_naive(),
            None => continue,
        };

        let (open, high, low, close, volume) = match (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
            quote.volume.get(i).copied().flatten(),
        ) {
            (Some(o), Some(h), Some(l), Some(c), Some(v)) => (o, h, l, c, v),
            _ => continue,
        };

        points.push(PricePoint {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if points.is_empty() {
        return Err(ForecastError::DataSourceUnavailable(format!(
            "No data found for {}",
            symbol
        )));
    }

    Ok(PriceSeries::new(symbol, points))
}

// ---- Yahoo response shapes ----

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: Option<QuoteSummary>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "financialData")]
    financial_data: Option<FinancialData>,
}

#[derive(Debug, Deserialize)]
struct FinancialData {
    #[serde(rename = "recommendationMean")]
    recommendation_mean: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_skips_null_rows() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1704153600, 1704240000, 1704326400],
                    "indicators": {
                        "quote": [{
                            "open":   [184.2, null, 185.0],
                            "high":   [185.9, null, 186.4],
                            "low":    [183.4, null, 184.1],
                            "close":  [185.6, null, 185.9],
                            "volume": [52164500, null, 47471400]
                        }]
                    }
                }],
                "error": null
            }
        }"#;

        let chart: ChartResponse = serde_json::from_str(body).unwrap();
        let series = parse_chart("AAPL", chart).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.symbol(), "AAPL");
        assert!((series.closes()[0] - 185.6).abs() < 1e-9);
    }

    #[test]
    fn test_parse_chart_not_found_error() {
        let body = r#"{
            "chart": {
                "result": null,
                "error": {
                    "code": "Not Found",
                    "description": "No data found, symbol may be delisted"
                }
            }
        }"#;

        let chart: ChartResponse = serde_json::from_str(body).unwrap();
        let err = parse_chart("BOGUS123", chart).unwrap_err();
        assert!(matches!(err, ForecastError::SymbolNotFound(_)));
    }

    #[test]
    fn test_parse_chart_empty_series_is_unavailable() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [],
                    "indicators": { "quote": [{}] }
                }],
                "error": null
            }
        }"#;

        let chart: ChartResponse = serde_json::from_str(body).unwrap();
        let err = parse_chart("EMPTY", chart).unwrap_err();
        assert!(matches!(err, ForecastError::DataSourceUnavailable(_)));
    }

    #[test]
    fn test_quote_summary_sentiment_shape() {
        let body = r#"{
            "quoteSummary": {
                "result": [{
                    "financialData": {
                        "recommendationMean": { "raw": 1.9, "fmt": "1.90" }
                    }
                }],
                "error": null
            }
        }"#;

        let parsed: QuoteSummaryResponse = serde_json::from_str(body).unwrap();
        let value = parsed
            .quote_summary
            .and_then(|qs| qs.result)
            .and_then(|mut r| r.pop())
            .and_then(|r| r.financial_data)
            .and_then(|fd| fd.recommendation_mean)
            .and_then(|rm| rm.raw);
        assert_eq!(value, Some(1.9));
    }
}
