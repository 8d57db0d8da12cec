use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::ForecastError;

/// Daily OHLCV record for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered daily price history for one symbol.
///
/// Construction normalizes provider output: points are sorted by date and
/// duplicate dates collapse to one record, so the series always holds
/// strictly increasing dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// Per-date indicator values aligned 1:1 with the source series.
/// Warm-up entries are `None`, never zero-filled.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.macd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macd.is_empty()
    }

    /// First index at which every indicator is defined, if any.
    pub fn coverage_start(&self) -> Option<usize> {
        (0..self.len()).find(|&i| {
            self.macd[i].is_some() && self.signal[i].is_some() && self.rsi[i].is_some()
        })
    }
}

/// Gap-free feature frame: indicator columns plus broadcast sentiment,
/// restricted to the contiguous suffix of dates with full indicator coverage.
#[derive(Debug, Clone)]
pub struct RegressorFrame {
    pub dates: Vec<NaiveDate>,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub rsi: Vec<f64>,
    pub sentiment: Vec<f64>,
    /// False when the sentiment column is the broadcast neutral default.
    pub sentiment_observed: bool,
}

impl RegressorFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Batch forecast request. Use [`ForecastRequest::new`] so symbols come out
/// trimmed, uppercased and deduplicated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub symbols: Vec<String>,
    pub years_history: f64,
    pub horizon_days: u32,
}

impl ForecastRequest {
    pub fn new(
        symbols: impl IntoIterator<Item = impl AsRef<str>>,
        years_history: f64,
        horizon_days: u32,
    ) -> Result<Self, ForecastError> {
        let mut cleaned: Vec<String> = Vec::new();
        for s in symbols {
            let sym = s.as_ref().trim().to_uppercase();
            if !sym.is_empty() && !cleaned.contains(&sym) {
                cleaned.push(sym);
            }
        }

        if cleaned.is_empty() {
            return Err(ForecastError::InvalidRequest(
                "at least one symbol is required".to_string(),
            ));
        }
        if !(years_history > 0.0) || !years_history.is_finite() {
            return Err(ForecastError::InvalidRequest(format!(
                "years_history must be positive, got {}",
                years_history
            )));
        }
        if horizon_days == 0 {
            return Err(ForecastError::InvalidRequest(
                "horizon_days must be positive".to_string(),
            ));
        }

        Ok(Self {
            symbols: cleaned,
            years_history,
            horizon_days,
        })
    }

    pub fn lookback_days(&self) -> i64 {
        (self.years_history * 365.0) as i64
    }
}

/// One forecasted day with credible-interval bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ForecastPoint {
    /// Clamps the bounds so `lower <= predicted <= upper` always holds,
    /// even when empirical quantiles straddle the point estimate.
    pub fn new(date: NaiveDate, predicted: f64, lower: f64, upper: f64) -> Self {
        Self {
            date,
            predicted,
            lower: lower.min(predicted),
            upper: upper.max(predicted),
        }
    }
}

/// Forecast output for one symbol: history, future points and the model
/// configuration that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub symbol: String,
    pub history: PriceSeries,
    pub forecast: Vec<ForecastPoint>,
    pub config: ModelConfig,
}

impl ForecastResult {
    pub fn last_forecast_date(&self) -> Option<NaiveDate> {
        self.forecast.last().map(|p| p.date)
    }
}

/// Metadata persisted next to a rendered chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartMetadata {
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub horizon_days: u32,
    pub years_history: f64,
    pub title: String,
}

/// Renders a years-of-history value for titles and gallery headings:
/// whole values drop the fractional part ("2", not "2.0").
pub fn format_years(years: f64) -> String {
    if years.fract() == 0.0 {
        format!("{}", years as i64)
    } else {
        format!("{}", years)
    }
}

/// A rendered chart awaiting persistence.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    /// Self-contained HTML document.
    pub html: String,
    /// Filename without extension, e.g. "AAPL, until March 3, 2027".
    pub filename_stem: String,
}

/// A stored chart as returned by the gallery listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartEntry {
    pub filename: String,
    pub metadata: ChartMetadata,
}
