use forecast_core::{ForecastError, IndicatorFrame, PriceSeries, RegressorFrame};

/// Merges price history, indicator outputs and the sentiment scalar into one
/// aligned, gap-free regressor frame.
///
/// Rows lacking full indicator coverage (the warm-up window) are dropped, so
/// the frame's dates are a contiguous suffix of the series' dates. The
/// sentiment scalar is broadcast across every retained row; when the provider
/// had no coverage, `neutral` is broadcast instead and the frame records that
/// sentiment was not observed.
pub fn assemble(
    series: &PriceSeries,
    frame: &IndicatorFrame,
    sentiment: Option<f64>,
    neutral: f64,
) -> Result<RegressorFrame, ForecastError> {
    if frame.len() != series.len() {
        return Err(ForecastError::ModelFitError(format!(
            "indicator frame ({} rows) does not align with price series ({} rows)",
            frame.len(),
            series.len()
        )));
    }

    let start = frame
        .coverage_start()
        .ok_or(ForecastError::EmptyRegressorFrame)?;

    let dates = series.dates()[start..].to_vec();
    let n = dates.len();

    let mut macd = Vec::with_capacity(n);
    let mut signal = Vec::with_capacity(n);
    let mut rsi = Vec::with_capacity(n);
    for i in start..frame.len() {
        // Coverage is contiguous once all warm-ups have elapsed.
        match (frame.macd[i], frame.signal[i], frame.rsi[i]) {
            (Some(m), Some(s), Some(r)) => {
                macd.push(m);
                signal.push(s);
                rsi.push(r);
            }
            _ => return Err(ForecastError::EmptyRegressorFrame),
        }
    }

    let sentiment_observed = sentiment.is_some();
    let sentiment_value = sentiment.unwrap_or(neutral);

    tracing::debug!(
        symbol = series.symbol(),
        rows = n,
        dropped = start,
        sentiment_observed,
        "assembled regressor frame"
    );

    Ok(RegressorFrame {
        dates,
        macd,
        signal,
        rsi,
        sentiment: vec![sentiment_value; n],
        sentiment_observed,
    })
}
