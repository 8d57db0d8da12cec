use forecast_core::{ForecastError, IndicatorFrame, PriceSeries};

pub const MACD_FAST_SPAN: usize = 12;
pub const MACD_SLOW_SPAN: usize = 26;
pub const MACD_SIGNAL_SPAN: usize = 9;
pub const RSI_PERIOD: usize = 14;

/// Points required before every indicator column is defined. The slow MACD
/// span is the longest smoothing window; the signal line seeds from the
/// first defined MACD value, so it adds no further warm-up.
pub const WARMUP_LEN: usize = MACD_SLOW_SPAN;

/// Exponential Moving Average, seeded from the first sample:
/// `ema[0] = data[0]`, `ema[i] = data[i]*alpha + ema[i-1]*(1-alpha)`,
/// `alpha = 2/(span+1)`.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || data.is_empty() {
        return vec![];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    result.push(data[0]);

    for i in 1..data.len() {
        let prev = result[i - 1];
        result.push(data[i] * alpha + prev * (1.0 - alpha));
    }

    result
}

/// MACD line (EMA12 - EMA26) and its signal line (EMA9 of MACD), both
/// aligned 1:1 to `closes`. Both are undefined before the slow span has
/// elapsed; the signal EMA seeds from the first defined MACD value, so the
/// two lines share the same warm-up boundary.
pub fn macd(closes: &[f64]) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let n = closes.len();
    if n < MACD_SLOW_SPAN {
        return (vec![None; n], vec![None; n]);
    }

    let ema_fast = ema(closes, MACD_FAST_SPAN);
    let ema_slow = ema(closes, MACD_SLOW_SPAN);

    let macd_start = MACD_SLOW_SPAN - 1;
    let mut macd_line = vec![None; n];
    for i in macd_start..n {
        macd_line[i] = Some(ema_fast[i] - ema_slow[i]);
    }

    // Signal = EMA of the defined MACD tail, seeded at its first value.
    let defined: Vec<f64> = macd_line[macd_start..].iter().map(|v| v.unwrap_or(0.0)).collect();
    let signal_tail = ema(&defined, MACD_SIGNAL_SPAN);

    let mut signal_line = vec![None; n];
    for i in macd_start..n {
        signal_line[i] = Some(signal_tail[i - macd_start]);
    }

    (macd_line, signal_line)
}

/// Relative Strength Index over rolling 14-period mean gain/loss of
/// close-to-close differences, aligned 1:1 to `closes`. Saturates to 100
/// when the window holds no losses.
pub fn rsi(closes: &[f64]) -> Vec<Option<f64>> {
    let n = closes.len();
    if n < RSI_PERIOD + 1 {
        return vec![None; n];
    }

    let mut gains = Vec::with_capacity(n - 1);
    let mut losses = Vec::with_capacity(n - 1);
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut result = vec![None; n];
    for i in RSI_PERIOD..n {
        // Window of the RSI_PERIOD differences ending at close i.
        let window = (i - RSI_PERIOD)..i;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / RSI_PERIOD as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / RSI_PERIOD as f64;

        let value = if avg_loss == 0.0 {
            100.0
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        result[i] = Some(value);
    }

    result
}

/// Computes the full indicator frame for a price series.
///
/// Fails with `InsufficientHistory` when the series is shorter than the
/// longest warm-up window, since no row would have full coverage.
pub fn compute(series: &PriceSeries) -> Result<IndicatorFrame, ForecastError> {
    if series.len() < WARMUP_LEN {
        return Err(ForecastError::InsufficientHistory {
            required: WARMUP_LEN,
            actual: series.len(),
        });
    }

    let closes = series.closes();
    let (macd_line, signal_line) = macd(&closes);
    let rsi_line = rsi(&closes);

    Ok(IndicatorFrame {
        macd: macd_line,
        signal: signal_line,
        rsi: rsi_line,
    })
}
