#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use chrono::NaiveDate;
    use forecast_core::{ForecastError, PricePoint, PriceSeries};

    fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            })
            .collect();
        PriceSeries::new("TEST", points)
    }

    fn trending_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.7).sin() * 2.0)
            .collect()
    }

    #[test]
    fn test_ema_seeded_from_first_value() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), data.len());
        assert!((result[0] - 22.0).abs() < 1e-12);
        // alpha = 0.5 for span 3: ema[1] = 24*0.5 + 22*0.5 = 23
        assert!((result[1] - 23.0).abs() < 1e-12);
    }

    #[test]
    fn test_ema_constant_series_stays_constant() {
        let data = vec![50.0; 30];
        for value in ema(&data, 12) {
            assert!((value - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ema_empty_data() {
        let data: Vec<f64> = vec![];
        assert!(ema(&data, 5).is_empty());
    }

    #[test]
    fn test_macd_warmup_boundaries() {
        let closes = trending_closes(60);
        let (macd_line, signal_line) = macd(&closes);

        assert_eq!(macd_line.len(), 60);
        assert_eq!(signal_line.len(), 60);

        for i in 0..25 {
            assert!(macd_line[i].is_none(), "macd defined too early at {}", i);
            assert!(signal_line[i].is_none(), "signal defined too early at {}", i);
        }
        for i in 25..60 {
            assert!(macd_line[i].is_some(), "macd undefined at {}", i);
            assert!(signal_line[i].is_some(), "signal undefined at {}", i);
        }
    }

    #[test]
    fn test_macd_defined_from_slow_span_exactly() {
        // The shortest series with any defined values: both lines appear at
        // the last index together.
        let closes = trending_closes(MACD_SLOW_SPAN);
        let (macd_line, signal_line) = macd(&closes);

        assert!(macd_line[MACD_SLOW_SPAN - 2].is_none());
        assert!(macd_line[MACD_SLOW_SPAN - 1].is_some());
        assert!(signal_line[MACD_SLOW_SPAN - 1].is_some());
        // A one-sample EMA is its seed.
        assert_eq!(signal_line[MACD_SLOW_SPAN - 1], macd_line[MACD_SLOW_SPAN - 1]);
    }

    #[test]
    fn test_macd_short_series_all_undefined() {
        let closes = trending_closes(20);
        let (macd_line, signal_line) = macd(&closes);

        assert!(macd_line.iter().all(|v| v.is_none()));
        assert!(signal_line.iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        // Fast EMA sits above slow EMA when prices keep rising.
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let (macd_line, _) = macd(&closes);

        for value in macd_line.iter().flatten() {
            assert!(*value > 0.0);
        }
    }

    #[test]
    fn test_rsi_warmup_and_bounds() {
        let closes = trending_closes(50);
        let result = rsi(&closes);

        assert_eq!(result.len(), 50);
        for i in 0..RSI_PERIOD {
            assert!(result[i].is_none(), "rsi defined too early at {}", i);
        }
        for i in RSI_PERIOD..50 {
            let value = result[i].expect("rsi undefined after warm-up");
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_saturates_at_100_without_losses() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&closes);

        for value in result.iter().flatten() {
            assert!((value - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rsi_zero_without_gains() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let result = rsi(&closes);

        for value in result.iter().flatten() {
            assert!(value.abs() < 1e-9);
        }
    }

    #[test]
    fn test_compute_insufficient_history() {
        let series = series_from_closes(&trending_closes(10));
        let err = compute(&series).unwrap_err();

        match err {
            ForecastError::InsufficientHistory { required, actual } => {
                assert_eq!(required, WARMUP_LEN);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_compute_accepts_minimum_length_series() {
        let series = series_from_closes(&trending_closes(WARMUP_LEN));
        let frame = compute(&series).unwrap();

        assert_eq!(frame.coverage_start(), Some(WARMUP_LEN - 1));
        assert!(frame.macd[WARMUP_LEN - 1].is_some());
        assert!(frame.signal[WARMUP_LEN - 1].is_some());
        assert!(frame.rsi[WARMUP_LEN - 1].is_some());
    }

    #[test]
    fn test_compute_full_coverage_after_warmup() {
        let series = series_from_closes(&trending_closes(60));
        let frame = compute(&series).unwrap();

        assert_eq!(frame.len(), 60);
        assert_eq!(frame.coverage_start(), Some(WARMUP_LEN - 1));
    }
}
