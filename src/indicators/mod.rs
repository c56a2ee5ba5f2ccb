//! Technical indicator calculations
//!
//! Pure numeric functions over price series. Each function returns a sequence
//! the same length as its input; positions where the lookback window is not
//! yet filled hold `f64::NAN`. Callers must treat NaN as "condition not met"
//! and never let it reach a composite score.

use crate::providers::types::Candle;

/// Round to 2 decimal places
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Simple moving average over a trailing window.
///
/// Values before index `period - 1` are NaN.
pub fn moving_average(series: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; series.len()];
    if period == 0 || series.len() < period {
        return out;
    }

    let mut window_sum: f64 = series[..period].iter().sum();
    out[period - 1] = round2(window_sum / period as f64);

    for i in period..series.len() {
        window_sum += series[i] - series[i - period];
        out[i] = round2(window_sum / period as f64);
    }

    out
}

/// Wilder relative strength index.
///
/// The first `period` values are NaN. The running average gain/loss carries a
/// weight of `(period - 1) / period` on the prior average and `1 / period` on
/// the new observation. An average loss of exactly zero yields 100.
pub fn rsi(series: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; series.len()];
    if period == 0 || series.len() <= period {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = series[i] - series[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss += -delta;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    let weight = (period - 1) as f64;
    for i in (period + 1)..series.len() {
        let delta = series[i] - series[i - 1];
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { -delta } else { 0.0 };
        avg_gain = (avg_gain * weight + gain) / period as f64;
        avg_loss = (avg_loss * weight + loss) / period as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    round2(100.0 - 100.0 / (1.0 + rs))
}

/// Average true range with Wilder smoothing.
///
/// True range per bar is `max(high - low, |high - prev_close|,
/// |low - prev_close|)`; the first bar has no previous close and uses
/// `high - low` only. The first `period` values are NaN; the seed is the
/// arithmetic mean of the first `period` true ranges.
pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; candles.len()];
    if period == 0 || candles.len() <= period {
        return out;
    }

    let mut true_ranges = Vec::with_capacity(candles.len());
    true_ranges.push(candles[0].high - candles[0].low);
    for i in 1..candles.len() {
        let prev_close = candles[i - 1].close;
        let high_low = candles[i].high - candles[i].low;
        let high_close = (candles[i].high - prev_close).abs();
        let low_close = (candles[i].low - prev_close).abs();
        true_ranges.push(high_low.max(high_close).max(low_close));
    }

    let mut smoothed: f64 = true_ranges[..period].iter().sum::<f64>() / period as f64;
    let weight = (period - 1) as f64;
    for i in period..candles.len() {
        smoothed = (smoothed * weight + true_ranges[i]) / period as f64;
        out[i] = smoothed;
    }

    out
}

/// Exponential moving average, seeded with the simple average of the first
/// window. Values before index `period - 1` are NaN.
pub fn ema(series: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; series.len()];
    if period == 0 || series.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut value: f64 = series[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = round2(value);

    for i in period..series.len() {
        value = (series[i] - value) * multiplier + value;
        out[i] = round2(value);
    }

    out
}

/// Percentage change between each value and the value `period` positions
/// earlier. The first `period` values are NaN, as is any position whose
/// reference price is zero.
pub fn rate_of_change(series: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; series.len()];
    if period == 0 {
        return out;
    }

    for i in period..series.len() {
        let past = series[i - period];
        if past != 0.0 {
            out[i] = round2((series[i] - past) / past * 100.0);
        }
    }

    out
}

/// Short-term support and resistance estimated as the min/max close of the
/// trailing window. Returns `None` when the series is shorter than the window.
pub fn support_resistance(series: &[f64], window: usize) -> Option<(f64, f64)> {
    if window == 0 || series.len() < window {
        return None;
    }

    let slice = &series[series.len() - window..];
    let mut low = slice[0];
    let mut high = slice[0];
    for &value in &slice[1..] {
        low = low.min(value);
        high = high.max(value);
    }
    Some((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_moving_average_window() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ma = moving_average(&series, 3);

        assert!(ma[0].is_nan());
        assert!(ma[1].is_nan());
        assert_eq!(ma[2], 2.0);
        assert_eq!(ma[3], 3.0);
        assert_eq!(ma[4], 4.0);
    }

    #[test]
    fn test_moving_average_short_series() {
        let ma = moving_average(&[1.0, 2.0], 5);
        assert!(ma.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_moving_average_rounding() {
        let ma = moving_average(&[1.0, 2.0, 2.0], 3);
        assert_eq!(ma[2], 1.67);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let series: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let out = rsi(&series, 14);

        assert!(out[13].is_nan());
        assert_eq!(out[14], 100.0);
        assert_eq!(out[29], 100.0);
    }

    #[test]
    fn test_rsi_bounds() {
        // Alternating gains and losses of uneven size
        let mut series = vec![100.0];
        for i in 1..60 {
            let prev = series[i - 1];
            let delta = if i % 2 == 0 { 1.8 } else { -1.1 };
            series.push(prev + delta);
        }

        for value in rsi(&series, 14) {
            if !value.is_nan() {
                assert!((0.0..=100.0).contains(&value), "RSI out of bounds: {value}");
            }
        }
    }

    #[test]
    fn test_rsi_deterministic() {
        let series: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        assert_eq!(rsi(&series, 14), rsi(&series, 14));
    }

    #[test]
    fn test_atr_first_bar_uses_high_low_only() {
        let candles = vec![
            bar(12.0, 8.0, 10.0), // TR = 4.0
            bar(11.0, 9.0, 10.0), // TR = 2.0
            bar(14.0, 10.0, 12.0), // TR = max(4, 4, 0) = 4.0
            bar(13.0, 11.0, 12.0), // TR = max(2, 1, 1) = 2.0
        ];
        let out = atr(&candles, 2);

        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        // seed = (4 + 2) / 2 = 3; out[2] = (3 * 1 + 4) / 2 = 3.5
        assert!((out[2] - 3.5).abs() < 1e-9);
        // out[3] = (3.5 * 1 + 2) / 2 = 2.75
        assert!((out[3] - 2.75).abs() < 1e-9);
    }

    #[test]
    fn test_atr_insufficient_data() {
        let candles = vec![bar(12.0, 8.0, 10.0), bar(11.0, 9.0, 10.0)];
        assert!(atr(&candles, 14).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_ema_converges_toward_recent_prices() {
        let mut series = vec![10.0; 20];
        series.extend(std::iter::repeat(20.0).take(40));
        let out = ema(&series, 10);

        let last = *out.last().unwrap();
        assert!(last > 19.0 && last <= 20.0);
    }

    #[test]
    fn test_rate_of_change() {
        let series = [100.0, 101.0, 102.0, 110.0];
        let out = rate_of_change(&series, 3);

        assert!(out[2].is_nan());
        assert_eq!(out[3], 10.0);
    }

    #[test]
    fn test_support_resistance() {
        let series = [5.0, 9.0, 7.0, 3.0, 8.0];
        assert_eq!(support_resistance(&series, 3), Some((3.0, 8.0)));
        assert_eq!(support_resistance(&series, 9), None);
    }
}
