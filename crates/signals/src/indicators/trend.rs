//! Moving-average helpers shared by the other indicators and the scorer.

use common::Candle;

/// Simple moving average of the last `period` values.
/// Returns `None` with fewer than `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let tail = &values[values.len() - period..];
    Some(tail.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average over the whole slice, seeded with the SMA of
/// the first `period` values. Returns `None` with fewer than `period` values.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}

/// Full EMA series. Element `i` corresponds to input index `period - 1 + i`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    let mut current = seed;
    for &v in &values[period..] {
        current = current + k * (v - current);
        out.push(current);
    }
    out
}

/// VWAP proxy: rolling mean of the typical price (H+L+C)/3 over `period`
/// candles. No volume is available on the feed, same approximation the
/// scorer has always used.
pub fn vwap_proxy(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let tail = &candles[candles.len() - period..];
    let sum: f64 = tail
        .iter()
        .map(|c| (c.high + c.low + c.close) / 3.0)
        .sum();
    Some(sum / period as f64)
}
