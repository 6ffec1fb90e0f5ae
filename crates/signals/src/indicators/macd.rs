use super::trend::ema_series;

/// Latest MACD values: line = EMA(fast) − EMA(slow), signal = EMA of the
/// line, histogram = line − signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute MACD from close prices (oldest first).
/// Needs at least `slow + signal_period - 1` values.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Option<Macd> {
    if fast >= slow || closes.len() < slow + signal_period - 1 {
        return None;
    }

    let fast_series = ema_series(closes, fast);
    let slow_series = ema_series(closes, slow);
    // Align the two series on the slow one's start.
    let offset = slow - fast;
    let line_series: Vec<f64> = slow_series
        .iter()
        .zip(fast_series[offset..].iter())
        .map(|(s, f)| f - s)
        .collect();

    let signal_series = ema_series(&line_series, signal_period);
    let line = *line_series.last()?;
    let signal = *signal_series.last()?;
    Some(Macd {
        line,
        signal,
        histogram: line - signal,
    })
}
