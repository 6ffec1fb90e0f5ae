use common::Candle;

/// Stochastic oscillator: returns the latest (%K, %D).
///
/// %K = 100 × (close − lowest low) / (highest high − lowest low) over
/// `k_period` candles; %D = SMA of the last `d_period` %K values.
/// Needs at least `k_period + d_period - 1` candles.
pub fn stochastic(candles: &[Candle], k_period: usize, d_period: usize) -> Option<(f64, f64)> {
    if k_period == 0 || d_period == 0 || candles.len() < k_period + d_period - 1 {
        return None;
    }

    let k_at = |end: usize| -> f64 {
        let window = &candles[end + 1 - k_period..=end];
        let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let range = high - low;
        if range <= 0.0 {
            50.0 // flat window, no information
        } else {
            (candles[end].close - low) / range * 100.0
        }
    };

    let last = candles.len() - 1;
    let ks: Vec<f64> = (0..d_period).map(|i| k_at(last - i)).collect();
    let k = ks[0];
    let d = ks.iter().sum::<f64>() / d_period as f64;
    Some((k, d))
}
