use common::Candle;

/// True range of one candle against the previous close: the candle's own
/// range widened by any gap from the prior bar.
pub(super) fn true_range(c: &Candle, prev_close: f64) -> f64 {
    (c.high - c.low)
        .max((c.high - prev_close).abs())
        .max((c.low - prev_close).abs())
}

/// Average True Range over `period`, Wilder-smoothed.
/// Needs `period + 1` candles.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }
    let trs: Vec<f64> = candles
        .windows(2)
        .map(|w| true_range(&w[1], w[0].close))
        .collect();
    let mut atr = trs[..period].iter().sum::<f64>() / period as f64;
    for tr in &trs[period..] {
        atr = (atr * (period as f64 - 1.0) + tr) / period as f64;
    }
    Some(atr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64, range: f64) -> Candle {
        Candle {
            epoch: 0,
            open: close,
            high: close + range / 2.0,
            low: close - range / 2.0,
            close,
        }
    }

    #[test]
    fn needs_enough_candles() {
        let candles: Vec<Candle> = (0..14).map(|_| candle(1.0, 0.1)).collect();
        assert!(atr(&candles, 14).is_none());
        assert!(atr(&candles, 0).is_none());
    }

    #[test]
    fn constant_range_converges_to_that_range() {
        let candles: Vec<Candle> = (0..40).map(|_| candle(100.0, 2.0)).collect();
        let a = atr(&candles, 14).unwrap();
        assert!((a - 2.0).abs() < 1e-9, "atr = {a}");
    }

    #[test]
    fn gaps_widen_the_range() {
        // Tight candles that gap 5.0 higher every bar.
        let candles: Vec<Candle> = (0..40)
            .map(|i| candle(100.0 + i as f64 * 5.0, 0.5))
            .collect();
        let a = atr(&candles, 14).unwrap();
        assert!(a > 5.0, "atr = {a}");
    }
}
