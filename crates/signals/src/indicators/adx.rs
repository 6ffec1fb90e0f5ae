use common::Candle;

use super::atr::true_range;

/// Average Directional Index over `period`, Wilder-smoothed.
///
/// Measures trend strength regardless of direction: 0 is pure chop, values
/// above ~35 mean a persistent one-sided move. Needs `2 * period` candles.
pub fn adx(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < 2 * period {
        return None;
    }

    // Wilder smoothing of TR and the two directional movements, emitting a
    // DX value once the first window is full.
    let mut tr_s = 0.0;
    let mut plus_s = 0.0;
    let mut minus_s = 0.0;
    let mut dxs = Vec::with_capacity(candles.len() - period);
    for (i, w) in candles.windows(2).enumerate() {
        let (prev, cur) = (&w[0], &w[1]);
        let up = cur.high - prev.high;
        let down = prev.low - cur.low;
        let plus = if up > down && up > 0.0 { up } else { 0.0 };
        let minus = if down > up && down > 0.0 { down } else { 0.0 };
        let tr = true_range(cur, prev.close);

        if i < period {
            tr_s += tr;
            plus_s += plus;
            minus_s += minus;
            if i + 1 < period {
                continue;
            }
        } else {
            tr_s = tr_s - tr_s / period as f64 + tr;
            plus_s = plus_s - plus_s / period as f64 + plus;
            minus_s = minus_s - minus_s / period as f64 + minus;
        }

        let (di_plus, di_minus) = if tr_s > 0.0 {
            (100.0 * plus_s / tr_s, 100.0 * minus_s / tr_s)
        } else {
            (0.0, 0.0)
        };
        let di_sum = di_plus + di_minus;
        dxs.push(if di_sum > 0.0 {
            100.0 * (di_plus - di_minus).abs() / di_sum
        } else {
            0.0
        });
    }

    if dxs.len() < period {
        return None;
    }
    let mut adx = dxs[..period].iter().sum::<f64>() / period as f64;
    for dx in &dxs[period..] {
        adx = (adx * (period as f64 - 1.0) + dx) / period as f64;
    }
    Some(adx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64) -> Candle {
        Candle {
            epoch: 0,
            open: close,
            high: close * 1.0005,
            low: close * 0.9995,
            close,
        }
    }

    #[test]
    fn needs_enough_candles() {
        let candles: Vec<Candle> = (0..27).map(|i| candle(100.0 + i as f64)).collect();
        assert!(adx(&candles, 14).is_none());
        assert!(adx(&candles, 0).is_none());
    }

    #[test]
    fn persistent_trend_reads_strong() {
        // Every bar makes a higher high and a higher low.
        let candles: Vec<Candle> = (0..60)
            .map(|i| candle(100.0 * 1.005f64.powi(i)))
            .collect();
        let a = adx(&candles, 14).unwrap();
        assert!(a > 40.0, "adx = {a}");
    }

    #[test]
    fn chop_reads_weak() {
        // Alternating bars: directional movement cancels out.
        let candles: Vec<Candle> = (0..60)
            .map(|i| candle(100.0 + if i % 2 == 0 { 0.5 } else { -0.5 }))
            .collect();
        let a = adx(&candles, 14).unwrap();
        assert!(a < 25.0, "adx = {a}");
    }

    #[test]
    fn stays_in_range() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| candle(100.0 * 0.995f64.powi(i)))
            .collect();
        let a = adx(&candles, 14).unwrap();
        assert!((0.0..=100.0).contains(&a), "adx = {a}");
    }
}
