use proptest::prelude::*;
use signals::indicators::{adx, atr, bollinger, rsi, stochastic};

fn prices() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.5f64..2.0, 20..80)
}

fn candles() -> impl Strategy<Value = Vec<common::Candle>> {
    prices().prop_map(|closes| {
        closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| common::Candle {
                epoch: i as i64 * 60,
                open: close,
                high: close * 1.001,
                low: close * 0.999,
                close,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn rsi_stays_in_range(closes in prices()) {
        if let Some(v) = rsi(&closes, 14) {
            prop_assert!((0.0..=100.0).contains(&v), "rsi = {v}");
        }
    }

    #[test]
    fn stochastic_stays_in_range(candles in candles()) {
        if let Some((k, d)) = stochastic(&candles, 14, 3) {
            prop_assert!((0.0..=100.0).contains(&k), "k = {k}");
            prop_assert!((0.0..=100.0).contains(&d), "d = {d}");
        }
    }

    #[test]
    fn adx_stays_in_range(candles in candles()) {
        if let Some(v) = adx(&candles, 14) {
            prop_assert!((0.0..=100.0).contains(&v), "adx = {v}");
        }
    }

    #[test]
    fn atr_is_never_negative(candles in candles()) {
        if let Some(v) = atr(&candles, 14) {
            prop_assert!(v >= 0.0, "atr = {v}");
        }
    }

    #[test]
    fn bollinger_bands_are_ordered(closes in prices()) {
        if let Some(b) = bollinger(&closes, 20, 2.0) {
            prop_assert!(b.lower <= b.middle && b.middle <= b.upper);
            prop_assert!(b.width_pct() >= 0.0);
        }
    }
}
