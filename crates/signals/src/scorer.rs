//! Pure candle-window → optional direction scorer.
//!
//! A basket of indicators each votes CALL or PUT points; ADX and ATR then
//! boost or dock the leading side for trend strength and volatility. A
//! signal is only emitted when the total score, the margin over the
//! opposite side, and the number of strongly-agreeing indicators all clear
//! their thresholds. Weak or contradictory setups yield no signal at all.

use common::{Candle, Direction};

use crate::indicators::{adx, atr, bollinger, macd, rsi, stochastic, sma, ema, vwap_proxy};

/// Candles required for the full basket. Below this the scorer falls back
/// to the last-two-candle trend.
pub const MIN_LOOKBACK: usize = 26;

// Gating thresholds, strictest first.
const MIN_SCORE: i32 = 15;
const MIN_DIFF: i32 = 6;
const MIN_STRONG: usize = 5;

// RSI
const RSI_VERY_OVERSOLD: f64 = 25.0;
const RSI_OVERSOLD: f64 = 30.0;
const RSI_VERY_OVERBOUGHT: f64 = 75.0;
const RSI_OVERBOUGHT: f64 = 70.0;

// EMA / SMA separation, in percent.
const EMA_DIFF_VERY_STRONG: f64 = 0.15;
const EMA_DIFF_STRONG: f64 = 0.08;
const SMA_DIFF_EXTREME: f64 = 0.2;
const SMA_DIFF_VERY_STRONG: f64 = 0.15;

// MACD histogram magnitude.
const MACD_VERY_STRONG: f64 = 0.0005;
const MACD_STRONG: f64 = 0.0003;
const MACD_MODERATE: f64 = 0.0002;

// Stochastic levels.
const STOCH_EXTREME_LOW: f64 = 10.0;
const STOCH_VERY_LOW: f64 = 15.0;
const STOCH_EXTREME_HIGH: f64 = 90.0;
const STOCH_VERY_HIGH: f64 = 85.0;

// ADX trend strength.
const ADX_EXTREME: f64 = 40.0;
const ADX_VERY_STRONG: f64 = 35.0;
const ADX_MODERATE: f64 = 30.0;
const ADX_WEAK: f64 = 25.0;

// ATR as a percentage of price.
const ATR_PCT_EXTREME: f64 = 1.5;
const ATR_PCT_HIGH: f64 = 1.0;
const ATR_PCT_LOW: f64 = 0.2;
const ATR_PCT_DEAD: f64 = 0.15;

// One-candle momentum, in percent.
const MOMENTUM_EXTREME: f64 = 0.1;
const MOMENTUM_VERY_STRONG: f64 = 0.07;
const MOMENTUM_STRONG: f64 = 0.05;

// Bollinger band width, in percent.
const BB_WIDTH_HIGH: f64 = 0.3;
const BB_WIDTH_GOOD: f64 = 0.25;

// VWAP separation, in percent.
const VWAP_DIFF_VERY_SIGNIFICANT: f64 = 0.1;
const VWAP_DIFF_SIGNIFICANT: f64 = 0.07;

// Multi-candle trend, in percent.
const TREND_5_EXTREME: f64 = 0.15;
const TREND_3_VERY_STRONG: f64 = 0.1;
const TREND_3_STRONG: f64 = 0.15;

/// Raw per-side scores, exposed for tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Breakdown {
    pub call: i32,
    pub put: i32,
    pub strong_call: usize,
    pub strong_put: usize,
}

/// Score a candle window (oldest first). Pure, no side effects.
pub fn score(candles: &[Candle]) -> Option<Direction> {
    if candles.len() < MIN_LOOKBACK {
        return two_candle_trend(candles);
    }
    decide(&breakdown(candles))
}

/// Last-two-candle trend fallback for short histories.
fn two_candle_trend(candles: &[Candle]) -> Option<Direction> {
    let last = candles.last()?;
    let prev = candles.get(candles.len().checked_sub(2)?)?;
    if last.close > prev.close {
        Some(Direction::Call)
    } else if last.close < prev.close {
        Some(Direction::Put)
    } else {
        None
    }
}

fn decide(b: &Breakdown) -> Option<Direction> {
    let diff = (b.call - b.put).abs();
    if b.call > b.put {
        let ok = (b.call >= MIN_SCORE && diff >= MIN_DIFF && b.strong_call >= MIN_STRONG)
            || (b.call >= 12 && diff >= 5 && b.strong_call >= 4)
            || (b.call >= 10 && diff >= 4 && b.strong_call >= 3);
        ok.then_some(Direction::Call)
    } else if b.put > b.call {
        let ok = (b.put >= MIN_SCORE && diff >= MIN_DIFF && b.strong_put >= MIN_STRONG)
            || (b.put >= 12 && diff >= 5 && b.strong_put >= 4)
            || (b.put >= 10 && diff >= 4 && b.strong_put >= 3);
        ok.then_some(Direction::Put)
    } else {
        None // tie: wait for a better setup
    }
}

/// Apply a boost or dock to whichever side currently leads. Ties are left
/// alone and scores never go negative.
fn nudge_leader(b: &mut Breakdown, amount: i32) {
    if amount == 0 || b.call == b.put {
        return;
    }
    let side = if b.call > b.put { &mut b.call } else { &mut b.put };
    *side = (*side + amount).max(0);
}

/// Compute the full vote breakdown. Requires `MIN_LOOKBACK` candles.
pub fn breakdown(candles: &[Candle]) -> Breakdown {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let close = *closes.last().expect("non-empty window");
    let prev_close = closes[closes.len() - 2];

    let mut b = Breakdown::default();

    // RSI: only extreme levels vote.
    let rsi14 = rsi(&closes, 14).unwrap_or(50.0);
    if rsi14 < RSI_VERY_OVERSOLD {
        b.call += 5;
    } else if rsi14 < RSI_OVERSOLD {
        b.call += 3;
    } else if rsi14 > RSI_VERY_OVERBOUGHT {
        b.put += 5;
    } else if rsi14 > RSI_OVERBOUGHT {
        b.put += 3;
    }

    // EMA crossover with price-position confirmation.
    let ema_fast = ema(&closes, 9).unwrap_or(close);
    let ema_slow = ema(&closes, 21).unwrap_or(close);
    let ema_diff_pct = if ema_slow > 0.0 {
        ((ema_fast - ema_slow) / ema_slow * 100.0).abs()
    } else {
        0.0
    };
    if ema_fast > ema_slow && ema_diff_pct > EMA_DIFF_VERY_STRONG {
        b.call += 5;
        if close > ema_fast && close > ema_slow {
            b.call += 3;
        }
    } else if ema_fast > ema_slow && ema_diff_pct > EMA_DIFF_STRONG {
        b.call += 3;
        if close > ema_fast && close > ema_slow {
            b.call += 2;
        }
    } else if ema_fast < ema_slow && ema_diff_pct > EMA_DIFF_VERY_STRONG {
        b.put += 5;
        if close < ema_fast && close < ema_slow {
            b.put += 3;
        }
    } else if ema_fast < ema_slow && ema_diff_pct > EMA_DIFF_STRONG {
        b.put += 3;
        if close < ema_fast && close < ema_slow {
            b.put += 2;
        }
    }

    // SMA trend alignment.
    let sma_20 = sma(&closes, 20).unwrap_or(close);
    let sma_50 = sma(&closes, closes.len().min(50)).unwrap_or(close);
    let sma_diff_pct = if sma_50 > 0.0 {
        ((sma_20 - sma_50) / sma_50 * 100.0).abs()
    } else {
        0.0
    };
    if close > sma_20 && sma_20 > sma_50 && sma_diff_pct > SMA_DIFF_EXTREME {
        b.call += 5;
    } else if close > sma_20 && sma_20 > sma_50 && sma_diff_pct > SMA_DIFF_VERY_STRONG {
        b.call += 3;
    } else if close < sma_20 && sma_20 < sma_50 && sma_diff_pct > SMA_DIFF_EXTREME {
        b.put += 5;
    } else if close < sma_20 && sma_20 < sma_50 && sma_diff_pct > SMA_DIFF_VERY_STRONG {
        b.put += 3;
    }

    // MACD histogram.
    let hist = macd(&closes, 12, 26, 9).map(|m| m.histogram).unwrap_or(0.0);
    let strength = hist.abs();
    if hist > 0.0 && strength > MACD_VERY_STRONG {
        b.call += 5;
    } else if hist > 0.0 && strength > MACD_MODERATE {
        b.call += 3;
    } else if hist < 0.0 && strength > MACD_VERY_STRONG {
        b.put += 5;
    } else if hist < 0.0 && strength > MACD_MODERATE {
        b.put += 3;
    }

    // Stochastic: extreme levels only.
    let (stoch_k, stoch_d) = stochastic(candles, 14, 3).unwrap_or((50.0, 50.0));
    if stoch_k < STOCH_EXTREME_LOW && stoch_d < STOCH_EXTREME_LOW {
        b.call += 4;
    } else if stoch_k < STOCH_VERY_LOW && stoch_d < STOCH_VERY_LOW {
        b.call += 2;
    } else if stoch_k > STOCH_EXTREME_HIGH && stoch_d > STOCH_EXTREME_HIGH {
        b.put += 4;
    } else if stoch_k > STOCH_VERY_HIGH && stoch_d > STOCH_VERY_HIGH {
        b.put += 2;
    }

    // ADX: boost the leading side in a persistent trend, dock it in chop.
    let adx14 = adx(candles, 14).unwrap_or(25.0);
    let adx_nudge = if adx14 > ADX_EXTREME {
        4
    } else if adx14 > ADX_VERY_STRONG {
        3
    } else if adx14 < ADX_WEAK {
        -4
    } else if adx14 < ADX_MODERATE {
        -2
    } else {
        0
    };
    nudge_leader(&mut b, adx_nudge);

    // One-candle momentum.
    let momentum_pct = if prev_close > 0.0 {
        (close - prev_close) / prev_close * 100.0
    } else {
        0.0
    };
    if momentum_pct > MOMENTUM_EXTREME {
        b.call += 4;
    } else if momentum_pct > MOMENTUM_VERY_STRONG {
        b.call += 3;
    } else if momentum_pct > MOMENTUM_STRONG {
        b.call += 2;
    } else if momentum_pct < -MOMENTUM_EXTREME {
        b.put += 4;
    } else if momentum_pct < -MOMENTUM_VERY_STRONG {
        b.put += 3;
    } else if momentum_pct < -MOMENTUM_STRONG {
        b.put += 2;
    }

    // Bollinger breakout with enough band width to matter.
    let bands = bollinger(&closes, 20, 2.0);
    let (bb_low, bb_high, bb_width) = bands
        .map(|bb| (bb.lower, bb.upper, bb.width_pct()))
        .unwrap_or((close * 0.98, close * 1.02, 0.0));
    if close < bb_low && bb_width > BB_WIDTH_HIGH {
        b.call += 5;
    } else if close < bb_low && bb_width > BB_WIDTH_GOOD {
        b.call += 3;
    } else if close > bb_high && bb_width > BB_WIDTH_HIGH {
        b.put += 5;
    } else if close > bb_high && bb_width > BB_WIDTH_GOOD {
        b.put += 3;
    }

    // VWAP separation.
    let vwap = vwap_proxy(candles, 20).unwrap_or(close);
    let vwap_diff_pct = if vwap > 0.0 {
        ((close - vwap) / vwap * 100.0).abs()
    } else {
        0.0
    };
    if close > vwap && vwap_diff_pct > VWAP_DIFF_VERY_SIGNIFICANT {
        b.call += 4;
    } else if close > vwap && vwap_diff_pct > VWAP_DIFF_SIGNIFICANT {
        b.call += 2;
    } else if close < vwap && vwap_diff_pct > VWAP_DIFF_VERY_SIGNIFICANT {
        b.put += 4;
    } else if close < vwap && vwap_diff_pct > VWAP_DIFF_SIGNIFICANT {
        b.put += 2;
    }

    // ATR: dock the leading side when the market is too wild or too dead
    // to call a one-minute move.
    let atr_pct = match atr(candles, 14) {
        Some(a) if close > 0.0 => a / close * 100.0,
        _ => 0.0,
    };
    let atr_dock = if atr_pct > ATR_PCT_EXTREME {
        -5
    } else if atr_pct > ATR_PCT_HIGH {
        -3
    } else if atr_pct < ATR_PCT_DEAD {
        -3
    } else if atr_pct < ATR_PCT_LOW {
        -1
    } else {
        0
    };
    nudge_leader(&mut b, atr_dock);

    // Multi-candle trend confirmation.
    let price_change = close - prev_close;
    let close_3_ago = closes[closes.len() - 3];
    let close_5_ago = closes[closes.len() - 5];
    let trend_3 = close - close_3_ago;
    let trend_5 = close - close_5_ago;
    let trend_3_pct = if close_3_ago > 0.0 { trend_3 / close_3_ago * 100.0 } else { 0.0 };
    let trend_5_pct = if close_5_ago > 0.0 { trend_5 / close_5_ago * 100.0 } else { 0.0 };

    if trend_5 > 0.0
        && trend_3 > 0.0
        && price_change > 0.0
        && trend_5_pct > TREND_5_EXTREME
        && trend_3_pct > TREND_3_VERY_STRONG
    {
        b.call += 4;
    } else if trend_5 < 0.0
        && trend_3 < 0.0
        && price_change < 0.0
        && trend_5_pct < -TREND_5_EXTREME
        && trend_3_pct < -TREND_3_VERY_STRONG
    {
        b.put += 4;
    } else if trend_3 > 0.0 && price_change > 0.0 && trend_3_pct > TREND_3_STRONG {
        b.call += 3;
    } else if trend_3 < 0.0 && price_change < 0.0 && trend_3_pct < -TREND_3_STRONG {
        b.put += 3;
    } else if trend_3 > 0.0 && price_change > 0.0 && trend_3_pct > TREND_3_VERY_STRONG {
        b.call += 2;
    } else if trend_3 < 0.0 && price_change < 0.0 && trend_3_pct < -TREND_3_VERY_STRONG {
        b.put += 2;
    }

    // Strongly-agreeing indicator counts for the gate.
    b.strong_call = [
        rsi14 < RSI_VERY_OVERSOLD,
        ema_fast > ema_slow && ema_diff_pct > 0.1,
        close > sma_20 && sma_20 > sma_50 && sma_diff_pct > SMA_DIFF_VERY_STRONG,
        hist > 0.0 && strength > MACD_STRONG,
        stoch_k < STOCH_VERY_LOW,
        adx14 > ADX_VERY_STRONG,
        momentum_pct > MOMENTUM_VERY_STRONG,
        close < bb_low && bb_width > BB_WIDTH_GOOD,
        close > vwap && vwap_diff_pct > VWAP_DIFF_SIGNIFICANT,
    ]
    .iter()
    .filter(|&&x| x)
    .count();

    b.strong_put = [
        rsi14 > RSI_VERY_OVERBOUGHT,
        ema_fast < ema_slow && ema_diff_pct > 0.1,
        close < sma_20 && sma_20 < sma_50 && sma_diff_pct > SMA_DIFF_VERY_STRONG,
        hist < 0.0 && strength > MACD_STRONG,
        stoch_k > STOCH_VERY_HIGH,
        adx14 > ADX_VERY_STRONG,
        momentum_pct < -MOMENTUM_VERY_STRONG,
        close > bb_high && bb_width > BB_WIDTH_GOOD,
        close < vwap && vwap_diff_pct > VWAP_DIFF_SIGNIFICANT,
    ]
    .iter()
    .filter(|&&x| x)
    .count();

    b
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

    fn series(closes: impl IntoIterator<Item = f64>) -> Vec<Candle> {
        closes.into_iter().map(candle).collect()
    }

    #[test]
    fn short_history_falls_back_to_two_candle_trend() {
        let rising = series([1.0, 1.1, 1.2, 1.3, 1.4]);
        assert_eq!(score(&rising), Some(Direction::Call));

        let falling = series([1.4, 1.3, 1.2, 1.1, 1.0]);
        assert_eq!(score(&falling), Some(Direction::Put));
    }

    #[test]
    fn single_candle_yields_nothing() {
        assert_eq!(score(&series([1.0])), None);
        assert_eq!(score(&[]), None);
    }

    #[test]
    fn flat_market_yields_no_signal() {
        let flat = series(std::iter::repeat(1.2).take(60));
        assert_eq!(score(&flat), None);
    }

    #[test]
    fn steep_uptrend_scores_call() {
        // 0.5%/candle compounding rise: strong momentum, aligned EMAs/SMAs,
        // bullish MACD, price over VWAP and a consistent 3/5-candle trend.
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * 1.005f64.powi(i)).collect();
        let candles = series(closes);
        let b = breakdown(&candles);
        assert!(b.call > b.put, "breakdown: {b:?}");
        assert!(b.strong_call >= MIN_STRONG, "breakdown: {b:?}");
        assert!(b.strong_call >= 6, "trend strength should agree: {b:?}");
        assert_eq!(score(&candles), Some(Direction::Call));
    }

    #[test]
    fn nudges_hit_only_the_leader() {
        let mut b = Breakdown { call: 10, put: 4, ..Default::default() };
        nudge_leader(&mut b, 3);
        assert_eq!((b.call, b.put), (13, 4));
        nudge_leader(&mut b, -4);
        assert_eq!((b.call, b.put), (9, 4));

        let mut tied = Breakdown { call: 5, put: 5, ..Default::default() };
        nudge_leader(&mut tied, 4);
        assert_eq!((tied.call, tied.put), (5, 5));

        let mut low = Breakdown { call: 2, put: 1, ..Default::default() };
        nudge_leader(&mut low, -5);
        assert_eq!((low.call, low.put), (0, 1));
    }

    #[test]
    fn steep_downtrend_scores_put() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 * 0.995f64.powi(i)).collect();
        let candles = series(closes);
        assert_eq!(score(&candles), Some(Direction::Put));
    }

    #[test]
    fn choppy_market_is_gated_out() {
        // Alternating small moves: indicators disagree, no side clears the
        // minimum score.
        let closes: Vec<f64> = (0..60)
            .map(|i| 1.1 + if i % 2 == 0 { 0.0001 } else { -0.0001 })
            .collect();
        assert_eq!(score(&series(closes)), None);
    }
}
