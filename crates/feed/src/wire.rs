//! Binary.com WebSocket message parsing.
//!
//! Responses carry the original request back under `echo_req`, which is how
//! candle replies are matched to the symbol that asked for them.

use serde::Deserialize;

use common::{Candle, Result};

/// A parsed inbound message we care about. Everything else is skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Candle history reply for a symbol, oldest first.
    Candles { symbol: String, candles: Vec<Candle> },
    /// A live tick quote for a symbol.
    Tick { symbol: String, quote: f64, epoch: i64 },
    /// Server-side error; `symbol` set when the echo identifies one.
    ServerError { symbol: Option<String>, code: String, message: String },
}

#[derive(Deserialize)]
struct CandleRow {
    epoch: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

#[derive(Deserialize)]
struct TickRow {
    symbol: String,
    quote: f64,
    #[serde(default)]
    epoch: i64,
}

#[derive(Deserialize)]
struct ErrorRow {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Parse one raw text frame. `Ok(None)` means "valid JSON we don't handle"
/// (subscription acks, pings and so on).
pub fn parse_message(text: &str) -> Result<Option<FeedMessage>> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    let echo_symbol = value
        .get("echo_req")
        .and_then(|e| e.get("ticks_history").or_else(|| e.get("ticks")))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    if let Some(err) = value.get("error") {
        let row: ErrorRow = serde_json::from_value(err.clone())?;
        return Ok(Some(FeedMessage::ServerError {
            symbol: echo_symbol,
            code: row.code,
            message: row.message,
        }));
    }

    if let Some(candles) = value.get("candles") {
        let Some(symbol) = echo_symbol else {
            return Ok(None); // candle reply without a symbol echo, skip
        };
        let rows: Vec<CandleRow> = serde_json::from_value(candles.clone())?;
        let candles = rows
            .into_iter()
            .filter(|r| r.epoch > 0 && r.close > 0.0)
            .map(|r| Candle {
                epoch: r.epoch,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
            })
            .collect();
        return Ok(Some(FeedMessage::Candles { symbol, candles }));
    }

    if let Some(tick) = value.get("tick") {
        let row: TickRow = serde_json::from_value(tick.clone())?;
        if row.quote > 0.0 {
            return Ok(Some(FeedMessage::Tick {
                symbol: row.symbol,
                quote: row.quote,
                epoch: row.epoch,
            }));
        }
        return Ok(None);
    }

    Ok(None)
}

/// Candle-history request: last `count` one-minute candles.
pub fn candles_request(symbol: &str, count: usize) -> String {
    serde_json::json!({
        "ticks_history": symbol,
        "end": "latest",
        "count": count,
        "granularity": 60,
        "style": "candles",
    })
    .to_string()
}

/// Live tick subscription request.
pub fn ticks_request(symbol: &str) -> String {
    serde_json::json!({ "ticks": symbol }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_candle_reply_with_echo_symbol() {
        let raw = r#"{
            "echo_req": {"ticks_history": "frxEURUSD", "style": "candles"},
            "candles": [
                {"epoch": 1700000000, "open": 1.1, "high": 1.2, "low": 1.0, "close": 1.15},
                {"epoch": 1700000060, "open": 1.15, "high": 1.2, "low": 1.1, "close": 1.18}
            ]
        }"#;
        match parse_message(raw).unwrap().unwrap() {
            FeedMessage::Candles { symbol, candles } => {
                assert_eq!(symbol, "frxEURUSD");
                assert_eq!(candles.len(), 2);
                assert_eq!(candles[1].close, 1.18);
            }
            other => panic!("expected candles, got {other:?}"),
        }
    }

    #[test]
    fn skips_zeroed_candles() {
        let raw = r#"{
            "echo_req": {"ticks_history": "frxGBPUSD"},
            "candles": [{"epoch": 0, "open": 0.0, "high": 0.0, "low": 0.0, "close": 0.0}]
        }"#;
        match parse_message(raw).unwrap().unwrap() {
            FeedMessage::Candles { candles, .. } => assert!(candles.is_empty()),
            other => panic!("expected candles, got {other:?}"),
        }
    }

    #[test]
    fn parses_tick() {
        let raw = r#"{"tick": {"symbol": "frxUSDJPY", "quote": 151.25, "epoch": 1700000000}}"#;
        match parse_message(raw).unwrap().unwrap() {
            FeedMessage::Tick { symbol, quote, .. } => {
                assert_eq!(symbol, "frxUSDJPY");
                assert_eq!(quote, 151.25);
            }
            other => panic!("expected tick, got {other:?}"),
        }
    }

    #[test]
    fn parses_server_error_with_symbol() {
        let raw = r#"{
            "echo_req": {"ticks_history": "frxEURUSD"},
            "error": {"code": "MarketIsClosed", "message": "This market is closed."}
        }"#;
        match parse_message(raw).unwrap().unwrap() {
            FeedMessage::ServerError { symbol, code, .. } => {
                assert_eq!(symbol.as_deref(), Some("frxEURUSD"));
                assert_eq!(code, "MarketIsClosed");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn ignores_unrelated_messages() {
        assert_eq!(parse_message(r#"{"ping": "pong"}"#).unwrap(), None);
    }
}
