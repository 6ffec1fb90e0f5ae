pub mod client;
pub mod wire;

pub use client::{FeedClient, FeedHandle};

/// Binary.com market symbol for a forex pair: "EURUSD" → "frxEURUSD".
pub fn market_symbol(pair: &str) -> String {
    format!("frx{pair}")
}
