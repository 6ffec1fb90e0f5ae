use async_trait::async_trait;

use crate::{Candle, Result};

/// Abstraction over the market-data source.
///
/// `FeedHandle` in `crates/feed` implements this against the live
/// Binary.com WebSocket; tests implement it with scripted prices.
///
/// Implementations must tolerate concurrent calls; the tracker verifies
/// several expiring signals at once against a single shared feed.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Latest quote for a pair (e.g. "EURUSD").
    async fn latest_price(&self, pair: &str) -> Result<f64>;

    /// Last `count` one-minute candles for a pair, oldest first.
    async fn recent_candles(&self, pair: &str, count: usize) -> Result<Vec<Candle>>;
}
