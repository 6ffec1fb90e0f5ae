use std::time::Duration;

use common::{Direction, PriceFeed};
use tracing::{debug, warn};

/// Delays between a signal's scheduled expiry and the verification fetches.
/// Tests shrink both to zero.
#[derive(Debug, Clone, Copy)]
pub struct VerifyConfig {
    /// Wait after expiry before the first fetch, letting the closing quote
    /// settle at the feed.
    pub settle_delay: Duration,
    /// Wait between the first and second fetch; spans the next full
    /// one-minute candle.
    pub confirm_delay: Duration,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            confirm_delay: Duration::from_secs(65),
        }
    }
}

/// Result of verifying one expired signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// `confirmed` is true when the win came from the second-stage candle
    /// rather than the price at expiry.
    Win { confirmed: bool },
    Loss,
    /// The first fetch failed; the signal stays pending and is retried on
    /// the next poll.
    Unknown,
}

/// Two-stage price verification.
///
/// Stage one compares the price at expiry against the entry price; a move
/// in the predicted direction is a direct win. Otherwise stage two waits
/// out one more candle and compares against the stage-one price: continued
/// movement in the predicted direction is a confirmed win, anything else a
/// loss. A failed second fetch also scores a loss; by then the position
/// has already gone one candle without paying out.
pub async fn verify(
    feed: &dyn PriceFeed,
    pair: &str,
    direction: Direction,
    entry: f64,
    cfg: VerifyConfig,
) -> Verdict {
    tokio::time::sleep(cfg.settle_delay).await;
    let first = match feed.latest_price(pair).await {
        Ok(p) => p,
        Err(err) => {
            warn!(pair, %err, "verification fetch failed, will retry");
            return Verdict::Unknown;
        }
    };

    let direct_win = match direction {
        Direction::Call => first > entry,
        Direction::Put => first < entry,
    };
    if direct_win {
        debug!(pair, entry, first, "direct win");
        return Verdict::Win { confirmed: false };
    }

    tokio::time::sleep(cfg.confirm_delay).await;
    let second = match feed.latest_price(pair).await {
        Ok(p) => p,
        Err(err) => {
            warn!(pair, %err, "confirmation fetch failed, scoring loss");
            return Verdict::Loss;
        }
    };

    let confirmed_win = match direction {
        Direction::Call => second > first,
        Direction::Put => second < first,
    };
    if confirmed_win {
        debug!(pair, first, second, "confirmed win");
        Verdict::Win { confirmed: true }
    } else {
        debug!(pair, entry, first, second, "loss");
        Verdict::Loss
    }
}
