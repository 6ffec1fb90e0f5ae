use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use teloxide::prelude::*;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use tracker::SignalTracker;

use crate::format;

/// Poll cadence and retention, normally taken from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    /// Resolved signals older than this are dropped from memory and the
    /// store.
    pub cleanup_after: chrono::Duration,
    pub cleanup_every: Duration,
}

impl PollerConfig {
    pub fn new(poll_interval_secs: u64, cleanup_after_hours: i64) -> Self {
        Self {
            poll_interval: Duration::from_secs(poll_interval_secs),
            cleanup_after: chrono::Duration::hours(cleanup_after_hours),
            cleanup_every: Duration::from_secs(3600),
        }
    }
}

/// Background loop: verify expired signals, push each result as it lands,
/// push one summary per completed batch, and periodically clear old state.
/// Runs until the process shuts down.
pub async fn run_poller(bot: Bot, tracker: Arc<SignalTracker>, cfg: PollerConfig) {
    let mut ticker = tokio::time::interval(cfg.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_cleanup = Instant::now();

    loop {
        ticker.tick().await;

        let resolved = tracker.resolve_expired(Utc::now()).await;
        for signal in &resolved {
            let Some(chat_id) = signal.chat_id else {
                debug!(signal = %signal.id, "resolved signal has no chat, not pushed");
                continue;
            };
            if let Err(err) = bot
                .send_message(ChatId(chat_id), format::result_line(signal))
                .await
            {
                warn!(signal = %signal.id, %err, "failed to push result");
            }
        }

        for (batch, stats) in tracker.batches_newly_completed().await {
            let Some(chat_id) = batch.chat_id else { continue };
            if let Err(err) = bot
                .send_message(ChatId(chat_id), format::batch_summary(&batch, &stats))
                .await
            {
                warn!(batch = %batch.id, %err, "failed to push batch summary");
            }
        }

        if last_cleanup.elapsed() >= cfg.cleanup_every {
            last_cleanup = Instant::now();
            // The tracker cascades the cutoff to the store itself.
            tracker.clear_older_than(Utc::now() - cfg.cleanup_after).await;
        }
    }
}
