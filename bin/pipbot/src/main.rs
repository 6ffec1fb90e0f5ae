//! Process entry point: wire the feed, tracker, store and Telegram surface
//! together and run until shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use teloxide::Bot;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::{Config, NoopStore, PriceFeed, SignalStore};
use feed::FeedClient;
use store::SqliteStore;
use telegram_push::{run_poller, start_bot, BotDeps, PollerConfig};
use tracker::SignalTracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env());
    info!(feed = %config.feed_ws_url, "starting pipbot");

    let store: Arc<dyn SignalStore> = match &config.database_url {
        Some(url) => Arc::new(SqliteStore::connect(url).await?),
        None => {
            info!("no DATABASE_URL, running without persistence");
            Arc::new(NoopStore)
        }
    };

    let (client, handle) = FeedClient::new(config.feed_ws_url.clone());
    tokio::spawn(client.run());
    let feed: Arc<dyn PriceFeed> = Arc::new(handle);

    let tracker = Arc::new(SignalTracker::new(Arc::clone(&feed), Arc::clone(&store)));

    let bot = Bot::new(config.telegram_token.clone());
    tokio::spawn(run_poller(
        bot.clone(),
        Arc::clone(&tracker),
        PollerConfig::new(config.poll_interval_secs, config.cleanup_after_hours),
    ));

    let deps = BotDeps {
        tracker,
        feed,
        config,
        last_batch: Arc::new(RwLock::new(HashMap::new())),
    };
    start_bot(bot, deps).await;
    Ok(())
}
