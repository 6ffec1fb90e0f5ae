use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{Config, PriceFeed};
use signals::{plan_batch, NewsFilter, ScheduleParams, PAIRS};
use tracker::SignalTracker;

use crate::format;

/// Candle history fetched per pair when generating a batch.
const LOOKBACK_CANDLES: usize = 50;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "show the menu.")]
    Start,
    #[command(description = "generate a fresh signal batch.")]
    Signal,
    #[command(description = "show results for your latest batch.")]
    Results,
}

/// Shared handler state, cloned into every dptree endpoint.
#[derive(Clone)]
pub struct BotDeps {
    pub tracker: Arc<SignalTracker>,
    pub feed: Arc<dyn PriceFeed>,
    pub config: Arc<Config>,
    /// Most recent batch per chat, for /results.
    pub last_batch: Arc<RwLock<HashMap<ChatId, String>>>,
}

impl BotDeps {
    fn authorized(&self, user_id: i64) -> bool {
        self.config.telegram_allowed_user_ids.is_empty()
            || self.config.telegram_allowed_user_ids.contains(&user_id)
    }
}

/// Run the dispatcher until shutdown. Blocks the calling task.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    info!("telegram dispatcher starting");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    deps: BotDeps,
) -> ResponseResult<()> {
    let Some(user) = msg.from() else { return Ok(()) };
    let user_id = user.id.0 as i64;
    if !deps.authorized(user_id) {
        debug!(user_id, "unauthorized command ignored");
        return Ok(());
    }

    match cmd {
        Command::Start => {
            let keyboard = InlineKeyboardMarkup::new([[
                InlineKeyboardButton::callback("🚀 Generate signals", "generate_signal"),
                InlineKeyboardButton::callback("📊 Session results", "show_results"),
            ]]);
            bot.send_message(
                msg.chat.id,
                "Welcome! Generate a batch of M1 signals, then watch results \
                 come in as each one is verified.",
            )
            .reply_markup(keyboard)
            .await?;
        }
        Command::Signal => generate_batch(&bot, msg.chat.id, user_id, &deps).await?,
        Command::Results => show_results(&bot, msg.chat.id, &deps).await?,
    }
    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, deps: BotDeps) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;
    let user_id = q.from.id.0 as i64;
    if !deps.authorized(user_id) {
        debug!(user_id, "unauthorized callback ignored");
        return Ok(());
    }
    let Some(message) = q.message else { return Ok(()) };
    let chat_id = message.chat.id;

    match q.data.as_deref() {
        Some("generate_signal") => generate_batch(&bot, chat_id, user_id, &deps).await?,
        Some("show_results") => show_results(&bot, chat_id, &deps).await?,
        other => debug!(?other, "unknown callback data"),
    }
    Ok(())
}

async fn generate_batch(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    deps: &BotDeps,
) -> ResponseResult<()> {
    bot.send_message(chat_id, "⏳ Scanning the market…").await?;

    let fetches = PAIRS.map(|pair| {
        let feed = Arc::clone(&deps.feed);
        async move { (pair, feed.recent_candles(pair, LOOKBACK_CANDLES).await) }
    });
    let mut data = HashMap::new();
    for (pair, result) in join_all(fetches).await {
        match result {
            Ok(candles) => {
                data.insert(pair.to_string(), candles);
            }
            Err(err) => warn!(pair, %err, "candle fetch failed, pair skipped"),
        }
    }

    let params = ScheduleParams {
        target: deps.config.target_signals,
        interval_minutes: deps.config.signal_interval_minutes,
        broker_utc_offset_hours: deps.config.broker_utc_offset_hours,
    };
    let news = NewsFilter::new(deps.config.broker_utc_offset_hours);
    let planned = plan_batch(&data, Utc::now(), &params, &news);
    if planned.is_empty() {
        bot.send_message(
            chat_id,
            "No tradeable setups right now. Try again in a few minutes.",
        )
        .await?;
        return Ok(());
    }

    let sheet = format::signal_sheet(&planned, deps.config.broker_utc_offset_hours);

    // Capture the reference price at issue time; a down feed leaves it for
    // the tracker to backfill at expiry.
    let mut specs = Vec::with_capacity(planned.len());
    for p in planned {
        let entry = match deps.feed.latest_price(&p.pair).await {
            Ok(price) => Some(price),
            Err(err) => {
                warn!(pair = %p.pair, %err, "entry price unavailable at issue");
                None
            }
        };
        specs.push(p.into_spec(entry));
    }

    if let Some(batch) = deps
        .tracker
        .add_batch(specs, Some(user_id), Some(chat_id.0))
        .await
    {
        info!(batch = %batch.id, chat = chat_id.0, signals = batch.signal_ids.len(), "batch issued");
        deps.last_batch.write().await.insert(chat_id, batch.id);
        bot.send_message(chat_id, sheet).await?;
    }
    Ok(())
}

async fn show_results(bot: &Bot, chat_id: ChatId, deps: &BotDeps) -> ResponseResult<()> {
    let batch_id = deps.last_batch.read().await.get(&chat_id).cloned();
    let Some(batch_id) = batch_id else {
        bot.send_message(chat_id, "No batch generated yet. Use /signal first.")
            .await?;
        return Ok(());
    };

    // Catch up on anything due before reporting.
    deps.tracker.resolve_expired(Utc::now()).await;

    match (
        deps.tracker.batch(&batch_id).await,
        deps.tracker.statistics_for(&batch_id).await,
    ) {
        (Some(batch), Some(stats)) => {
            let results = deps.tracker.batch_results(&batch_id).await;
            bot.send_message(chat_id, format::results_report(&results, &batch, &stats))
                .await?;
        }
        _ => {
            bot.send_message(chat_id, "That batch has already been cleaned up.")
                .await?;
        }
    }
    Ok(())
}
