use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use common::{Candle, Error, PriceFeed, Result};

use crate::market_symbol;
use crate::wire::{self, FeedMessage};

/// How long a candle reply stays fresh enough to answer price lookups
/// without touching the wire.
const CACHE_TTL: Duration = Duration::from_secs(30);

/// How long a caller waits for an answer before the fetch counts as failed.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_BACKOFF: Duration = Duration::from_secs(60);

enum FeedRequest {
    LatestPrice {
        symbol: String,
        reply: oneshot::Sender<Result<f64>>,
    },
    Candles {
        symbol: String,
        count: usize,
        reply: oneshot::Sender<Result<Vec<Candle>>>,
    },
}

/// Cloneable handle to the feed task. Implements `PriceFeed`, so the
/// tracker's verification tasks and the Telegram handlers can all share it.
#[derive(Clone)]
pub struct FeedHandle {
    request_tx: mpsc::Sender<FeedRequest>,
}

impl FeedHandle {
    async fn request_price(&self, symbol: String) -> Result<f64> {
        let (tx, rx) = oneshot::channel();
        self.request_tx
            .send(FeedRequest::LatestPrice { symbol, reply: tx })
            .await
            .map_err(|_| Error::FeedUnavailable("feed task stopped".into()))?;

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::FeedUnavailable("feed request dropped".into())),
            Err(_) => Err(Error::FeedUnavailable("price request timed out".into())),
        }
    }

    async fn request_candles(&self, symbol: String, count: usize) -> Result<Vec<Candle>> {
        let (tx, rx) = oneshot::channel();
        self.request_tx
            .send(FeedRequest::Candles {
                symbol,
                count,
                reply: tx,
            })
            .await
            .map_err(|_| Error::FeedUnavailable("feed task stopped".into()))?;

        match tokio::time::timeout(REQUEST_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::FeedUnavailable("feed request dropped".into())),
            Err(_) => Err(Error::FeedUnavailable("candle request timed out".into())),
        }
    }
}

#[async_trait]
impl PriceFeed for FeedHandle {
    async fn latest_price(&self, pair: &str) -> Result<f64> {
        self.request_price(market_symbol(pair)).await
    }

    async fn recent_candles(&self, pair: &str, count: usize) -> Result<Vec<Candle>> {
        self.request_candles(market_symbol(pair), count).await
    }
}

// ─── Feed task ────────────────────────────────────────────────────────────────

/// Owns the Binary.com WebSocket connection. Single-owner task: all feed
/// state (candle cache, tick quotes, in-flight requests) lives here, so
/// callers never observe a partially updated candle list.
///
/// Reconnects automatically with exponential backoff.
pub struct FeedClient {
    ws_url: String,
    request_rx: mpsc::Receiver<FeedRequest>,
    candle_cache: HashMap<String, (Vec<Candle>, Instant)>,
    tick_prices: HashMap<String, f64>,
    pending_prices: HashMap<String, Vec<oneshot::Sender<Result<f64>>>>,
    pending_candles: HashMap<String, Vec<(usize, oneshot::Sender<Result<Vec<Candle>>>)>>,
    /// Symbols with a live tick subscription on the current connection.
    subscribed: HashSet<String>,
}

impl FeedClient {
    pub fn new(ws_url: impl Into<String>) -> (Self, FeedHandle) {
        let (request_tx, request_rx) = mpsc::channel(64);
        let client = FeedClient {
            ws_url: ws_url.into(),
            request_rx,
            candle_cache: HashMap::new(),
            tick_prices: HashMap::new(),
            pending_prices: HashMap::new(),
            pending_candles: HashMap::new(),
            subscribed: HashSet::new(),
        };
        (client, FeedHandle { request_tx })
    }

    /// Run the feed loop forever, reconnecting on failure.
    /// Call this inside a `tokio::spawn`.
    pub async fn run(mut self) {
        let mut backoff = Duration::from_secs(1);

        loop {
            info!(url = %self.ws_url, "Connecting to price feed");
            match self.connect_once().await {
                Ok(()) => {
                    info!("Price feed connection closed cleanly");
                    backoff = Duration::from_secs(1);
                }
                Err(e) => {
                    warn!(error = %e, backoff = ?backoff, "Price feed error, reconnecting");
                }
            }
            self.fail_pending("feed disconnected");

            // Answer queued requests from cache while we wait to reconnect.
            let deadline = Instant::now() + backoff;
            while Instant::now() < deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match tokio::time::timeout(remaining, self.request_rx.recv()).await {
                    Ok(Some(req)) => self.answer_offline(req),
                    Ok(None) => {
                        warn!("Feed request channel closed, shutting down");
                        return;
                    }
                    Err(_) => break,
                }
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    async fn connect_once(&mut self) -> Result<()> {
        let url = Url::parse(&self.ws_url).map_err(|e| Error::WebSocket(e.to_string()))?;
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();
        self.subscribed.clear();
        info!("Price feed connected");

        loop {
            tokio::select! {
                req = self.request_rx.recv() => {
                    match req {
                        Some(FeedRequest::LatestPrice { symbol, reply }) => {
                            if let Some(price) = self.cached_price(&symbol) {
                                let _ = reply.send(Ok(price));
                                continue;
                            }
                            if !self.subscribed.contains(&symbol) {
                                write
                                    .send(Message::Text(wire::ticks_request(&symbol)))
                                    .await
                                    .map_err(|e| Error::WebSocket(e.to_string()))?;
                                self.subscribed.insert(symbol.clone());
                            } else if let Some(&quote) = self.tick_prices.get(&symbol) {
                                let _ = reply.send(Ok(quote));
                                continue;
                            }
                            self.pending_prices.entry(symbol).or_default().push(reply);
                        }
                        Some(FeedRequest::Candles { symbol, count, reply }) => {
                            write
                                .send(Message::Text(wire::candles_request(&symbol, count)))
                                .await
                                .map_err(|e| Error::WebSocket(e.to_string()))?;
                            self.pending_candles
                                .entry(symbol)
                                .or_default()
                                .push((count, reply));
                        }
                        None => {
                            warn!("Feed request channel closed, shutting down");
                            return Ok(());
                        }
                    }
                }

                msg = read.next() => {
                    let msg = match msg {
                        Some(Ok(m)) => m,
                        Some(Err(e)) => return Err(Error::WebSocket(e.to_string())),
                        None => return Ok(()),
                    };
                    if let Message::Text(text) = msg {
                        match wire::parse_message(&text) {
                            Ok(Some(parsed)) => self.apply_message(parsed),
                            Ok(None) => {}
                            Err(e) => warn!(error = %e, "Failed to parse feed message"),
                        }
                    }
                }
            }
        }
    }

    fn apply_message(&mut self, msg: FeedMessage) {
        match msg {
            FeedMessage::Candles { symbol, candles } => {
                debug!(symbol = %symbol, count = candles.len(), "Candle reply");
                if !candles.is_empty() {
                    self.candle_cache
                        .insert(symbol.clone(), (candles.clone(), Instant::now()));
                }
                for (count, reply) in self.pending_candles.remove(&symbol).unwrap_or_default() {
                    if candles.is_empty() {
                        let _ = reply.send(Err(Error::FeedUnavailable(format!(
                            "no candles for {symbol}"
                        ))));
                    } else {
                        let start = candles.len().saturating_sub(count);
                        let _ = reply.send(Ok(candles[start..].to_vec()));
                    }
                }
            }
            FeedMessage::Tick { symbol, quote, .. } => {
                self.tick_prices.insert(symbol.clone(), quote);
                for reply in self.pending_prices.remove(&symbol).unwrap_or_default() {
                    let _ = reply.send(Ok(quote));
                }
            }
            FeedMessage::ServerError { symbol, code, message } => {
                warn!(symbol = ?symbol, code = %code, message = %message, "Feed server error");
                if let Some(symbol) = symbol {
                    let reason = format!("{code}: {message}");
                    for reply in self.pending_prices.remove(&symbol).unwrap_or_default() {
                        let _ = reply.send(Err(Error::FeedUnavailable(reason.clone())));
                    }
                    for (_, reply) in self.pending_candles.remove(&symbol).unwrap_or_default() {
                        let _ = reply.send(Err(Error::FeedUnavailable(reason.clone())));
                    }
                    self.subscribed.remove(&symbol);
                }
            }
        }
    }

    /// Latest close from a fresh candle reply, if we have one.
    fn cached_price(&self, symbol: &str) -> Option<f64> {
        let (candles, fetched_at) = self.candle_cache.get(symbol)?;
        if fetched_at.elapsed() > CACHE_TTL {
            return None;
        }
        candles.last().map(|c| c.close).filter(|&p| p > 0.0)
    }

    /// Serve a request while disconnected: cache hit or an immediate failure,
    /// never a silent hang.
    fn answer_offline(&mut self, req: FeedRequest) {
        match req {
            FeedRequest::LatestPrice { symbol, reply } => {
                let _ = match self.cached_price(&symbol) {
                    Some(price) => reply.send(Ok(price)),
                    None => reply.send(Err(Error::FeedUnavailable("feed disconnected".into()))),
                };
            }
            FeedRequest::Candles { symbol, count, reply } => {
                let _ = match self.candle_cache.get(&symbol) {
                    Some((candles, at)) if at.elapsed() <= CACHE_TTL => {
                        let start = candles.len().saturating_sub(count);
                        reply.send(Ok(candles[start..].to_vec()))
                    }
                    _ => reply.send(Err(Error::FeedUnavailable("feed disconnected".into()))),
                };
            }
        }
    }

    fn fail_pending(&mut self, reason: &str) {
        for (_, replies) in self.pending_prices.drain() {
            for reply in replies {
                let _ = reply.send(Err(Error::FeedUnavailable(reason.into())));
            }
        }
        for (_, replies) in self.pending_candles.drain() {
            for (_, reply) in replies {
                let _ = reply.send(Err(Error::FeedUnavailable(reason.into())));
            }
        }
    }
}
