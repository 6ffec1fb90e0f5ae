use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use tokio::sync::RwLock;
use tracing::{info, warn};

use common::{
    Batch, BatchStats, Direction, MartingaleState, Outcome, PriceFeed, Signal, SignalSpec,
    SignalState, SignalStore,
};

use crate::martingale;
use crate::verify::{verify, Verdict, VerifyConfig};

/// Grace period after the scheduled minute before a signal counts as
/// expired and becomes verifiable.
const EXPIRY_OFFSET_SECS: i64 = 60;

#[derive(Default)]
struct TrackerState {
    /// Pending signals by id.
    active: HashMap<String, Signal>,
    /// Resolved signals, oldest first.
    completed: Vec<Signal>,
    batches: HashMap<String, Batch>,
    /// Per-pair martingale sequences.
    martingale: HashMap<String, MartingaleState>,
    /// Ids currently being verified; guards against overlapping polls
    /// resolving the same signal twice.
    in_flight: HashSet<String>,
}

/// Owns the full signal lifecycle: pending signals, verification against
/// the feed, martingale accounting and batch aggregation.
///
/// In-memory state is authoritative; the store is a best-effort mirror.
/// All methods take `&self`; the tracker is shared behind an `Arc` between
/// the Telegram handlers and the polling loop.
pub struct SignalTracker {
    state: RwLock<TrackerState>,
    feed: Arc<dyn PriceFeed>,
    store: Arc<dyn SignalStore>,
    verify_cfg: VerifyConfig,
}

impl SignalTracker {
    pub fn new(feed: Arc<dyn PriceFeed>, store: Arc<dyn SignalStore>) -> Self {
        Self::with_verify_config(feed, store, VerifyConfig::default())
    }

    pub fn with_verify_config(
        feed: Arc<dyn PriceFeed>,
        store: Arc<dyn SignalStore>,
        verify_cfg: VerifyConfig,
    ) -> Self {
        Self {
            state: RwLock::new(TrackerState::default()),
            feed,
            store,
            verify_cfg,
        }
    }

    /// Register a new pending signal, appending it to the named batch and
    /// creating the batch record if this is its first member. Persistence
    /// is best-effort: a store failure is logged and the in-memory state
    /// stands.
    pub async fn add(
        &self,
        spec: SignalSpec,
        batch_id: Option<String>,
        user_id: Option<i64>,
        chat_id: Option<i64>,
    ) -> Signal {
        let created_at = Utc::now();
        let signal = Signal::from_spec(spec, batch_id.clone(), user_id, chat_id, created_at);
        {
            let mut state = self.state.write().await;
            if let Some(batch_id) = batch_id {
                let batch = state.batches.entry(batch_id.clone()).or_insert_with(|| Batch {
                    id: batch_id,
                    signal_ids: Vec::new(),
                    user_id,
                    chat_id,
                    created_at,
                    notified: false,
                });
                batch.signal_ids.push(signal.id.clone());
            }
            state.active.insert(signal.id.clone(), signal.clone());
        }
        if let Err(err) = self.store.persist_signal(&signal).await {
            warn!(signal = %signal.id, %err, "failed to persist signal");
        }
        signal
    }

    /// Add a cohort of signals as one fresh batch. Returns `None` for an
    /// empty spec list; there is nothing to track or summarize.
    pub async fn add_batch(
        &self,
        specs: Vec<SignalSpec>,
        user_id: Option<i64>,
        chat_id: Option<i64>,
    ) -> Option<Batch> {
        if specs.is_empty() {
            return None;
        }
        let batch_id = uuid::Uuid::new_v4().to_string();
        for spec in specs {
            self.add(spec, Some(batch_id.clone()), user_id, chat_id).await;
        }
        let batch = self.batch(&batch_id).await?;
        info!(batch = %batch.id, signals = batch.signal_ids.len(), "batch added");
        Some(batch)
    }

    /// Verify every signal whose minute has expired as of `now` and return
    /// the ones that resolved, ordered by scheduled time.
    ///
    /// Verification runs concurrently and without holding the state lock,
    /// so a 65-second confirmation wait never blocks new signals or status
    /// queries. Signals whose verdict is `Unknown` stay pending and are
    /// picked up again on the next call.
    pub async fn resolve_expired(&self, now: DateTime<Utc>) -> Vec<Signal> {
        let cutoff = now - Duration::seconds(EXPIRY_OFFSET_SECS);

        // Phase 1: claim expired signals under the lock.
        let due: Vec<(String, String, Direction, Option<f64>)> = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let mut due: Vec<_> = state
                .active
                .values()
                .filter(|s| s.scheduled_at <= cutoff && !state.in_flight.contains(&s.id))
                .map(|s| (s.scheduled_at, s.id.clone(), s.pair.clone(), s.direction, s.entry_price))
                .collect();
            due.sort_by_key(|(at, ..)| *at);
            for (_, id, ..) in &due {
                state.in_flight.insert(id.clone());
            }
            due.into_iter()
                .map(|(_, id, pair, direction, entry)| (id, pair, direction, entry))
                .collect()
        };
        if due.is_empty() {
            return Vec::new();
        }

        // Phase 2: verify concurrently, lock-free.
        let verifications = due
            .into_iter()
            .map(|(id, pair, direction, entry)| {
                let feed = Arc::clone(&self.feed);
                let cfg = self.verify_cfg;
                async move {
                    let entry = match entry {
                        Some(e) => e,
                        // Entry was never captured (feed was down when the
                        // signal was issued); one attempt at expiry.
                        None => match feed.latest_price(&pair).await {
                            Ok(p) => p,
                            Err(err) => {
                                warn!(pair = %pair, %err, "entry backfill failed");
                                return (id, None, Verdict::Unknown);
                            }
                        },
                    };
                    let verdict = verify(feed.as_ref(), &pair, direction, entry, cfg).await;
                    (id, Some(entry), verdict)
                }
            })
            .collect::<Vec<_>>();
        let verdicts = join_all(verifications).await;

        // Phase 3: apply in scheduled order under the lock.
        let resolved = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let mut resolved = Vec::new();
            for (id, entry, verdict) in verdicts {
                state.in_flight.remove(&id);
                let Some(mut signal) = state.active.remove(&id) else { continue };
                if signal.entry_price.is_none() {
                    signal.entry_price = entry;
                }

                let prior = state
                    .martingale
                    .get(&signal.pair)
                    .copied()
                    .unwrap_or_default();
                let Some((recorded_depth, next)) = martingale::apply(prior, verdict) else {
                    // Unknown: stays pending for the next poll.
                    state.active.insert(id, signal);
                    continue;
                };

                let outcome = match verdict {
                    Verdict::Win { .. } => Outcome::Win,
                    _ => Outcome::Loss,
                };
                signal.state = SignalState::Resolved;
                signal.outcome = Some(outcome);
                signal.confirmed = matches!(verdict, Verdict::Win { confirmed: true });
                signal.mtg_depth = recorded_depth;
                signal.completed_at = Some(now);

                info!(
                    signal = %signal.id,
                    pair = %signal.pair,
                    %outcome,
                    depth = signal.mtg_depth,
                    confirmed = signal.confirmed,
                    "signal resolved"
                );
                state.martingale.insert(signal.pair.clone(), next);
                state.completed.push(signal.clone());
                resolved.push(signal);
            }
            resolved
        };

        for signal in &resolved {
            if let Err(err) = self.store.persist_outcome(signal).await {
                warn!(signal = %signal.id, %err, "failed to persist outcome");
            }
        }
        resolved
    }

    /// Batches whose members have all resolved and whose summary has not
    /// been handed out yet. Each batch is returned exactly once; the
    /// `notified` flag flips before this method returns.
    pub async fn batches_newly_completed(&self) -> Vec<(Batch, BatchStats)> {
        let mut state = self.state.write().await;
        let TrackerState { active, completed, batches, .. } = &mut *state;

        let mut done: Vec<(Batch, BatchStats)> = Vec::new();
        for batch in batches.values_mut() {
            if batch.notified {
                continue;
            }
            if batch.signal_ids.iter().any(|id| active.contains_key(id)) {
                continue;
            }
            batch.notified = true;
            let stats = stats_over(
                completed.iter().filter(|s| {
                    s.batch_id.as_deref() == Some(batch.id.as_str())
                }),
                batch.signal_ids.len(),
            );
            done.push((batch.clone(), stats));
        }
        done.sort_by_key(|(b, _)| b.created_at);
        done
    }

    /// Current statistics for one batch, counting still-pending members as
    /// unverified. `None` for an unknown batch id.
    pub async fn statistics_for(&self, batch_id: &str) -> Option<BatchStats> {
        let state = self.state.read().await;
        let batch = state.batches.get(batch_id)?;
        Some(stats_over(
            state
                .completed
                .iter()
                .filter(|s| s.batch_id.as_deref() == Some(batch_id)),
            batch.signal_ids.len(),
        ))
    }

    /// Drop completed signals resolved before `cutoff`, and any notified
    /// batches created before it. Returns how many signals were dropped.
    /// Pending signals are never dropped here. The cutoff cascades to the
    /// store; a store failure is logged and the in-memory prune stands.
    pub async fn clear_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let dropped = {
            let mut state = self.state.write().await;
            let before = state.completed.len();
            state
                .completed
                .retain(|s| s.completed_at.map(|t| t >= cutoff).unwrap_or(true));
            state
                .batches
                .retain(|_, b| !b.notified || b.created_at >= cutoff);
            before - state.completed.len()
        };
        if dropped > 0 {
            info!(dropped, "cleared old resolved signals");
        }
        let days = ((Utc::now() - cutoff).num_hours() / 24).max(1);
        if let Err(err) = self.store.cleanup(days).await {
            warn!(%err, "store cleanup failed");
        }
        dropped
    }

    pub async fn active_count(&self) -> usize {
        self.state.read().await.active.len()
    }

    pub async fn signal(&self, id: &str) -> Option<Signal> {
        let state = self.state.read().await;
        state
            .active
            .get(id)
            .cloned()
            .or_else(|| state.completed.iter().find(|s| s.id == id).cloned())
    }

    pub async fn batch(&self, id: &str) -> Option<Batch> {
        self.state.read().await.batches.get(id).cloned()
    }

    /// Resolved members of a batch, in scheduled order.
    pub async fn batch_results(&self, batch_id: &str) -> Vec<Signal> {
        let state = self.state.read().await;
        let mut members: Vec<Signal> = state
            .completed
            .iter()
            .filter(|s| s.batch_id.as_deref() == Some(batch_id))
            .cloned()
            .collect();
        members.sort_by_key(|s| s.scheduled_at);
        members
    }

    pub async fn martingale_state(&self, pair: &str) -> MartingaleState {
        self.state
            .read()
            .await
            .martingale
            .get(pair)
            .copied()
            .unwrap_or_default()
    }
}

// ─── Statistics ───────────────────────────────────────────────────────────────

fn stats_over<'a>(resolved: impl Iterator<Item = &'a Signal>, total: usize) -> BatchStats {
    let mut wins = 0;
    let mut losses = 0;
    for signal in resolved {
        match signal.outcome {
            Some(Outcome::Win) => wins += 1,
            Some(Outcome::Loss) => losses += 1,
            None => {}
        }
    }
    let verified = wins + losses;
    let (win_rate, loss_rate) = if verified > 0 {
        (
            wins as f64 / verified as f64 * 100.0,
            losses as f64 / verified as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };
    BatchStats {
        total,
        wins,
        losses,
        unverified: total - verified,
        win_rate,
        loss_rate,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
