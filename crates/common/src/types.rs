use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Predicted direction of the next candle.
/// "CALL" = price goes up, "PUT" = price goes down (binary-options naming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Direction {
    Call,
    Put,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Call => write!(f, "CALL"),
            Direction::Put => write!(f, "PUT"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CALL" => Ok(Direction::Call),
            "PUT" => Ok(Direction::Put),
            other => Err(Error::UnknownDirection(other.to_string())),
        }
    }
}

/// One finalized one-minute candle from the price feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix epoch seconds of the candle open.
    pub epoch: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Final result of a verified signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
        }
    }
}

/// Lifecycle state of a signal. Pending → Resolved, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    #[default]
    Pending,
    Resolved,
}

/// What a signal looks like before the tracker assigns it an identity.
#[derive(Debug, Clone)]
pub struct SignalSpec {
    pub pair: String,
    pub direction: Direction,
    /// The future minute this prediction is for.
    pub scheduled_at: DateTime<Utc>,
    /// Broker-time display string ("HH:MM").
    pub time_label: String,
    /// Reference price at creation. May be filled in later by the tracker
    /// (one fetch attempt) if the feed was down when the signal was issued.
    pub entry_price: Option<f64>,
}

/// One prediction instance, owned by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub pair: String,
    pub direction: Direction,
    pub scheduled_at: DateTime<Utc>,
    pub time_label: String,
    pub created_at: DateTime<Utc>,
    /// Immutable once set.
    pub entry_price: Option<f64>,
    pub state: SignalState,
    /// Absent while Pending; write-once on resolution.
    pub outcome: Option<Outcome>,
    /// Martingale depth recorded at resolution (consecutive prior losses
    /// for this pair's sequence, see `MartingaleState`).
    pub mtg_depth: u32,
    /// True when the win came from the second-stage confirmation candle.
    pub confirmed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub batch_id: Option<String>,
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
}

impl Signal {
    pub fn from_spec(
        spec: SignalSpec,
        batch_id: Option<String>,
        user_id: Option<i64>,
        chat_id: Option<i64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pair: spec.pair,
            direction: spec.direction,
            scheduled_at: spec.scheduled_at,
            time_label: spec.time_label,
            created_at,
            entry_price: spec.entry_price,
            state: SignalState::Pending,
            outcome: None,
            mtg_depth: 0,
            confirmed: false,
            completed_at: None,
            batch_id,
            user_id,
            chat_id,
        }
    }
}

/// A cohort of signals issued together (one generation event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub signal_ids: Vec<String>,
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Exactly-once final-summary flag. Completion itself is recomputed
    /// from member signals on every poll.
    pub notified: bool,
}

/// Statistics recomputed over a batch's resolved members.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    /// Resolved signals with no usable outcome. Normally zero; the tracker
    /// never resolves a signal it could not verify. Kept for defensive
    /// reporting.
    pub unverified: usize,
    /// wins / (wins + losses) × 100, or 0.0 when nothing is verified.
    pub win_rate: f64,
    pub loss_rate: f64,
}

/// Per-pair martingale running state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MartingaleState {
    /// Consecutive-loss depth for the pair's current sequence.
    pub depth: u32,
    pub last_outcome: Option<Outcome>,
    pub last_confirmed: bool,
}
