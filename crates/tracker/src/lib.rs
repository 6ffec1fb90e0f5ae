//! Signal lifecycle and result verification.
//!
//! `SignalTracker` owns every pending prediction, verifies each one against
//! the price feed once its minute expires, applies per-pair martingale
//! accounting, and aggregates batches for exactly-once summaries.

pub mod martingale;
pub mod tracker;
pub mod verify;

pub use tracker::SignalTracker;
pub use verify::{Verdict, VerifyConfig};
