use async_trait::async_trait;

use crate::{Result, Signal};

/// Optional durable mirror of the tracker's in-memory state.
///
/// Every call is best-effort from the tracker's point of view: failures are
/// logged by the caller and never propagated, and in-memory state remains
/// authoritative. `SqliteStore` in `crates/store` implements this when a
/// DATABASE_URL is configured; `NoopStore` is selected otherwise.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Record a newly added signal (and its batch, if any).
    async fn persist_signal(&self, signal: &Signal) -> Result<()>;

    /// Record the resolution of a signal.
    async fn persist_outcome(&self, signal: &Signal) -> Result<()>;

    /// Delete signals and batches older than the cutoff.
    async fn cleanup(&self, older_than_days: i64) -> Result<()>;
}

/// Store used when no database is configured. Accepts everything, keeps
/// nothing.
#[derive(Debug, Default, Clone)]
pub struct NoopStore;

#[async_trait]
impl SignalStore for NoopStore {
    async fn persist_signal(&self, _signal: &Signal) -> Result<()> {
        Ok(())
    }

    async fn persist_outcome(&self, _signal: &Signal) -> Result<()> {
        Ok(())
    }

    async fn cleanup(&self, _older_than_days: i64) -> Result<()> {
        Ok(())
    }
}
