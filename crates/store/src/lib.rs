//! SQLite mirror of the tracker's in-memory state.
//!
//! Selected when DATABASE_URL is set. Writes are best-effort from the
//! caller's point of view; the tracker never blocks on the database and
//! keeps running if a write fails.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use common::{Outcome, Result, Signal, SignalStore};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and ensure the
    /// schema exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = url
            .parse::<SqliteConnectOptions>()
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);
        // Single connection: writes are serialized anyway, and this keeps
        // `sqlite::memory:` databases coherent in tests.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(sqlx::Error::from)?;
        let store = Self { pool };
        store.init_schema().await?;
        info!(url, "sqlite store ready");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS signals (
                id           TEXT PRIMARY KEY,
                pair         TEXT NOT NULL,
                direction    TEXT NOT NULL,
                scheduled_at TEXT NOT NULL,
                time_label   TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                entry_price  REAL,
                outcome      TEXT,
                mtg_depth    INTEGER NOT NULL DEFAULT 0,
                confirmed    INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                batch_id     TEXT,
                user_id      INTEGER,
                chat_id      INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS batches (
                id         TEXT PRIMARY KEY,
                user_id    INTEGER,
                chat_id    INTEGER,
                created_at TEXT NOT NULL,
                wins       INTEGER NOT NULL DEFAULT 0,
                losses     INTEGER NOT NULL DEFAULT 0,
                win_rate   REAL NOT NULL DEFAULT 0.0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_signals_batch ON signals (batch_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_signals_created ON signals (created_at)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[cfg(test)]
    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SignalStore for SqliteStore {
    async fn persist_signal(&self, signal: &Signal) -> Result<()> {
        if let Some(batch_id) = &signal.batch_id {
            sqlx::query(
                "INSERT OR IGNORE INTO batches (id, user_id, chat_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(batch_id)
            .bind(signal.user_id)
            .bind(signal.chat_id)
            .bind(signal.created_at)
            .execute(&self.pool)
            .await?;
        }

        sqlx::query(
            "INSERT OR REPLACE INTO signals
             (id, pair, direction, scheduled_at, time_label, created_at,
              entry_price, outcome, mtg_depth, confirmed, completed_at,
              batch_id, user_id, chat_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&signal.id)
        .bind(&signal.pair)
        .bind(signal.direction)
        .bind(signal.scheduled_at)
        .bind(&signal.time_label)
        .bind(signal.created_at)
        .bind(signal.entry_price)
        .bind(signal.outcome)
        .bind(signal.mtg_depth as i64)
        .bind(signal.confirmed)
        .bind(signal.completed_at)
        .bind(&signal.batch_id)
        .bind(signal.user_id)
        .bind(signal.chat_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn persist_outcome(&self, signal: &Signal) -> Result<()> {
        sqlx::query(
            "UPDATE signals
             SET outcome = ?1, mtg_depth = ?2, confirmed = ?3,
                 completed_at = ?4, entry_price = ?5
             WHERE id = ?6",
        )
        .bind(signal.outcome)
        .bind(signal.mtg_depth as i64)
        .bind(signal.confirmed)
        .bind(signal.completed_at)
        .bind(signal.entry_price)
        .bind(&signal.id)
        .execute(&self.pool)
        .await?;

        if let (Some(batch_id), Some(outcome)) = (&signal.batch_id, signal.outcome) {
            let (win, loss) = match outcome {
                Outcome::Win => (1i64, 0i64),
                Outcome::Loss => (0, 1),
            };
            // `wins`/`losses` on the right-hand side are pre-update values,
            // so the new verified count is wins + losses + 1.
            sqlx::query(
                "UPDATE batches
                 SET wins = wins + ?1,
                     losses = losses + ?2,
                     win_rate = CAST(wins + ?1 AS REAL) / (wins + losses + 1) * 100.0
                 WHERE id = ?3",
            )
            .bind(win)
            .bind(loss)
            .bind(batch_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn cleanup(&self, older_than_days: i64) -> Result<()> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let signals = sqlx::query("DELETE FROM signals WHERE created_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        let batches = sqlx::query("DELETE FROM batches WHERE created_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if signals > 0 || batches > 0 {
            info!(signals, batches, "cleaned up old rows");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Direction, SignalSpec, SignalState};

    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn signal(pair: &str, batch_id: Option<String>) -> Signal {
        Signal::from_spec(
            SignalSpec {
                pair: pair.to_string(),
                direction: Direction::Call,
                scheduled_at: Utc::now(),
                time_label: "12:00".into(),
                entry_price: Some(1.1),
            },
            batch_id,
            Some(1),
            Some(1),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn round_trips_a_signal_row() {
        let store = store().await;
        let s = signal("EURUSD", None);
        store.persist_signal(&s).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM signals")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        let direction: String =
            sqlx::query_scalar("SELECT direction FROM signals WHERE id = ?1")
                .bind(&s.id)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(direction, "CALL");
    }

    #[tokio::test]
    async fn outcome_update_bumps_batch_counters() {
        let store = store().await;
        let batch_id = "batch-1".to_string();

        let mut a = signal("EURUSD", Some(batch_id.clone()));
        let mut b = signal("GBPUSD", Some(batch_id.clone()));
        store.persist_signal(&a).await.unwrap();
        store.persist_signal(&b).await.unwrap();

        a.state = SignalState::Resolved;
        a.outcome = Some(Outcome::Win);
        a.completed_at = Some(Utc::now());
        store.persist_outcome(&a).await.unwrap();

        b.state = SignalState::Resolved;
        b.outcome = Some(Outcome::Loss);
        b.mtg_depth = 1;
        b.completed_at = Some(Utc::now());
        store.persist_outcome(&b).await.unwrap();

        let (wins, losses, win_rate): (i64, i64, f64) =
            sqlx::query_as("SELECT wins, losses, win_rate FROM batches WHERE id = ?1")
                .bind(&batch_id)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!((wins, losses), (1, 1));
        assert!((win_rate - 50.0).abs() < 1e-9);

        let outcome: String =
            sqlx::query_scalar("SELECT outcome FROM signals WHERE id = ?1")
                .bind(&b.id)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(outcome, "loss");
    }

    #[tokio::test]
    async fn cleanup_drops_only_old_rows() {
        let store = store().await;
        let mut old = signal("EURUSD", None);
        old.created_at = Utc::now() - Duration::days(3);
        let fresh = signal("GBPUSD", None);
        store.persist_signal(&old).await.unwrap();
        store.persist_signal(&fresh).await.unwrap();

        store.cleanup(1).await.unwrap();

        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM signals")
            .fetch_all(store.pool())
            .await
            .unwrap();
        assert_eq!(ids, vec![fresh.id]);
    }
}
