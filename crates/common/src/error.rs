use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Price fetch failed. Retryable: verification is deferred to the next
    /// poll, never assumed as a win.
    #[error("Price feed unavailable: {0}")]
    FeedUnavailable(String),

    /// Malformed signal spec. The offending record is dropped with a log
    /// line; no result is ever fabricated for it.
    #[error("Unknown signal direction: {0}")]
    UnknownDirection(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
