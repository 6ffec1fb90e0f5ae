/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    /// Empty list = open bot (no allowlist filtering).
    pub telegram_allowed_user_ids: Vec<i64>,

    // Price feed
    pub feed_ws_url: String,

    // Database (None = in-memory only, no persistence)
    pub database_url: Option<String>,

    // Polling / lifecycle
    pub poll_interval_secs: u64,
    pub cleanup_after_hours: i64,

    // Signal generation
    pub target_signals: usize,
    pub signal_interval_minutes: i64,

    // Broker-time display offset from UTC, in hours (signal sheets show
    // "SELECT BROKER TIME UTC +6:00" style labels).
    pub broker_utc_offset_hours: i32,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let telegram_allowed_user_ids = optional_env("TELEGRAM_ALLOWED_USER_IDS")
            .map(|raw| {
                raw.split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| {
                        s.trim().parse::<i64>().unwrap_or_else(|_| {
                            panic!(
                                "TELEGRAM_ALLOWED_USER_IDS contains non-numeric ID: '{}'",
                                s.trim()
                            )
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Config {
            telegram_token: required_env("TELEGRAM_TOKEN"),
            telegram_allowed_user_ids,
            feed_ws_url: optional_env("FEED_WS_URL").unwrap_or_else(|| {
                "wss://ws.binaryws.com/websockets/v3?app_id=1089".to_string()
            }),
            database_url: optional_env("DATABASE_URL"),
            poll_interval_secs: optional_env("POLL_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            cleanup_after_hours: optional_env("CLEANUP_AFTER_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            target_signals: optional_env("TARGET_SIGNALS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            signal_interval_minutes: optional_env("SIGNAL_INTERVAL_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            broker_utc_offset_hours: optional_env("BROKER_UTC_OFFSET_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(6),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
