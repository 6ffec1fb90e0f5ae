pub mod indicators;
pub mod news;
pub mod schedule;
pub mod scorer;

pub use news::NewsFilter;
pub use schedule::{plan_batch, PlannedSignal, ScheduleParams};
pub use scorer::score;

/// The fixed set of major forex pairs the bot trades.
pub const PAIRS: [&str; 11] = [
    "EURUSD", "GBPUSD", "USDJPY", "USDCHF", "AUDUSD", "USDCAD", "NZDUSD", "EURGBP", "EURJPY",
    "GBPJPY", "NZDCHF",
];
