//! Telegram surface: command/callback handlers, message formatting and the
//! background poller that pushes verification results.

pub mod commands;
pub mod format;
pub mod poller;

pub use commands::{start_bot, BotDeps, Command};
pub use poller::{run_poller, PollerConfig};
