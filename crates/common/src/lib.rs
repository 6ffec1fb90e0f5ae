pub mod config;
pub mod error;
pub mod feed;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use feed::PriceFeed;
pub use store::{NoopStore, SignalStore};
pub use types::*;
