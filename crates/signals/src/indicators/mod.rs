pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod rsi;
pub mod stochastic;
pub mod trend;

pub use adx::adx;
pub use atr::atr;
pub use bollinger::{bollinger, Bands};
pub use macd::{macd, Macd};
pub use rsi::rsi;
pub use stochastic::stochastic;
pub use trend::{ema, sma, vwap_proxy};
