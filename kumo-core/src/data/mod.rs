//! Candle feeds

pub mod binance;
pub mod circuit_breaker;
pub mod provider;
pub mod synthetic;

pub use binance::BinanceFeed;
pub use circuit_breaker::CircuitBreaker;
pub use provider::{CandleFeed, FeedError};
pub use synthetic::SyntheticFeed;
