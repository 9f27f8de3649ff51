//! Candle feed trait and structured error types.
//!
//! The CandleFeed trait abstracts over data sources (Binance klines, the
//! synthetic random walk) so the evaluation loop can swap implementations and
//! mock them in tests.

use thiserror::Error;

use crate::domain::{CandleSeries, Interval, SeriesError};

/// Structured error types for feed operations.
///
/// Every variant means "data unavailable" to the evaluation loop: the tick is
/// abandoned and retried after a backoff.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("malformed candle series: {0}")]
    MalformedSeries(#[from] SeriesError),

    #[error("feed error: {0}")]
    Other(String),
}

impl FeedError {
    /// True when the series itself was rejected rather than not delivered.
    pub fn is_malformed(&self) -> bool {
        matches!(self, FeedError::MalformedSeries(_))
    }
}

/// Pull-based candle source.
///
/// Implementations must return candles in ascending time order with no gaps,
/// already validated into a `CandleSeries`.
pub trait CandleFeed: Send + Sync {
    /// Human-readable name of this feed.
    fn name(&self) -> &str;

    /// Fetch the `count` most recent candles for `symbol`; the last one may
    /// still be forming.
    fn fetch_recent_candles(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleSeries, FeedError>;

    /// Check if the feed is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn series_errors_convert_to_malformed() {
        let err: FeedError = SeriesError::NonFinitePrice { index: 3 }.into();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("candle 3"));
        assert!(!FeedError::CircuitBreakerTripped.is_malformed());
    }

    #[test]
    fn gap_message_names_both_times() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let err: FeedError = SeriesError::Gap {
            index: 1,
            expected: t,
            found: t,
        }
        .into();
        assert!(err.to_string().starts_with("malformed candle series: gap before candle 1"));
    }
}
