//! Binance spot klines feed.
//!
//! Fetches recent candles from the public `/api/v3/klines` endpoint. Read-only:
//! no API key is needed and none is sent. Handles rate limiting, retries with
//! exponential backoff, response parsing, and the circuit breaker.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{CandleFeed, FeedError};
use crate::domain::{Candle, CandleSeries, Interval};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Exchange-side cap on `limit`.
const MAX_LIMIT: usize = 1000;

/// Wait assumed when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Retry delays stop doubling after this many steps.
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

/// Error body returned alongside 4xx statuses.
#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

/// Binance invalid-symbol error code.
const INVALID_SYMBOL: i64 = -1121;

/// Binance klines feed.
pub struct BinanceFeed {
    client: reqwest::blocking::Client,
    base_url: String,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl BinanceFeed {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, FeedError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kumo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sleep before retry `attempt` (1-based): doubles from the base delay,
    /// then holds.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(MAX_BACKOFF_DOUBLINGS);
        self.base_delay.saturating_mul(2u32.saturating_pow(doublings))
    }

    /// Build the klines URL for a symbol.
    fn klines_url(&self, symbol: &str, interval: Interval, count: usize) -> String {
        format!(
            "{}/api/v3/klines?symbol={symbol}&interval={}&limit={}",
            self.base_url,
            interval.code(),
            count.clamp(1, MAX_LIMIT)
        )
    }

    /// Parse a klines response body into a validated series.
    ///
    /// Each kline is an array: `[open_time_ms, "open", "high", "low", "close",
    /// "volume", close_time_ms, ...]`.
    pub fn parse_klines(
        symbol: &str,
        interval: Interval,
        body: &str,
    ) -> Result<CandleSeries, FeedError> {
        let rows: Vec<Vec<Value>> = match serde_json::from_str(body) {
            Ok(rows) => rows,
            Err(parse_err) => {
                return Err(match serde_json::from_str::<ApiError>(body) {
                    Ok(api) => api_error(symbol, api),
                    Err(_) => FeedError::ResponseFormatChanged(format!(
                        "klines body is not an array: {parse_err}"
                    )),
                })
            }
        };

        let candles = rows
            .iter()
            .enumerate()
            .map(|(i, row)| parse_row(i, row))
            .collect::<Result<Vec<_>, _>>()?;

        if candles.is_empty() {
            return Err(FeedError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(CandleSeries::with_interval(symbol, interval, candles)?)
    }

    /// Execute a single HTTP request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleSeries, FeedError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FeedError::CircuitBreakerTripped);
        }

        let url = self.klines_url(symbol, interval, count);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay(attempt);
                tracing::debug!(attempt, ?delay, "retrying klines request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(FeedError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    // 418 is Binance's IP-ban status after ignored 429s.
                    if status == reqwest::StatusCode::FORBIDDEN
                        || status == reqwest::StatusCode::IM_A_TEAPOT
                    {
                        self.circuit_breaker.trip();
                        return Err(FeedError::CircuitBreakerTripped);
                    }

                    // Never retried here; the caller waits out `Retry-After`.
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.trim().parse::<u64>().ok())
                            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                        tracing::warn!(symbol, retry_after, "rate limited by binance");
                        return Err(FeedError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                    }

                    let body = match resp.text() {
                        Ok(body) => body,
                        Err(e) => {
                            last_error = Some(FeedError::NetworkUnreachable(e.to_string()));
                            continue;
                        }
                    };

                    if status.is_client_error() {
                        return Err(match serde_json::from_str::<ApiError>(&body) {
                            Ok(api) => api_error(symbol, api),
                            Err(_) => FeedError::Other(format!("HTTP {status} for {symbol}")),
                        });
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(FeedError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let series = Self::parse_klines(symbol, interval, &body)?;
                    self.circuit_breaker.record_success();
                    return Ok(series);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(FeedError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(FeedError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FeedError::Other("max retries exceeded".into())))
    }
}

impl CandleFeed for BinanceFeed {
    fn name(&self) -> &str {
        "binance"
    }

    fn fetch_recent_candles(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleSeries, FeedError> {
        self.fetch_with_retry(symbol, interval, count)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

fn api_error(symbol: &str, api: ApiError) -> FeedError {
    if api.code == INVALID_SYMBOL {
        FeedError::SymbolNotFound {
            symbol: symbol.to_string(),
        }
    } else {
        FeedError::Other(format!("binance error {}: {}", api.code, api.msg))
    }
}

fn parse_row(index: usize, row: &[Value]) -> Result<Candle, FeedError> {
    let field = |pos: usize, name: &str| -> Result<f64, FeedError> {
        let value = row.get(pos).ok_or_else(|| {
            FeedError::ResponseFormatChanged(format!("kline {index} has no {name}"))
        })?;
        number(value).ok_or_else(|| {
            FeedError::ResponseFormatChanged(format!(
                "kline {index} {name} is not numeric: {value}"
            ))
        })
    };

    let open_ms = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            FeedError::ResponseFormatChanged(format!("kline {index} has no open time"))
        })?;
    let open_time = DateTime::from_timestamp_millis(open_ms).ok_or_else(|| {
        FeedError::ResponseFormatChanged(format!("kline {index} open time out of range: {open_ms}"))
    })?;

    Ok(Candle {
        open_time,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
    })
}

/// Prices arrive as decimal strings; accept bare numbers too.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}
