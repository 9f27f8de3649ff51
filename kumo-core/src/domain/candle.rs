//! Candle: the fundamental market data unit, and the validated series of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::interval::Interval;

/// OHLCV candle for a single period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if every price and the volume are finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }

    /// Basic OHLC sanity check: high bounds the body from above, low from below.
    pub fn is_sane(&self) -> bool {
        self.is_well_formed()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}

/// Why a candle series was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("candle {index} has a non-finite or negative price")]
    NonFinitePrice { index: usize },

    #[error("candle {index} has high/low that do not bound open and close")]
    InconsistentOhlc { index: usize },

    #[error("candle {index} open_time {time} does not follow {previous}")]
    NonMonotonic {
        index: usize,
        previous: DateTime<Utc>,
        time: DateTime<Utc>,
    },

    #[error("gap before candle {index}: expected {expected}, found {found}")]
    Gap {
        index: usize,
        expected: DateTime<Utc>,
        found: DateTime<Utc>,
    },
}

/// Ordered candles for one symbol, most-recent-last.
///
/// Construction validates the series, so every `CandleSeries` in the system
/// has finite non-negative prices, a high and low that bound each candle's
/// body, and strictly increasing open times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    symbol: String,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Validate and wrap candles. Spacing between candles is not checked.
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Result<Self, SeriesError> {
        validate(&candles, None)?;
        Ok(Self {
            symbol: symbol.into(),
            candles,
        })
    }

    /// Validate and wrap candles, additionally requiring exactly one `interval`
    /// between consecutive open times.
    pub fn with_interval(
        symbol: impl Into<String>,
        interval: Interval,
        candles: Vec<Candle>,
    ) -> Result<Self, SeriesError> {
        validate(&candles, Some(interval))?;
        Ok(Self {
            symbol: symbol.into(),
            candles,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The oldest `len` candles as a new series (for replaying history tick by tick).
    pub fn prefix(&self, len: usize) -> CandleSeries {
        CandleSeries {
            symbol: self.symbol.clone(),
            candles: self.candles[..len.min(self.candles.len())].to_vec(),
        }
    }
}

fn validate(candles: &[Candle], interval: Option<Interval>) -> Result<(), SeriesError> {
    for (index, candle) in candles.iter().enumerate() {
        if !candle.is_well_formed() {
            return Err(SeriesError::NonFinitePrice { index });
        }
        if !candle.is_sane() {
            return Err(SeriesError::InconsistentOhlc { index });
        }
        if index == 0 {
            continue;
        }
        let previous = candles[index - 1].open_time;
        if candle.open_time <= previous {
            return Err(SeriesError::NonMonotonic {
                index,
                previous,
                time: candle.open_time,
            });
        }
        if let Some(interval) = interval {
            let expected = previous + interval.duration();
            if candle.open_time != expected {
                return Err(SeriesError::Gap {
                    index,
                    expected,
                    found: candle.open_time,
                });
            }
        }
    }
    Ok(())
}
