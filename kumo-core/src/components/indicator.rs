//! Indicator trait.
//!
//! Indicators are pure functions: candle history in, numeric series out.
//! Entries without enough history are `f64::NAN` and must be read through
//! [`value_at`], which turns them into `None` rather than a number.

use crate::domain::Candle;

/// Trait for indicators.
///
/// Indicators take a full candle series and produce a numeric output series
/// of the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// Lagging lines (Chikou) plot a later close at an earlier index, so they are
/// undefined at the tail instead; their `lookback()` is zero.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "tenkan_9", "kijun_26").
    fn name(&self) -> &str;

    /// Number of leading entries that are undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire candle series.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Value of `series` at `index`, or `None` when out of range or undefined.
pub fn value_at(series: &[f64], index: usize) -> Option<f64> {
    series.get(index).copied().filter(|v| v.is_finite())
}
