//! Synthetic random-walk feed.
//!
//! Developer-only: lets the bot run offline. Candles are deterministic for a
//! given (symbol, seed, last open time), aligned to interval boundaries.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{CandleFeed, FeedError};
use crate::domain::{Candle, CandleSeries, Interval};

/// First open of every generated walk.
const START_PRICE: f64 = 100.0;

pub struct SyntheticFeed {
    seed: u64,
    /// Fixed "now" for reproducible output; wall clock when `None`.
    anchor: Option<DateTime<Utc>>,
}

impl SyntheticFeed {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            anchor: None,
        }
    }

    pub fn anchored_at(mut self, now: DateTime<Utc>) -> Self {
        self.anchor = Some(now);
        self
    }

    /// Generate `count` candles whose last candle opens at the interval
    /// boundary at or before `now`.
    pub fn generate(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
        now: DateTime<Utc>,
    ) -> Vec<Candle> {
        let step = interval.seconds();
        let last_open = now.timestamp() - now.timestamp().rem_euclid(step);

        let mut hasher = blake3::Hasher::new();
        hasher.update(symbol.as_bytes());
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(&last_open.to_le_bytes());
        let mut rng = StdRng::from_seed(*hasher.finalize().as_bytes());

        let mut price = START_PRICE;
        (0..count)
            .filter_map(|i| {
                let open_ts = last_open - step * (count - 1 - i) as i64;
                let open_time = DateTime::from_timestamp(open_ts, 0)?;
                let change: f64 = rng.gen_range(-0.02..0.02);
                let open = price;
                let close = (price * (1.0 + change)).max(0.01);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.005));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.005));
                let volume = rng.gen_range(10.0..1_000.0);
                price = close;
                Some(Candle {
                    open_time,
                    open,
                    high,
                    low,
                    close,
                    volume,
                })
            })
            .collect()
    }
}

impl CandleFeed for SyntheticFeed {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_recent_candles(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<CandleSeries, FeedError> {
        let now = self.anchor.unwrap_or_else(Utc::now);
        let candles = self.generate(symbol, interval, count, now);
        Ok(CandleSeries::with_interval(symbol, interval, candles)?)
    }
}
