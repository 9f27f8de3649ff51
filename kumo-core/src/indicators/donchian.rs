//! Donchian Channel: highest high / lowest low over a lookback window.
//!
//! Produces two series (exposed as separate Indicator instances):
//! - Upper: max(high[t-period+1..=t])
//! - Lower: min(low[t-period+1..=t])
//!
//! Lookback: period - 1. Every Ichimoku midpoint line is built from a pair
//! of these channels.

use crate::components::indicator::Indicator;
use crate::domain::Candle;

/// Which band of the Donchian channel to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn upper(period: usize) -> Self {
        Self {
            period,
            band: DonchianBand::Upper,
            name: format!("donchian_upper_{period}"),
        }
    }

    pub fn lower(period: usize) -> Self {
        Self {
            period,
            band: DonchianBand::Lower,
            name: format!("donchian_lower_{period}"),
        }
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];

        if self.period == 0 || n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &candles[i + 1 - self.period..=i];
            result[i] = match self.band {
                DonchianBand::Upper => window
                    .iter()
                    .map(|c| c.high)
                    .fold(f64::NEG_INFINITY, f64::max),
                DonchianBand::Lower => window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
            };
        }

        result
    }
}

/// Midpoint of the Donchian channel: `(upper + lower) / 2` per index.
pub fn channel_midpoint(candles: &[Candle], period: usize) -> Vec<f64> {
    let upper = Donchian::upper(period).compute(candles);
    let lower = Donchian::lower(period).compute(candles);
    upper
        .iter()
        .zip(&lower)
        .map(|(hi, lo)| (hi + lo) / 2.0)
        .collect()
}
