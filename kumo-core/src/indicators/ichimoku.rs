//! Ichimoku Kinko Hyo: five aligned lines from one candle series.
//!
//! - Tenkan: midpoint of the `tenkan`-period high/low channel
//! - Kijun: midpoint of the `kijun`-period high/low channel
//! - Span A: (tenkan + kijun) / 2, shifted forward `shift` periods
//! - Span B: midpoint of the `senkou_b`-period channel, shifted forward `shift`
//! - Chikou: close shifted backward `shift` periods
//!
//! Span A/B at index i are plotted ahead of the candle they were computed on,
//! so they are undefined for the first `shift` indices beyond their own warmup.
//! Chikou at index i is `close[i + shift]`, undefined for the last `shift`
//! indices.

use serde::{Deserialize, Serialize};

use crate::components::indicator::{value_at, Indicator};
use crate::domain::Candle;

use super::donchian::channel_midpoint;

/// Lookback windows and displacement for the Ichimoku lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IchimokuWindows {
    pub tenkan: usize,
    pub kijun: usize,
    pub senkou_b: usize,
    pub shift: usize,
}

impl Default for IchimokuWindows {
    fn default() -> Self {
        Self {
            tenkan: 9,
            kijun: 26,
            senkou_b: 52,
            shift: 26,
        }
    }
}

impl IchimokuWindows {
    /// Candles needed for every line to be defined at the evaluation index:
    /// the longest window, the displacement, and the one-candle evaluation lag.
    pub fn full_history(&self) -> usize {
        self.senkou_b.max(self.kijun).max(self.tenkan) + self.shift + 2
    }

    /// Name of the first zero-sized window, if any.
    pub fn first_zero(&self) -> Option<&'static str> {
        [
            ("tenkan", self.tenkan),
            ("kijun", self.kijun),
            ("senkou_b", self.senkou_b),
            ("shift", self.shift),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0)
        .map(|(name, _)| name)
    }
}

/// Which Ichimoku line to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IchimokuLine {
    Tenkan,
    Kijun,
    SpanA,
    SpanB,
    Chikou,
}

/// One Ichimoku line as a standalone indicator.
#[derive(Debug, Clone)]
pub struct Ichimoku {
    line: IchimokuLine,
    windows: IchimokuWindows,
    name: String,
}

impl Ichimoku {
    pub fn new(line: IchimokuLine, windows: IchimokuWindows) -> Self {
        let name = match line {
            IchimokuLine::Tenkan => format!("tenkan_{}", windows.tenkan),
            IchimokuLine::Kijun => format!("kijun_{}", windows.kijun),
            IchimokuLine::SpanA => format!(
                "span_a_{}_{}_{}",
                windows.tenkan, windows.kijun, windows.shift
            ),
            IchimokuLine::SpanB => format!("span_b_{}_{}", windows.senkou_b, windows.shift),
            IchimokuLine::Chikou => format!("chikou_{}", windows.shift),
        };
        Self {
            line,
            windows,
            name,
        }
    }
}

impl Indicator for Ichimoku {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        let w = &self.windows;
        match self.line {
            IchimokuLine::Tenkan => w.tenkan.saturating_sub(1),
            IchimokuLine::Kijun => w.kijun.saturating_sub(1),
            IchimokuLine::SpanA => w.tenkan.max(w.kijun).saturating_sub(1) + w.shift,
            IchimokuLine::SpanB => w.senkou_b.saturating_sub(1) + w.shift,
            IchimokuLine::Chikou => 0,
        }
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let w = &self.windows;
        match self.line {
            IchimokuLine::Tenkan => channel_midpoint(candles, w.tenkan),
            IchimokuLine::Kijun => channel_midpoint(candles, w.kijun),
            IchimokuLine::SpanA => {
                let tenkan = channel_midpoint(candles, w.tenkan);
                let kijun = channel_midpoint(candles, w.kijun);
                let base: Vec<f64> = tenkan
                    .iter()
                    .zip(&kijun)
                    .map(|(t, k)| (t + k) / 2.0)
                    .collect();
                shift_forward(&base, w.shift)
            }
            IchimokuLine::SpanB => shift_forward(&channel_midpoint(candles, w.senkou_b), w.shift),
            IchimokuLine::Chikou => {
                let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
                shift_backward(&closes, w.shift)
            }
        }
    }
}

/// `out[i] = series[i - periods]`; the first `periods` entries are undefined.
pub fn shift_forward(series: &[f64], periods: usize) -> Vec<f64> {
    let n = series.len();
    let mut out = vec![f64::NAN; n];
    if periods < n {
        out[periods..].copy_from_slice(&series[..n - periods]);
    }
    out
}

/// `out[i] = series[i + periods]`; the last `periods` entries are undefined.
pub fn shift_backward(series: &[f64], periods: usize) -> Vec<f64> {
    let n = series.len();
    let mut out = vec![f64::NAN; n];
    if periods < n {
        out[..n - periods].copy_from_slice(&series[periods..]);
    }
    out
}

/// All five Ichimoku lines, each the same length as the input series.
#[derive(Debug, Clone, PartialEq)]
pub struct IchimokuSeries {
    pub tenkan: Vec<f64>,
    pub kijun: Vec<f64>,
    pub span_a: Vec<f64>,
    pub span_b: Vec<f64>,
    pub chikou: Vec<f64>,
}

impl IchimokuSeries {
    pub fn compute(candles: &[Candle], windows: &IchimokuWindows) -> Self {
        let line = |l| Ichimoku::new(l, *windows).compute(candles);
        Self {
            tenkan: line(IchimokuLine::Tenkan),
            kijun: line(IchimokuLine::Kijun),
            span_a: line(IchimokuLine::SpanA),
            span_b: line(IchimokuLine::SpanB),
            chikou: line(IchimokuLine::Chikou),
        }
    }

    pub fn len(&self) -> usize {
        self.tenkan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenkan.is_empty()
    }

    /// Series for one line.
    pub fn line(&self, line: IchimokuLine) -> &[f64] {
        match line {
            IchimokuLine::Tenkan => &self.tenkan,
            IchimokuLine::Kijun => &self.kijun,
            IchimokuLine::SpanA => &self.span_a,
            IchimokuLine::SpanB => &self.span_b,
            IchimokuLine::Chikou => &self.chikou,
        }
    }

    /// Defined value of `line` at `index`.
    pub fn at(&self, line: IchimokuLine, index: usize) -> Option<f64> {
        value_at(self.line(line), index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    fn rising(n: usize) -> Vec<Candle> {
        make_candles(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
    }

    #[test]
    fn shift_forward_moves_values_later() {
        let out = shift_forward(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_eq!(&out[2..], &[1.0, 2.0]);
    }

    #[test]
    fn shift_backward_moves_values_earlier() {
        let out = shift_backward(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(&out[..2], &[3.0, 4.0]);
        assert!(out[2].is_nan() && out[3].is_nan());
    }

    #[test]
    fn shift_longer_than_series_is_all_undefined() {
        assert!(shift_forward(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
        assert!(shift_backward(&[1.0, 2.0], 2).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn tenkan_on_known_window() {
        // make_candles: high = max(open, close) + 1, low = min(open, close) - 1.
        // Rising by 1: window [0..=8] high max = 109, low min = 99.
        // Window [1..=9]: high max = 110, low min = 99 (candle 1 opens at 100).
        let lines = IchimokuSeries::compute(&rising(12), &IchimokuWindows::default());
        assert!(lines.tenkan[7].is_nan());
        assert_approx(lines.tenkan[8], 104.0, DEFAULT_EPSILON);
        assert_approx(lines.tenkan[9], 104.5, DEFAULT_EPSILON);
    }

    #[test]
    fn every_line_has_input_length() {
        let lines = IchimokuSeries::compute(&rising(90), &IchimokuWindows::default());
        for line in [
            IchimokuLine::Tenkan,
            IchimokuLine::Kijun,
            IchimokuLine::SpanA,
            IchimokuLine::SpanB,
            IchimokuLine::Chikou,
        ] {
            assert_eq!(lines.line(line).len(), 90);
        }
    }

    #[test]
    fn warmup_boundaries_match_lookback() {
        let windows = IchimokuWindows::default();
        let candles = rising(100);
        for line in [
            IchimokuLine::Tenkan,
            IchimokuLine::Kijun,
            IchimokuLine::SpanA,
            IchimokuLine::SpanB,
        ] {
            let ind = Ichimoku::new(line, windows);
            let out = ind.compute(&candles);
            let lb = ind.lookback();
            assert!(out[..lb].iter().all(|v| v.is_nan()), "{} warmup", ind.name());
            assert!(out[lb].is_finite(), "{} first value", ind.name());
        }
    }

    #[test]
    fn span_a_is_base_line_placed_26_later() {
        let candles = rising(90);
        let lines = IchimokuSeries::compute(&candles, &IchimokuWindows::default());
        for i in 26..90 {
            let base = (lines.tenkan[i - 26] + lines.kijun[i - 26]) / 2.0;
            if base.is_nan() {
                assert!(lines.span_a[i].is_nan());
            } else {
                assert_approx(lines.span_a[i], base, DEFAULT_EPSILON);
            }
        }
    }

    #[test]
    fn chikou_is_future_close() {
        let candles = rising(40);
        let lines = IchimokuSeries::compute(&candles, &IchimokuWindows::default());
        assert_approx(lines.chikou[0], candles[26].close, DEFAULT_EPSILON);
        assert_approx(lines.chikou[13], candles[39].close, DEFAULT_EPSILON);
        assert!(lines.chikou[14..].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn accessor_reports_undefined_as_none() {
        let lines = IchimokuSeries::compute(&rising(30), &IchimokuWindows::default());
        assert_eq!(lines.at(IchimokuLine::SpanB, 29), None);
        assert!(lines.at(IchimokuLine::Kijun, 29).is_some());
    }

    #[test]
    fn names_carry_parameters() {
        let w = IchimokuWindows::default();
        assert_eq!(Ichimoku::new(IchimokuLine::Tenkan, w).name(), "tenkan_9");
        assert_eq!(Ichimoku::new(IchimokuLine::SpanB, w).name(), "span_b_52_26");
        assert_eq!(Ichimoku::new(IchimokuLine::Chikou, w).name(), "chikou_26");
    }

    #[test]
    fn full_history_default_is_80() {
        assert_eq!(IchimokuWindows::default().full_history(), 80);
    }

    #[test]
    fn first_zero_window_is_named() {
        let mut w = IchimokuWindows::default();
        assert_eq!(w.first_zero(), None);
        w.kijun = 0;
        assert_eq!(w.first_zero(), Some("kijun"));
    }
}
