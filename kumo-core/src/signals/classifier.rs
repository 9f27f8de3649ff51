//! Ichimoku signal classifier.
//!
//! Every category except the Kumo twist is read at the last *closed* candle,
//! index `len - 2`; the still-forming last candle never drives a signal.
//! The twist compares indices `len - 1` and `len - 2` to detect a crossover
//! between the two most recent cloud values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Candle;
use crate::indicators::{IchimokuLine, IchimokuSeries, IchimokuWindows};

use super::{CategoryOutcome, CategoryReading, Direction, SignalCategory, SignalCounts, SignalTag};

/// Errors that prevent any classification at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("need at least 2 candles to evaluate a closed candle, got {available}")]
    TooFewCandles { available: usize },

    #[error("indicator series length {indicators} does not match {candles} candles")]
    LengthMismatch { candles: usize, indicators: usize },
}

/// Output of one classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Index of the evaluated (last closed) candle.
    pub index: usize,
    /// Close of the evaluated candle.
    pub price: f64,
    /// One reading per category, in `SignalCategory::ALL` order.
    pub readings: Vec<CategoryReading>,
}

impl Classification {
    pub fn tags(&self) -> Vec<SignalTag> {
        self.readings.iter().filter_map(|r| r.tag()).collect()
    }

    pub fn counts(&self) -> SignalCounts {
        SignalCounts::from_tags(&self.tags())
    }

    /// Categories skipped for lack of history.
    pub fn unavailable(&self) -> Vec<SignalCategory> {
        self.readings
            .iter()
            .filter(|r| r.outcome == CategoryOutcome::InsufficientHistory)
            .map(|r| r.category)
            .collect()
    }

    pub fn reading(&self, category: SignalCategory) -> Option<&CategoryReading> {
        self.readings.iter().find(|r| r.category == category)
    }
}

/// Stateless classifier parameterised by the Ichimoku windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalClassifier {
    windows: IchimokuWindows,
}

impl SignalClassifier {
    pub fn new(windows: IchimokuWindows) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &IchimokuWindows {
        &self.windows
    }

    /// Compute the Ichimoku lines for `candles` and classify them.
    pub fn evaluate(
        &self,
        candles: &[Candle],
    ) -> Result<(IchimokuSeries, Classification), ClassifyError> {
        let lines = IchimokuSeries::compute(candles, &self.windows);
        let classification = self.classify(candles, &lines)?;
        Ok((lines, classification))
    }

    /// Classify precomputed lines against the candles they came from.
    pub fn classify(
        &self,
        candles: &[Candle],
        lines: &IchimokuSeries,
    ) -> Result<Classification, ClassifyError> {
        let len = candles.len();
        if len < 2 {
            return Err(ClassifyError::TooFewCandles { available: len });
        }
        if lines.len() != len {
            return Err(ClassifyError::LengthMismatch {
                candles: len,
                indicators: lines.len(),
            });
        }

        let index = len - 2;
        let price = candles[index].close;

        let readings = SignalCategory::ALL
            .iter()
            .map(|&category| CategoryReading {
                category,
                outcome: self.read(category, candles, lines, index, price),
            })
            .collect();

        Ok(Classification {
            index,
            price,
            readings,
        })
    }

    fn read(
        &self,
        category: SignalCategory,
        candles: &[Candle],
        lines: &IchimokuSeries,
        index: usize,
        price: f64,
    ) -> CategoryOutcome {
        let at = |line| lines.at(line, index);
        let outcome = match category {
            SignalCategory::TkCross => at(IchimokuLine::Tenkan)
                .zip(at(IchimokuLine::Kijun))
                .map(|(tenkan, kijun)| compare(tenkan, kijun)),
            SignalCategory::KumoBreakout => at(IchimokuLine::SpanA)
                .zip(at(IchimokuLine::SpanB))
                .map(|(a, b)| {
                    if price > a && price > b {
                        CategoryOutcome::Fired(Direction::Bullish)
                    } else if price < a && price < b {
                        CategoryOutcome::Fired(Direction::Bearish)
                    } else {
                        CategoryOutcome::NoSignal
                    }
                }),
            SignalCategory::KijunCross => {
                at(IchimokuLine::Kijun).map(|kijun| compare(price, kijun))
            }
            // Only a missing reference close counts as short history. Chikou at
            // `len-2` is in the future and leaves the category quiet.
            SignalCategory::ChikouBreakout => index.checked_sub(self.windows.shift).map(|past| {
                at(IchimokuLine::Chikou)
                    .map_or(CategoryOutcome::NoSignal, |chikou| {
                        compare(chikou, candles[past].close)
                    })
            }),
            SignalCategory::KumoTwist => {
                let latest = index + 1;
                let a_now = lines.at(IchimokuLine::SpanA, latest);
                let b_now = lines.at(IchimokuLine::SpanB, latest);
                let a_prev = at(IchimokuLine::SpanA);
                let b_prev = at(IchimokuLine::SpanB);
                match (a_now, b_now, a_prev, b_prev) {
                    (Some(a1), Some(b1), Some(a0), Some(b0)) => Some(twist(a1, b1, a0, b0)),
                    _ => None,
                }
            }
        };
        outcome.unwrap_or(CategoryOutcome::InsufficientHistory)
    }
}

fn compare(subject: f64, reference: f64) -> CategoryOutcome {
    if subject > reference {
        CategoryOutcome::Fired(Direction::Bullish)
    } else if subject < reference {
        CategoryOutcome::Fired(Direction::Bearish)
    } else {
        CategoryOutcome::NoSignal
    }
}

fn twist(a_now: f64, b_now: f64, a_prev: f64, b_prev: f64) -> CategoryOutcome {
    if a_now > b_now && a_prev <= b_prev {
        CategoryOutcome::Fired(Direction::Bullish)
    } else if a_now < b_now && a_prev >= b_prev {
        CategoryOutcome::Fired(Direction::Bearish)
    } else {
        CategoryOutcome::NoSignal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    fn lines_of(len: usize) -> IchimokuSeries {
        IchimokuSeries {
            tenkan: vec![f64::NAN; len],
            kijun: vec![f64::NAN; len],
            span_a: vec![f64::NAN; len],
            span_b: vec![f64::NAN; len],
            chikou: vec![f64::NAN; len],
        }
    }

    fn outcome(c: &Classification, category: SignalCategory) -> CategoryOutcome {
        c.reading(category).unwrap().outcome
    }

    #[test]
    fn rejects_single_candle() {
        let candles = make_candles(&[100.0]);
        let err = SignalClassifier::default()
            .classify(&candles, &lines_of(1))
            .unwrap_err();
        assert_eq!(err, ClassifyError::TooFewCandles { available: 1 });
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let candles = make_candles(&[100.0, 101.0, 102.0]);
        let err = SignalClassifier::default()
            .classify(&candles, &lines_of(2))
            .unwrap_err();
        assert!(matches!(err, ClassifyError::LengthMismatch { .. }));
    }

    #[test]
    fn evaluates_last_closed_candle() {
        let candles = make_candles(&[100.0, 101.0, 102.0, 250.0]);
        let mut lines = lines_of(4);
        lines.kijun[2] = 101.5;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(c.index, 2);
        assert_eq!(c.price, 102.0);
        assert_eq!(
            outcome(&c, SignalCategory::KijunCross),
            CategoryOutcome::Fired(Direction::Bullish)
        );
    }

    #[test]
    fn tk_cross_tie_gives_no_tag() {
        let candles = make_candles(&[100.0, 100.0, 100.0]);
        let mut lines = lines_of(3);
        lines.tenkan[1] = 100.0;
        lines.kijun[1] = 100.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(outcome(&c, SignalCategory::TkCross), CategoryOutcome::NoSignal);
        assert!(c.tags().is_empty());
    }

    #[test]
    fn price_inside_cloud_gives_no_tag() {
        let candles = make_candles(&[100.0, 100.0, 100.0]);
        let mut lines = lines_of(3);
        lines.span_a[1] = 95.0;
        lines.span_b[1] = 105.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(outcome(&c, SignalCategory::KumoBreakout), CategoryOutcome::NoSignal);
    }

    #[test]
    fn price_below_cloud_is_bearish() {
        let candles = make_candles(&[100.0, 90.0, 100.0]);
        let mut lines = lines_of(3);
        lines.span_a[1] = 95.0;
        lines.span_b[1] = 105.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(
            outcome(&c, SignalCategory::KumoBreakout),
            CategoryOutcome::Fired(Direction::Bearish)
        );
    }

    #[test]
    fn chikou_compares_against_close_shift_periods_back() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let candles = make_candles(&closes);
        let mut lines = lines_of(30);
        // index = 28; past = 28 - 26 = 2, close[2] = 102
        lines.chikou[28] = 101.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(
            outcome(&c, SignalCategory::ChikouBreakout),
            CategoryOutcome::Fired(Direction::Bearish)
        );
    }

    #[test]
    fn undefined_chikou_with_reference_close_is_quiet() {
        let candles = make_candles(&[100.0; 30]);
        let lines = lines_of(30);
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(
            outcome(&c, SignalCategory::ChikouBreakout),
            CategoryOutcome::NoSignal
        );
        assert!(!c.unavailable().contains(&SignalCategory::ChikouBreakout));
    }

    #[test]
    fn full_fetch_reads_chikou_as_no_signal() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let candles = make_candles(&closes);
        let (_, c) = SignalClassifier::default().evaluate(&candles).unwrap();
        assert_eq!(
            outcome(&c, SignalCategory::ChikouBreakout),
            CategoryOutcome::NoSignal
        );
        assert!(c.unavailable().is_empty());
    }

    #[test]
    fn chikou_without_reference_close_is_skipped() {
        let candles = make_candles(&[100.0; 20]);
        let mut lines = lines_of(20);
        lines.chikou[18] = 101.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(
            outcome(&c, SignalCategory::ChikouBreakout),
            CategoryOutcome::InsufficientHistory
        );
        assert_eq!(c.unavailable(), vec![
            SignalCategory::TkCross,
            SignalCategory::KumoBreakout,
            SignalCategory::KijunCross,
            SignalCategory::ChikouBreakout,
            SignalCategory::KumoTwist,
        ]);
    }

    #[test]
    fn twist_uses_two_most_recent_indices() {
        let candles = make_candles(&[100.0, 100.0, 100.0]);
        let mut lines = lines_of(3);
        lines.span_a[1] = 99.0;
        lines.span_b[1] = 100.0;
        lines.span_a[2] = 101.0;
        lines.span_b[2] = 100.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(
            outcome(&c, SignalCategory::KumoTwist),
            CategoryOutcome::Fired(Direction::Bullish)
        );

        lines.span_a[1] = 100.0;
        lines.span_a[2] = 99.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(
            outcome(&c, SignalCategory::KumoTwist),
            CategoryOutcome::Fired(Direction::Bearish)
        );
    }

    #[test]
    fn twist_without_crossover_is_no_signal() {
        let candles = make_candles(&[100.0, 100.0, 100.0]);
        let mut lines = lines_of(3);
        lines.span_a[1] = 101.0;
        lines.span_b[1] = 100.0;
        lines.span_a[2] = 102.0;
        lines.span_b[2] = 100.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(outcome(&c, SignalCategory::KumoTwist), CategoryOutcome::NoSignal);
    }

    #[test]
    fn counts_follow_tags() {
        let candles = make_candles(&[100.0, 110.0, 100.0]);
        let mut lines = lines_of(3);
        lines.tenkan[1] = 105.0;
        lines.kijun[1] = 104.0;
        lines.span_a[1] = 90.0;
        lines.span_b[1] = 95.0;
        let c = SignalClassifier::default().classify(&candles, &lines).unwrap();
        assert_eq!(
            c.tags(),
            vec![
                SignalTag::TkBullish,
                SignalTag::KumoBullish,
                SignalTag::KijunBullish
            ]
        );
        assert_eq!(c.counts(), SignalCounts::new(3, 0));
    }
}
