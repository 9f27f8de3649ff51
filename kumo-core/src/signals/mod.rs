//! Signal classification: turns Ichimoku lines into directional tags.
//!
//! Five categories, each yielding at most one tag per evaluation. A category
//! whose inputs are not yet defined is reported as insufficient history and
//! contributes nothing; it never fails the evaluation.

pub mod classifier;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use classifier::{Classification, ClassifyError, SignalClassifier};

/// Direction of a fired signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
}

/// The five signal categories, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    /// Tenkan vs Kijun.
    TkCross,
    /// Price vs both cloud boundaries.
    KumoBreakout,
    /// Price vs Kijun.
    KijunCross,
    /// Chikou vs the close `shift` periods earlier.
    ChikouBreakout,
    /// Span A crossing Span B between the two most recent candles.
    KumoTwist,
}

impl SignalCategory {
    pub const ALL: [SignalCategory; 5] = [
        SignalCategory::TkCross,
        SignalCategory::KumoBreakout,
        SignalCategory::KijunCross,
        SignalCategory::ChikouBreakout,
        SignalCategory::KumoTwist,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SignalCategory::TkCross => "TK Cross",
            SignalCategory::KumoBreakout => "Kumo Breakout",
            SignalCategory::KijunCross => "Kijun Cross",
            SignalCategory::ChikouBreakout => "Chikou Breakout",
            SignalCategory::KumoTwist => "Kumo Twist",
        }
    }
}

/// Closed vocabulary of signal tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTag {
    TkBullish,
    TkBearish,
    KumoBullish,
    KumoBearish,
    KijunBullish,
    KijunBearish,
    ChikouBullish,
    ChikouBearish,
    TwistBullish,
    TwistBearish,
}

impl SignalTag {
    pub fn new(category: SignalCategory, direction: Direction) -> Self {
        use Direction::*;
        use SignalCategory::*;
        match (category, direction) {
            (TkCross, Bullish) => SignalTag::TkBullish,
            (TkCross, Bearish) => SignalTag::TkBearish,
            (KumoBreakout, Bullish) => SignalTag::KumoBullish,
            (KumoBreakout, Bearish) => SignalTag::KumoBearish,
            (KijunCross, Bullish) => SignalTag::KijunBullish,
            (KijunCross, Bearish) => SignalTag::KijunBearish,
            (ChikouBreakout, Bullish) => SignalTag::ChikouBullish,
            (ChikouBreakout, Bearish) => SignalTag::ChikouBearish,
            (KumoTwist, Bullish) => SignalTag::TwistBullish,
            (KumoTwist, Bearish) => SignalTag::TwistBearish,
        }
    }

    pub fn category(&self) -> SignalCategory {
        match self {
            SignalTag::TkBullish | SignalTag::TkBearish => SignalCategory::TkCross,
            SignalTag::KumoBullish | SignalTag::KumoBearish => SignalCategory::KumoBreakout,
            SignalTag::KijunBullish | SignalTag::KijunBearish => SignalCategory::KijunCross,
            SignalTag::ChikouBullish | SignalTag::ChikouBearish => SignalCategory::ChikouBreakout,
            SignalTag::TwistBullish | SignalTag::TwistBearish => SignalCategory::KumoTwist,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            SignalTag::TkBullish
            | SignalTag::KumoBullish
            | SignalTag::KijunBullish
            | SignalTag::ChikouBullish
            | SignalTag::TwistBullish => Direction::Bullish,
            _ => Direction::Bearish,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalTag::TkBullish => "tk_bullish",
            SignalTag::TkBearish => "tk_bearish",
            SignalTag::KumoBullish => "kumo_bullish",
            SignalTag::KumoBearish => "kumo_bearish",
            SignalTag::KijunBullish => "kijun_bullish",
            SignalTag::KijunBearish => "kijun_bearish",
            SignalTag::ChikouBullish => "chikou_bullish",
            SignalTag::ChikouBearish => "chikou_bearish",
            SignalTag::TwistBullish => "twist_bullish",
            SignalTag::TwistBearish => "twist_bearish",
        }
    }
}

impl fmt::Display for SignalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "direction", rename_all = "snake_case")]
pub enum CategoryOutcome {
    Fired(Direction),
    /// Inputs defined but tied (or inside the cloud, or no crossover).
    NoSignal,
    /// A required value is not defined yet; the category is skipped.
    InsufficientHistory,
}

/// One category's outcome within a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryReading {
    pub category: SignalCategory,
    pub outcome: CategoryOutcome,
}

impl CategoryReading {
    pub fn tag(&self) -> Option<SignalTag> {
        match self.outcome {
            CategoryOutcome::Fired(direction) => Some(SignalTag::new(self.category, direction)),
            _ => None,
        }
    }
}

/// Bullish and bearish tag counts fed to the decision engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalCounts {
    pub bullish: usize,
    pub bearish: usize,
}

impl SignalCounts {
    pub fn new(bullish: usize, bearish: usize) -> Self {
        Self { bullish, bearish }
    }

    pub fn from_tags(tags: &[SignalTag]) -> Self {
        tags.iter().fold(Self::default(), |mut counts, tag| {
            match tag.direction() {
                Direction::Bullish => counts.bullish += 1,
                Direction::Bearish => counts.bearish += 1,
            }
            counts
        })
    }
}
