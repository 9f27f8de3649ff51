//! Evaluator: one fetch → classify → decide → report cycle per tick.
//!
//! The evaluator is the single owner of the position state. A tick either
//! succeeds completely (report emitted, state advanced) or fails with a
//! `TickError` and leaves the state exactly as it was.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use kumo_core::config::BotConfig;
use kumo_core::data::{CandleFeed, FeedError};
use kumo_core::decision::DecisionEngine;
use kumo_core::domain::PositionState;
use kumo_core::report::{EvaluationReport, Reporter};
use kumo_core::signals::{ClassifyError, SignalClassifier};

/// Errors that abandon a tick.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("data unavailable: {0}")]
    Feed(#[from] FeedError),

    #[error("cannot classify candles: {0}")]
    Classify(#[from] ClassifyError),
}

/// Coarse failure class, for logs and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickErrorKind {
    /// Fetch failed: network, rate limit, provider response, circuit breaker.
    DataUnavailable,
    /// Candles arrived but the series was rejected.
    MalformedSeries,
    /// Fewer than two candles; no closed candle to evaluate.
    TooFewCandles,
}

impl TickError {
    pub fn kind(&self) -> TickErrorKind {
        match self {
            TickError::Feed(e) if e.is_malformed() => TickErrorKind::MalformedSeries,
            TickError::Feed(_) => TickErrorKind::DataUnavailable,
            TickError::Classify(_) => TickErrorKind::TooFewCandles,
        }
    }

    /// Minimum wait requested by the provider, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TickError::Feed(FeedError::RateLimited { retry_after_secs }) => {
                Some(Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}

/// A successful tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based count of successful ticks.
    pub tick: u64,
    pub report: EvaluationReport,
}

pub struct Evaluator {
    config: BotConfig,
    feed: Box<dyn CandleFeed>,
    reporter: Box<dyn Reporter>,
    classifier: SignalClassifier,
    engine: DecisionEngine,
    state: PositionState,
    ticks: u64,
}

impl Evaluator {
    pub fn new(config: BotConfig, feed: Box<dyn CandleFeed>, reporter: Box<dyn Reporter>) -> Self {
        let classifier = SignalClassifier::new(config.windows);
        let engine = DecisionEngine::new(config.thresholds);
        Self {
            config,
            feed,
            reporter,
            classifier,
            engine,
            state: PositionState::None,
            ticks: 0,
        }
    }

    /// Start from a known position instead of `None`.
    pub fn with_state(mut self, state: PositionState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn feed_name(&self) -> &str {
        self.feed.name()
    }

    /// Evaluate against the current state without reporting or advancing it.
    pub fn preview(&self, now: DateTime<Utc>) -> Result<EvaluationReport, TickError> {
        if !self.feed.is_available() {
            return Err(FeedError::CircuitBreakerTripped.into());
        }
        let series = self.feed.fetch_recent_candles(
            &self.config.symbol,
            self.config.interval,
            self.config.candle_limit,
        )?;
        let (_, classification) = self.classifier.evaluate(series.candles())?;
        let candle = series
            .candles()
            .get(classification.index)
            .ok_or(ClassifyError::TooFewCandles {
                available: series.len(),
            })?;

        let counts = classification.counts();
        let decision = self.engine.decide(self.state, counts);
        tracing::debug!(
            symbol = series.symbol(),
            candles = series.len(),
            unavailable = classification.unavailable().len(),
            "classified"
        );

        Ok(EvaluationReport {
            timestamp: now,
            symbol: series.symbol().to_string(),
            candle_time: candle.open_time,
            price: classification.price,
            tags: classification.tags(),
            readings: classification.readings,
            counts,
            thresholds: *self.engine.thresholds(),
            decision,
        })
    }

    /// Run one evaluation. The state transition is applied only after the
    /// report has been emitted.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, TickError> {
        let report = self.preview(now)?;
        self.reporter.report(&report);
        self.state = report.decision.next_state;
        self.ticks += 1;
        Ok(TickReport {
            tick: self.ticks,
            report,
        })
    }
}
