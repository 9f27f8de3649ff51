//! Log-line reporter.
//!
//! One line per category check, then price, tags, counts, and the action,
//! all through `tracing` so the subscriber decides where they land.

use crate::domain::{Action, PositionState};
use crate::signals::{CategoryOutcome, CategoryReading};

use super::{EvaluationReport, Reporter};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for TracingReporter {
    fn report(&self, report: &EvaluationReport) {
        let symbol = report.symbol.as_str();
        for reading in &report.readings {
            log_reading(symbol, reading);
        }

        let tags: Vec<&str> = report.tags.iter().map(|t| t.as_str()).collect();
        tracing::info!(
            symbol,
            price = report.price,
            candle = %report.candle_time,
            "evaluated price"
        );
        tracing::info!(symbol, ?tags, "signals");
        tracing::info!(
            symbol,
            bullish = report.counts.bullish,
            bearish = report.counts.bearish,
            last_action = %report.decision.previous_state,
            "signal counts"
        );

        let decision = &report.decision;
        match decision.action {
            Action::Buy | Action::Sell => tracing::info!(
                symbol,
                action = %decision.action,
                state = %decision.next_state,
                "signal {} at {:.2} (signal only, no order placed)",
                decision.action,
                report.price
            ),
            Action::Hold => {
                let (side, have, need) = match decision.previous_state {
                    PositionState::Buy => {
                        ("bearish", report.counts.bearish, report.thresholds.bearish)
                    }
                    PositionState::None | PositionState::Sell => {
                        ("bullish", report.counts.bullish, report.thresholds.bullish)
                    }
                };
                tracing::info!(
                    symbol,
                    action = %decision.action,
                    state = %decision.next_state,
                    "HOLD: not enough {side} signals ({have}/{need})"
                );
            }
        }
    }
}

fn log_reading(symbol: &str, reading: &CategoryReading) {
    let label = reading.category.label();
    match reading.outcome {
        CategoryOutcome::Fired(direction) => {
            tracing::info!(symbol, category = label, ?direction, "{label}: {direction:?}")
        }
        CategoryOutcome::NoSignal => tracing::info!(symbol, category = label, "{label}: no signal"),
        CategoryOutcome::InsufficientHistory => {
            tracing::warn!(symbol, category = label, "{label}: not enough data, skipped")
        }
    }
}
