//! Evaluation reporting: where each tick's outcome goes.
//!
//! Reporters are fire-and-forget: the evaluation loop never consumes a result
//! from them, so a reporter that fails (e.g. a full disk) logs the failure
//! itself and carries on.

pub mod csv_log;
pub mod log;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::{Decision, Thresholds};
use crate::signals::{CategoryReading, SignalCounts, SignalTag};

pub use csv_log::CsvSignalLog;
pub use log::TracingReporter;

/// Everything known about one successful evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Wall-clock time of the evaluation.
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    /// Open time of the evaluated (last closed) candle.
    pub candle_time: DateTime<Utc>,
    /// Close of the evaluated candle.
    pub price: f64,
    pub readings: Vec<CategoryReading>,
    pub tags: Vec<SignalTag>,
    pub counts: SignalCounts,
    pub thresholds: Thresholds,
    pub decision: Decision,
}

/// Sink for evaluation reports.
pub trait Reporter: Send + Sync {
    fn report(&self, report: &EvaluationReport);
}

/// Fans each report out to several reporters, in order.
pub struct CompositeReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl CompositeReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl Reporter for CompositeReporter {
    fn report(&self, report: &EvaluationReport) {
        for reporter in &self.reporters {
            reporter.report(report);
        }
    }
}
