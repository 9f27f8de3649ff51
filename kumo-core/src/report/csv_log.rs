//! Append-only CSV signal log, one row per evaluation.

use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use super::{EvaluationReport, Reporter};

#[derive(Debug, Serialize)]
struct Row<'a> {
    timestamp: String,
    symbol: &'a str,
    candle_time: String,
    price: f64,
    tags: String,
    bullish: usize,
    bearish: usize,
    action: &'static str,
    state: &'static str,
}

impl<'a> From<&'a EvaluationReport> for Row<'a> {
    fn from(report: &'a EvaluationReport) -> Self {
        Row {
            timestamp: report.timestamp.to_rfc3339(),
            symbol: &report.symbol,
            candle_time: report.candle_time.to_rfc3339(),
            price: report.price,
            tags: report
                .tags
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            bullish: report.counts.bullish,
            bearish: report.counts.bearish,
            action: report.decision.action.as_str(),
            state: report.decision.next_state.as_str(),
        }
    }
}

/// Appends evaluation rows to a CSV file, writing the header for a new file.
#[derive(Debug, Clone)]
pub struct CsvSignalLog {
    path: PathBuf,
}

impl CsvSignalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, creating the file (and parent directories) if needed.
    pub fn append(&self, report: &EvaluationReport) -> Result<(), csv::Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(Row::from(report))?;
        writer.flush()?;
        Ok(())
    }
}

impl Reporter for CsvSignalLog {
    fn report(&self, report: &EvaluationReport) {
        if let Err(e) = self.append(report) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "failed to append signal log row"
            );
        }
    }
}
