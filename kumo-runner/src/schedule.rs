//! Cadence loop: runs ticks forever (or up to a bound), sleeping a full
//! cadence after a success and a backoff after a failure.
//!
//! A failed tick is retried as the same tick: the success counter and the
//! position state only move when a tick succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use kumo_core::config::BotConfig;
use kumo_core::domain::{Action, PositionState};

use crate::evaluator::Evaluator;

/// Wait policy between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Wait after a successful tick.
    pub cadence: Duration,
    /// Wait before retrying a failed tick.
    pub backoff: Duration,
}

impl Schedule {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            cadence: Duration::from_secs(config.cadence_seconds),
            backoff: Duration::from_secs(config.retry_backoff_seconds),
        }
    }
}

/// Time source the loop waits on.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Real sleeper: blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// What a loop run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSummary {
    pub ticks: u64,
    pub failures: u64,
    pub buys: u64,
    pub sells: u64,
    pub holds: u64,
    pub final_state: PositionState,
}

/// Run ticks until `max_ticks` successful ticks; unbounded when `None`, in
/// which case only the process ending stops it.
///
/// No wait follows the last bounded tick.
pub fn run_loop(
    evaluator: &mut Evaluator,
    schedule: &Schedule,
    sleeper: &mut dyn Sleeper,
    max_ticks: Option<u64>,
) -> LoopSummary {
    let mut summary = LoopSummary {
        final_state: evaluator.state(),
        ..LoopSummary::default()
    };

    loop {
        if max_ticks.is_some_and(|max| summary.ticks >= max) {
            break;
        }

        match evaluator.tick(sleeper.now()) {
            Ok(tick) => {
                summary.ticks += 1;
                match tick.report.decision.action {
                    Action::Buy => summary.buys += 1,
                    Action::Sell => summary.sells += 1,
                    Action::Hold => summary.holds += 1,
                }
                summary.final_state = evaluator.state();
                if max_ticks.is_some_and(|max| summary.ticks >= max) {
                    break;
                }
                tracing::debug!(seconds = schedule.cadence.as_secs(), "waiting for next candle");
                sleeper.sleep(schedule.cadence);
            }
            Err(e) => {
                summary.failures += 1;
                let wait = e
                    .retry_after()
                    .map_or(schedule.backoff, |after| after.max(schedule.backoff));
                tracing::warn!(
                    kind = ?e.kind(),
                    error = %e,
                    retry_in_secs = wait.as_secs(),
                    state = %evaluator.state(),
                    "tick failed; retrying"
                );
                sleeper.sleep(wait);
            }
        }
    }

    tracing::info!(
        ticks = summary.ticks,
        failures = summary.failures,
        buys = summary.buys,
        sells = summary.sells,
        state = %summary.final_state,
        "evaluation loop stopped"
    );
    summary
}
