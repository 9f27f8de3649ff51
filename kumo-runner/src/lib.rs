//! Kumo Runner: the evaluation loop.
//!
//! This crate builds on `kumo-core` to provide:
//! - `Evaluator`: owns the position state and runs one tick at a time
//! - `Schedule` and `Sleeper`: explicit cadence and backoff policy
//! - `run_loop`: the long-running bot loop with optionally bounded runs

pub mod evaluator;
pub mod schedule;

pub use evaluator::{Evaluator, TickError, TickErrorKind, TickReport};
pub use schedule::{run_loop, LoopSummary, Schedule, Sleeper, ThreadSleeper};
