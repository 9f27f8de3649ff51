//! Integration tests for the evaluation loop.
//!
//! Tests:
//! 1. Rising series replayed tick by tick: exactly one BUY, never SELL
//! 2. Rise then fall: BUY then SELL, state follows
//! 3. Failed ticks are retried after the backoff; state untouched
//! 4. Rate-limit hints stretch the backoff
//! 5. Malformed and too-short series are failed ticks, not panics
//! 6. Tick idempotence over identical input and state
//! 7. A bounded run stops on its tick count without a trailing wait

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use kumo_core::config::BotConfig;
use kumo_core::data::{CandleFeed, FeedError};
use kumo_core::domain::{Action, Candle, CandleSeries, Interval, PositionState, SeriesError};
use kumo_core::report::{EvaluationReport, Reporter};
use kumo_runner::{run_loop, Evaluator, Schedule, Sleeper, TickErrorKind};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn series_from_closes(closes: &[f64]) -> CandleSeries {
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                open_time: start() + ChronoDuration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1_000.0,
            }
        })
        .collect();
    CandleSeries::with_interval("BTCUSDT", Interval::OneHour, candles).unwrap()
}

fn rising_closes(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

/// Serves a growing prefix of a fixed series: one more candle per successful
/// fetch, starting at `first_len`.
struct ReplayFeed {
    series: CandleSeries,
    next_len: Mutex<usize>,
}

impl ReplayFeed {
    fn new(series: CandleSeries, first_len: usize) -> Self {
        Self {
            series,
            next_len: Mutex::new(first_len),
        }
    }
}

impl CandleFeed for ReplayFeed {
    fn name(&self) -> &str {
        "replay"
    }

    fn fetch_recent_candles(
        &self,
        _symbol: &str,
        _interval: Interval,
        count: usize,
    ) -> Result<CandleSeries, FeedError> {
        let mut next = self.next_len.lock().unwrap();
        let len = (*next).min(self.series.len());
        *next += 1;
        let prefix = self.series.prefix(len);
        let skip = prefix.len().saturating_sub(count);
        Ok(CandleSeries::new(prefix.symbol(), prefix.candles()[skip..].to_vec())?)
    }
}

/// Pops one scripted result per fetch; serves the fallback once drained.
struct ScriptedFeed {
    script: Mutex<VecDeque<Result<CandleSeries, FeedError>>>,
    fallback: CandleSeries,
}

impl ScriptedFeed {
    fn new(script: Vec<Result<CandleSeries, FeedError>>, fallback: CandleSeries) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
        }
    }
}

impl CandleFeed for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_recent_candles(
        &self,
        _symbol: &str,
        _interval: Interval,
        _count: usize,
    ) -> Result<CandleSeries, FeedError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

#[derive(Clone, Default)]
struct RecordingReporter(Arc<Mutex<Vec<EvaluationReport>>>);

impl Reporter for RecordingReporter {
    fn report(&self, report: &EvaluationReport) {
        self.0.lock().unwrap().push(report.clone());
    }
}

/// Records waits and advances a simulated clock instead of sleeping.
struct RecordingSleeper {
    now: DateTime<Utc>,
    waits: Vec<Duration>,
}

impl RecordingSleeper {
    fn new() -> Self {
        Self {
            now: start(),
            waits: Vec::new(),
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.waits.push(duration);
        self.now += ChronoDuration::from_std(duration).unwrap();
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

fn evaluator(feed: impl CandleFeed + 'static, reporter: RecordingReporter) -> Evaluator {
    Evaluator::new(BotConfig::default(), Box::new(feed), Box::new(reporter))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn rising_series_buys_once() {
    let reporter = RecordingReporter::default();
    let feed = ReplayFeed::new(series_from_closes(&rising_closes(120)), 2);
    let mut evaluator = evaluator(feed, reporter.clone());
    let schedule = Schedule::from_config(evaluator.config());
    let mut sleeper = RecordingSleeper::new();

    let summary = run_loop(&mut evaluator, &schedule, &mut sleeper, Some(119));

    assert_eq!(summary.ticks, 119);
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.buys, 1);
    assert_eq!(summary.sells, 0);
    assert_eq!(summary.final_state, PositionState::Buy);

    let reports = reporter.0.lock().unwrap();
    let first_buy = reports
        .iter()
        .position(|r| r.decision.action == Action::Buy)
        .unwrap();
    // Replay starts at 2 candles; the cloud is first defined at 79.
    assert_eq!(first_buy + 2, 79);
    assert_eq!(sleeper.waits.len(), 118);
    assert!(sleeper.waits.iter().all(|w| *w == schedule.cadence));
    // Timestamps come from the sleeper's clock.
    assert_eq!(reports[1].timestamp, start() + ChronoDuration::hours(1));
}

#[test]
fn rise_then_fall_sells() {
    let mut closes = rising_closes(100);
    closes.extend((1..=100).map(|i| 199.0 - i as f64));
    let reporter = RecordingReporter::default();
    let feed = ReplayFeed::new(series_from_closes(&closes), 2);
    let mut evaluator = evaluator(feed, reporter.clone());
    let schedule = Schedule::from_config(evaluator.config());

    let summary = run_loop(&mut evaluator, &schedule, &mut RecordingSleeper::new(), Some(199));

    assert_eq!(summary.buys, 1);
    assert_eq!(summary.sells, 1);
    assert_eq!(summary.final_state, PositionState::Sell);
    let actions: Vec<Action> = reporter
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.decision.action)
        .filter(|a| a.is_trade())
        .collect();
    assert_eq!(actions, vec![Action::Buy, Action::Sell]);
}

#[test]
fn failures_back_off_and_retry() {
    let good = series_from_closes(&rising_closes(100));
    let feed = ScriptedFeed::new(
        vec![
            Err(FeedError::NetworkUnreachable("connection reset".into())),
            Err(FeedError::ResponseFormatChanged("not an array".into())),
        ],
        good,
    );
    let reporter = RecordingReporter::default();
    let mut evaluator = evaluator(feed, reporter.clone()).with_state(PositionState::Sell);
    let schedule = Schedule {
        cadence: Duration::from_secs(3600),
        backoff: Duration::from_secs(60),
    };
    let mut sleeper = RecordingSleeper::new();

    let summary = run_loop(&mut evaluator, &schedule, &mut sleeper, Some(2));

    assert_eq!(summary.failures, 2);
    assert_eq!(summary.ticks, 2);
    assert_eq!(
        sleeper.waits,
        vec![
            Duration::from_secs(60),
            Duration::from_secs(60),
            Duration::from_secs(3600)
        ]
    );
    // First success happens after the two retries.
    let reports = reporter.0.lock().unwrap();
    assert_eq!(reports[0].timestamp, start() + ChronoDuration::seconds(120));
    assert_eq!(reports[0].decision.previous_state, PositionState::Sell);
}

#[test]
fn rate_limit_extends_backoff() {
    let feed = ScriptedFeed::new(
        vec![Err(FeedError::RateLimited {
            retry_after_secs: 300,
        })],
        series_from_closes(&rising_closes(100)),
    );
    let mut evaluator = evaluator(feed, RecordingReporter::default());
    let schedule = Schedule::from_config(evaluator.config());
    let mut sleeper = RecordingSleeper::new();

    run_loop(&mut evaluator, &schedule, &mut sleeper, Some(1));

    assert_eq!(sleeper.waits, vec![Duration::from_secs(300)]);
}

#[test]
fn bad_series_fail_the_tick() {
    let one = series_from_closes(&[100.0]);
    let feed = ScriptedFeed::new(
        vec![
            Err(SeriesError::NonFinitePrice { index: 4 }.into()),
            Ok(one.clone()),
        ],
        one,
    );
    let reporter = RecordingReporter::default();
    let mut evaluator = evaluator(feed, reporter.clone()).with_state(PositionState::Buy);

    let malformed = evaluator.tick(start()).unwrap_err();
    assert_eq!(malformed.kind(), TickErrorKind::MalformedSeries);
    let short = evaluator.tick(start()).unwrap_err();
    assert_eq!(short.kind(), TickErrorKind::TooFewCandles);

    assert_eq!(evaluator.state(), PositionState::Buy);
    assert_eq!(evaluator.ticks(), 0);
    assert!(reporter.0.lock().unwrap().is_empty());
}

#[test]
fn preview_does_not_advance() {
    let series = series_from_closes(&rising_closes(100));
    let feed = ScriptedFeed::new(vec![], series);
    let reporter = RecordingReporter::default();
    let mut evaluator = evaluator(feed, reporter.clone());

    let preview = evaluator.preview(start()).unwrap();
    assert_eq!(preview.decision.action, Action::Buy);
    assert_eq!(evaluator.state(), PositionState::None);
    assert!(reporter.0.lock().unwrap().is_empty());

    let tick = evaluator.tick(start()).unwrap();
    assert_eq!(tick.tick, 1);
    assert_eq!(tick.report, preview);
    assert_eq!(evaluator.state(), PositionState::Buy);
}

#[test]
fn bounded_run_stops_without_trailing_wait() {
    let feed = ScriptedFeed::new(vec![], series_from_closes(&rising_closes(100)));
    let mut evaluator = evaluator(feed, RecordingReporter::default());
    let schedule = Schedule::from_config(evaluator.config());

    let mut sleeper = RecordingSleeper::new();
    let summary = run_loop(&mut evaluator, &schedule, &mut sleeper, Some(0));
    assert_eq!(summary.ticks, 0);
    assert!(sleeper.waits.is_empty());

    let summary = run_loop(&mut evaluator, &schedule, &mut sleeper, Some(3));
    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.buys + summary.holds, 3);
    assert_eq!(sleeper.waits, vec![schedule.cadence; 2]);
}

// ──────────────────────────────────────────────
// Properties
// ──────────────────────────────────────────────

fn arb_state() -> impl Strategy<Value = PositionState> {
    prop_oneof![
        Just(PositionState::None),
        Just(PositionState::Buy),
        Just(PositionState::Sell),
    ]
}

proptest! {
    /// Same candles and same state give the same report and next state.
    #[test]
    fn tick_is_idempotent(
        returns in prop::collection::vec(-0.03..0.03_f64, 2..120),
        state in arb_state(),
    ) {
        let mut price = 100.0;
        let closes: Vec<f64> = returns
            .iter()
            .map(|r| {
                price *= 1.0 + r;
                price
            })
            .collect();
        let series = series_from_closes(&closes);

        let run = || {
            let feed = ScriptedFeed::new(vec![], series.clone());
            let mut evaluator = evaluator(feed, RecordingReporter::default()).with_state(state);
            let tick = evaluator.tick(start()).unwrap();
            (tick.report, evaluator.state())
        };
        prop_assert_eq!(run(), run());
    }

    /// A failed tick never moves the state.
    #[test]
    fn failed_tick_preserves_state(state in arb_state()) {
        let feed = ScriptedFeed::new(
            vec![Err(FeedError::CircuitBreakerTripped)],
            series_from_closes(&rising_closes(100)),
        );
        let mut evaluator = evaluator(feed, RecordingReporter::default()).with_state(state);
        prop_assert!(evaluator.tick(start()).is_err());
        prop_assert_eq!(evaluator.state(), state);
    }
}
