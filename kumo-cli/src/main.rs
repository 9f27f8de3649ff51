//! Kumo CLI: run the signal bot, evaluate once, and register users.
//!
//! Commands:
//! - `run`: evaluate every cadence tick and report BUY/SELL/HOLD
//! - `evaluate`: fetch and classify once, without advancing any state
//! - `register`: interactive registration over stdin
//! - `confirm`: start the bot for the most recently registered profile
//! - `config`: validate a config file and print the effective settings

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking;
use tracing_subscriber::{prelude::*, EnvFilter};

use kumo_core::config::{BotConfig, FeedKind};
use kumo_core::data::{BinanceFeed, CandleFeed, CircuitBreaker, SyntheticFeed};
use kumo_core::domain::Interval;
use kumo_core::registration::{ProfileStore, Reply, SessionStore};
use kumo_core::report::{CompositeReporter, CsvSignalLog, Reporter, TracingReporter};
use kumo_runner::{run_loop, Evaluator, Schedule, ThreadSleeper};

const DEFAULT_CONFIG: &str = "kumo.toml";

#[derive(Parser)]
#[command(name = "kumo", about = "Kumo: Ichimoku BUY/SELL/HOLD signal bot (signal only)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the commands that evaluate candles.
#[derive(clap::Args)]
struct BotArgs {
    /// Path to a TOML config file. Defaults to ./kumo.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the traded symbol (e.g. ETHUSDT).
    #[arg(long)]
    symbol: Option<String>,

    /// Override the candle interval (1m, 5m, 15m, 30m, 1h, 4h, 1d).
    #[arg(long)]
    interval: Option<Interval>,

    /// Override the seconds between evaluations.
    #[arg(long)]
    cadence_seconds: Option<u64>,

    /// Use the offline synthetic feed instead of Binance.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Append one CSV row per evaluation to this file.
    #[arg(long)]
    signal_log: Option<PathBuf>,

    /// Also write log output to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every cadence tick until stopped.
    Run {
        #[command(flatten)]
        bot: BotArgs,

        /// Stop after this many successful ticks.
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Fetch and classify once; position state starts at NONE.
    Evaluate {
        #[command(flatten)]
        bot: BotArgs,

        /// Print the evaluation as JSON instead of log lines.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Register interactively over stdin.
    Register {
        /// Directory for saved profiles.
        #[arg(long, default_value = "profiles")]
        profile_dir: PathBuf,
    },
    /// Start the bot for the most recently registered profile.
    Confirm {
        #[command(flatten)]
        bot: BotArgs,

        /// Directory for saved profiles.
        #[arg(long, default_value = "profiles")]
        profile_dir: PathBuf,

        /// Stop after this many successful ticks.
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Validate a config file and print the effective settings.
    Config {
        /// Path to a TOML config file. Defaults to ./kumo.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { bot, max_ticks } => {
            let config = load_config(&bot)?;
            init_tracing(log_file(&bot, &config))?;
            run_bot(config, max_ticks)
        }
        Commands::Evaluate { bot, json } => {
            let config = load_config(&bot)?;
            init_tracing(log_file(&bot, &config))?;
            run_evaluate(config, json)
        }
        Commands::Register { profile_dir } => {
            init_tracing(None)?;
            run_register(&profile_dir)
        }
        Commands::Confirm {
            bot,
            profile_dir,
            max_ticks,
        } => {
            let store = ProfileStore::new(&profile_dir);
            let profile = store
                .latest()?
                .ok_or_else(|| anyhow!("no registered profile in {}", profile_dir.display()))?;
            let mut config = if bot.config.is_some() || Path::new(DEFAULT_CONFIG).exists() {
                load_config(&bot)?
            } else {
                BotConfig::from_profile(&profile)
            };
            config.symbol = bot.symbol.clone().unwrap_or_else(|| profile.trading_pair());
            apply_overrides(&mut config, &bot)?;
            init_tracing(log_file(&bot, &config))?;
            tracing::info!(user_id = %profile.user_id, coin = %profile.coin, "confirmed profile");
            run_bot(config, max_ticks)
        }
        Commands::Config { config } => run_config(config),
    }
}

fn init_tracing(log_file: Option<PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let (writer, guard) = non_blocking(file);
        // The writer must outlive every log call; keep the guard for the process lifetime.
        let _guard = Box::leak(Box::new(guard));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stdout_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}

fn log_file(bot: &BotArgs, config: &BotConfig) -> Option<PathBuf> {
    bot.log_file.clone().or_else(|| config.report.log_file.clone())
}

fn read_config(path: Option<&Path>) -> Result<BotConfig> {
    match path {
        Some(path) => BotConfig::from_file(path)
            .with_context(|| format!("invalid config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            BotConfig::from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("invalid config {DEFAULT_CONFIG}"))
        }
        None => Ok(BotConfig::default()),
    }
}

fn load_config(bot: &BotArgs) -> Result<BotConfig> {
    let mut config = read_config(bot.config.as_deref())?;
    if let Some(symbol) = &bot.symbol {
        config.symbol = symbol.clone();
    }
    apply_overrides(&mut config, bot)?;
    Ok(config)
}

fn apply_overrides(config: &mut BotConfig, bot: &BotArgs) -> Result<()> {
    config.symbol = config.symbol.trim().to_uppercase();
    if let Some(interval) = bot.interval {
        config.interval = interval;
    }
    if let Some(cadence) = bot.cadence_seconds {
        config.cadence_seconds = cadence;
    }
    if bot.synthetic {
        config.feed.kind = FeedKind::Synthetic;
    }
    if let Some(path) = &bot.signal_log {
        config.report.signal_log = Some(path.clone());
    }
    config.validate().context("invalid configuration")?;
    Ok(())
}

fn build_feed(config: &BotConfig) -> Result<Box<dyn CandleFeed>> {
    match config.feed.kind {
        FeedKind::Binance => {
            let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
            let feed = BinanceFeed::new(
                config.feed.base_url.as_str(),
                Duration::from_secs(config.feed.timeout_seconds),
                circuit_breaker,
            )?
            .with_max_retries(config.feed.max_retries);
            Ok(Box::new(feed))
        }
        FeedKind::Synthetic => Ok(Box::new(SyntheticFeed::new(config.feed.seed))),
    }
}

fn build_reporter(config: &BotConfig) -> Box<dyn Reporter> {
    let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(TracingReporter::new())];
    if let Some(path) = &config.report.signal_log {
        reporters.push(Box::new(CsvSignalLog::new(path)));
    }
    Box::new(CompositeReporter::new(reporters))
}

fn log_banner(config: &BotConfig, feed: &str) {
    tracing::info!("==================== kumo signal bot ====================");
    tracing::info!("signal only: this bot never places orders");
    tracing::info!(
        symbol = %config.symbol,
        interval = %config.interval,
        feed,
        cadence_secs = config.cadence_seconds,
        bullish_threshold = config.thresholds.bullish,
        bearish_threshold = config.thresholds.bearish,
        fingerprint = %config.fingerprint(),
        "configuration"
    );
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }
}

fn run_bot(config: BotConfig, max_ticks: Option<u64>) -> Result<()> {
    let feed = build_feed(&config)?;
    let reporter = build_reporter(&config);
    let schedule = Schedule::from_config(&config);
    let mut evaluator = Evaluator::new(config, feed, reporter);
    log_banner(evaluator.config(), evaluator.feed_name());

    let summary = run_loop(&mut evaluator, &schedule, &mut ThreadSleeper, max_ticks);

    println!(
        "ticks: {}  failures: {}  buys: {}  sells: {}  holds: {}  final state: {}",
        summary.ticks,
        summary.failures,
        summary.buys,
        summary.sells,
        summary.holds,
        summary.final_state
    );
    Ok(())
}

fn run_evaluate(config: BotConfig, json: bool) -> Result<()> {
    let feed = build_feed(&config)?;
    let evaluator = Evaluator::new(config, feed, Box::new(TracingReporter::new()));
    if !json {
        log_banner(evaluator.config(), evaluator.feed_name());
    }
    let report = evaluator
        .preview(Utc::now())
        .with_context(|| format!("evaluation failed for {}", evaluator.config().symbol))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        TracingReporter::new().report(&report);
    }
    Ok(())
}

fn run_register(profile_dir: &Path) -> Result<()> {
    let store = ProfileStore::new(profile_dir);
    let mut sessions = SessionStore::default();
    let id = "stdin";

    println!("{}", sessions.start(id, Utc::now()).message());
    for line in std::io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let now = Utc::now();
        let reply = if line.trim().eq_ignore_ascii_case("confirm") {
            sessions.confirm(&id, now)
        } else {
            sessions.handle(&id, &line, now)
        };

        match &reply {
            Reply::Completed(profile) => {
                let path = store.save(profile)?;
                println!("{}", reply.message());
                println!("Profile written to {}", path.display());
            }
            Reply::Confirmed(_) => {
                println!("{}", reply.message());
                println!(
                    "Start it with: kumo confirm --profile-dir {}",
                    profile_dir.display()
                );
                return Ok(());
            }
            Reply::Expired | Reply::NoSession => bail!("{}", reply.message()),
            Reply::Prompt(_) | Reply::Invalid { .. } => println!("{}", reply.message()),
        }
    }
    bail!("input ended before registration was confirmed")
}

fn run_config(path: Option<PathBuf>) -> Result<()> {
    let config = read_config(path.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    println!("fingerprint: {}", config.fingerprint());
    for warning in config.warnings() {
        println!("warning: {warning}");
    }
    Ok(())
}
