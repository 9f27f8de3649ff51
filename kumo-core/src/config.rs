//! Bot configuration.
//!
//! Loaded from TOML; every key has a default so an empty file is a valid
//! configuration. Validation runs once at startup and is fatal: a bot with a
//! zero window or an unreachable threshold must not start.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::decision::Thresholds;
use crate::domain::Interval;
use crate::indicators::IchimokuWindows;
use crate::registration::RegistrationProfile;
use crate::signals::SignalCategory;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("window '{0}' must be at least 1")]
    ZeroWindow(&'static str),

    #[error("{name} threshold must be between 1 and {max}, got {value}")]
    ThresholdOutOfRange {
        name: &'static str,
        value: usize,
        max: usize,
    },

    #[error("cadence must be at least one {interval} candle ({min}s), got {cadence}s")]
    CadenceFasterThanCandles {
        interval: Interval,
        min: u64,
        cadence: u64,
    },

    #[error("retry backoff must be at least 1 second")]
    ZeroBackoff,

    #[error("candle_limit must be at least 2, got {0}")]
    CandleLimitTooSmall(usize),

    #[error("feed timeout must be at least 1 second")]
    ZeroTimeout,

    #[error("feed max_retries must be at most {max}, got {value}")]
    TooManyRetries { value: u32, max: u32 },
}

/// Upper bound on feed retries within one tick.
pub const MAX_FEED_RETRIES: u32 = 10;

/// Which candle feed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    #[default]
    Binance,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub kind: FeedKind,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    /// Random-walk seed for the synthetic feed.
    pub seed: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            kind: FeedKind::Binance,
            base_url: crate::data::binance::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// CSV file receiving one row per evaluation.
    pub signal_log: Option<PathBuf>,
    /// File receiving a copy of the log output.
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Traded pair, e.g. `BTCUSDT`.
    pub symbol: String,
    pub interval: Interval,
    /// Candles fetched per tick.
    pub candle_limit: usize,
    pub cadence_seconds: u64,
    pub retry_backoff_seconds: u64,
    pub thresholds: Thresholds,
    pub windows: IchimokuWindows,
    pub feed: FeedConfig,
    pub report: ReportConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: Interval::OneHour,
            candle_limit: 100,
            cadence_seconds: 3600,
            retry_backoff_seconds: 60,
            thresholds: Thresholds::default(),
            windows: IchimokuWindows::default(),
            feed: FeedConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with the symbol taken from a registration profile
    /// (`coin` + `USDT`).
    pub fn from_profile(profile: &RegistrationProfile) -> Self {
        Self {
            symbol: profile.trading_pair(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if let Some(name) = self.windows.first_zero() {
            return Err(ConfigError::ZeroWindow(name));
        }
        let max = SignalCategory::ALL.len();
        for (name, value) in [
            ("bullish", self.thresholds.bullish),
            ("bearish", self.thresholds.bearish),
        ] {
            if value == 0 || value > max {
                return Err(ConfigError::ThresholdOutOfRange { name, value, max });
            }
        }
        let min = self.interval.seconds().unsigned_abs();
        if self.cadence_seconds < min {
            return Err(ConfigError::CadenceFasterThanCandles {
                interval: self.interval,
                min,
                cadence: self.cadence_seconds,
            });
        }
        if self.retry_backoff_seconds == 0 {
            return Err(ConfigError::ZeroBackoff);
        }
        if self.candle_limit < 2 {
            return Err(ConfigError::CandleLimitTooSmall(self.candle_limit));
        }
        if self.feed.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.feed.max_retries > MAX_FEED_RETRIES {
            return Err(ConfigError::TooManyRetries {
                value: self.feed.max_retries,
                max: MAX_FEED_RETRIES,
            });
        }
        Ok(())
    }

    /// Non-fatal observations about a valid config.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let needed = self.windows.full_history();
        if self.candle_limit < needed {
            warnings.push(format!(
                "candle_limit {} is below the {needed} candles needed for every signal; \
                 some categories will be skipped",
                self.candle_limit
            ));
        }
        warnings
    }

    /// BLAKE3 over the canonical JSON form: identical parameters give the
    /// same fingerprint across runs.
    pub fn fingerprint(&self) -> String {
        // Plain structs with string keys always serialize.
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex()[..16].to_string()
    }
}
