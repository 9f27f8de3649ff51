//! User registration: a step-by-step conversation that produces a
//! [`RegistrationProfile`], and a directory of saved profiles.
//!
//! The flow is transport-agnostic. A chat front end, or the CLI reading
//! stdin, feeds lines into a [`SessionStore`] and shows the [`Reply`].

pub mod session;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

pub use session::{Reply, SessionStore, Step};

/// The only strategy on offer.
pub const STRATEGY: &str = "ICHIMOKU";

/// Coins a profile may select; each trades against USDT.
pub const COIN_CHOICES: [&str; 5] = ["ETH", "BTC", "SOL", "AVAX", "NEAR"];

pub const MIN_AMOUNT_USDT: f64 = 50.0;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("profile I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profile JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("field '{0}' is missing")]
    MissingField(&'static str),
}

/// A completed registration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationProfile {
    pub username: String,
    pub email: String,
    pub api_key: String,
    pub api_secret: String,
    pub strategy: String,
    pub coin: String,
    pub amount_usdt: f64,
    pub user_id: String,
    /// Always true: the bot only reports signals.
    pub demo_mode: bool,
}

impl fmt::Debug for RegistrationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationProfile")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("strategy", &self.strategy)
            .field("coin", &self.coin)
            .field("amount_usdt", &self.amount_usdt)
            .field("user_id", &self.user_id)
            .field("demo_mode", &self.demo_mode)
            .finish()
    }
}

impl RegistrationProfile {
    /// Exchange symbol for the selected coin, e.g. `BTCUSDT`.
    pub fn trading_pair(&self) -> String {
        format!("{}USDT", self.coin.trim().to_uppercase())
    }

    /// Fields the bot cannot run without.
    pub fn check_complete(&self) -> Result<(), RegistrationError> {
        for (name, value) in [
            ("username", &self.username),
            ("email", &self.email),
            ("strategy", &self.strategy),
            ("coin", &self.coin),
            ("user_id", &self.user_id),
        ] {
            if value.trim().is_empty() {
                return Err(RegistrationError::MissingField(name));
            }
        }
        Ok(())
    }
}

/// `alice` + `a@b.io` -> `alice_a_at_b_dot_io`; also the profile file stem.
pub fn user_id_for(username: &str, email: &str) -> String {
    format!(
        "{username}_{}",
        email.replace('@', "_at_").replace('.', "_dot_")
    )
}

/// Profiles stored as `<user_id>.json` in one directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, profile: &RegistrationProfile) -> Result<PathBuf, RegistrationError> {
        profile.check_complete()?;
        std::fs::create_dir_all(&self.dir).map_err(|source| RegistrationError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.dir.join(format!("{}.json", profile.user_id));
        let json = serde_json::to_string_pretty(profile).map_err(|source| RegistrationError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| RegistrationError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            user_id = %profile.user_id,
            path = %path.display(),
            "saved registration profile"
        );
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<RegistrationProfile, RegistrationError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: RegistrationProfile =
            serde_json::from_str(&content).map_err(|source| RegistrationError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        profile.check_complete()?;
        Ok(profile)
    }

    /// Most recently written demo-mode profile, if any. Unreadable files are
    /// skipped with a warning.
    pub fn latest(&self) -> Result<Option<RegistrationProfile>, RegistrationError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RegistrationError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut candidates: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .map(|path| {
                let modified = std::fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();
        // Newest first; file name breaks ties.
        candidates.sort_by(|a, b| b.cmp(a));

        for (_, path) in candidates {
            match Self::load(&path) {
                Ok(profile) if profile.demo_mode => return Ok(Some(profile)),
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping profile"),
            }
        }
        Ok(None)
    }
}
