//! Registration session store.
//!
//! Each conversation is keyed by an opaque session id and walks a fixed
//! sequence of steps. Sessions expire on inactivity; expiry is checked lazily
//! on every access and can be swept explicitly.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;

use super::{user_id_for, RegistrationProfile, COIN_CHOICES, MIN_AMOUNT_USDT, STRATEGY};

/// Registration steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Username,
    Email,
    ApiKey,
    ApiSecret,
    Strategy,
    Coin,
    Amount,
    /// Profile complete; waiting for the user to confirm activation.
    AwaitingConfirmation,
}

impl Step {
    pub fn prompt(&self) -> String {
        match self {
            Step::Username => "Enter a username (3-20 letters/numbers/_):".to_string(),
            Step::Email => "Enter your email:".to_string(),
            Step::ApiKey => {
                "Enter your 64-character exchange API key (read-only permission is enough):"
                    .to_string()
            }
            Step::ApiSecret => "Enter your 64-character exchange API secret:".to_string(),
            Step::Strategy => format!("Choose strategy (send: {STRATEGY}):"),
            Step::Coin => format!("Choose coin (send: {}):", COIN_CHOICES.join(", ")),
            Step::Amount => format!("Enter amount in USDT (>= {MIN_AMOUNT_USDT}):"),
            Step::AwaitingConfirmation => "Send confirm to activate your signal bot.".to_string(),
        }
    }
}

/// What the conversation should say next.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Input accepted (or session started); ask for this step.
    Prompt(Step),
    /// Input rejected; the same step is asked again.
    Invalid { step: Step, reason: String },
    /// All fields collected. The caller persists the profile; the session
    /// now awaits confirmation.
    Completed(RegistrationProfile),
    /// Activation confirmed; the session is closed.
    Confirmed(RegistrationProfile),
    /// The session timed out and was removed.
    Expired,
    /// No session for this id.
    NoSession,
}

impl Reply {
    pub fn message(&self) -> String {
        match self {
            Reply::Prompt(step) => step.prompt(),
            Reply::Invalid { step, reason } => {
                format!("Invalid input: {reason}. {}", step.prompt())
            }
            Reply::Completed(profile) => format!(
                "Registration saved for {}. {}",
                profile.user_id,
                Step::AwaitingConfirmation.prompt()
            ),
            Reply::Confirmed(profile) => format!(
                "Confirmed. Run the bot with the profile for {} \
                 (signal only, no orders are placed).",
                profile.user_id
            ),
            Reply::Expired => "Session expired. Start registration again.".to_string(),
            Reply::NoSession => {
                "No registration in progress. Start registration first.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Draft {
    username: Option<String>,
    email: Option<String>,
    api_key: Option<String>,
    api_secret: Option<String>,
    strategy: Option<String>,
    coin: Option<String>,
}

#[derive(Debug, Clone)]
struct Session {
    step: Step,
    draft: Draft,
    profile: Option<RegistrationProfile>,
    expires_at: DateTime<Utc>,
}

/// In-memory registration sessions keyed by `K`.
#[derive(Debug)]
pub struct SessionStore<K> {
    sessions: HashMap<K, Session>,
    step_ttl: Duration,
    confirm_ttl: Duration,
}

impl<K: Eq + Hash + Clone> Default for SessionStore<K> {
    fn default() -> Self {
        Self::new(Duration::seconds(300), Duration::seconds(600))
    }
}

impl<K: Eq + Hash + Clone> SessionStore<K> {
    pub fn new(step_ttl: Duration, confirm_ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            step_ttl,
            confirm_ttl,
        }
    }

    /// Start (or restart) a session.
    pub fn start(&mut self, id: K, now: DateTime<Utc>) -> Reply {
        self.sessions.insert(
            id,
            Session {
                step: Step::Username,
                draft: Draft::default(),
                profile: None,
                expires_at: now + self.step_ttl,
            },
        );
        Reply::Prompt(Step::Username)
    }

    /// Current step of a live session.
    pub fn step(&self, id: &K, now: DateTime<Utc>) -> Option<Step> {
        self.sessions
            .get(id)
            .filter(|s| now <= s.expires_at)
            .map(|s| s.step)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove every expired session; returns how many were removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| now <= s.expires_at);
        before - self.sessions.len()
    }

    /// Feed one line of user input to the session.
    pub fn handle(&mut self, id: &K, input: &str, now: DateTime<Utc>) -> Reply {
        let step_ttl = self.step_ttl;
        let confirm_ttl = self.confirm_ttl;
        let session = match self.lookup(id, now) {
            Lookup::Live(session) => session,
            Lookup::Expired => return Reply::Expired,
            Lookup::Missing => return Reply::NoSession,
        };

        session.expires_at = now + step_ttl;
        let text = input.trim();
        let step = session.step;
        let invalid = |reason: &str| Reply::Invalid {
            step,
            reason: reason.to_string(),
        };

        let next = match step {
            Step::Username => {
                if !valid_username(text) {
                    return invalid("username must be 3-20 letters, numbers or _");
                }
                session.draft.username = Some(text.to_string());
                Step::Email
            }
            Step::Email => {
                if !(text.contains('@') && text.contains('.')) {
                    return invalid("email must contain @ and .");
                }
                session.draft.email = Some(text.to_string());
                Step::ApiKey
            }
            Step::ApiKey => {
                if !valid_api_credential(text) {
                    return invalid("API key must be 64 letters or numbers");
                }
                session.draft.api_key = Some(text.to_string());
                Step::ApiSecret
            }
            Step::ApiSecret => {
                if !valid_api_credential(text) {
                    return invalid("API secret must be 64 letters or numbers");
                }
                session.draft.api_secret = Some(text.to_string());
                Step::Strategy
            }
            Step::Strategy => {
                let upper = text.to_uppercase();
                if upper != STRATEGY {
                    return invalid("only ICHIMOKU is available");
                }
                session.draft.strategy = Some(upper);
                Step::Coin
            }
            Step::Coin => {
                let upper = text.to_uppercase();
                if !COIN_CHOICES.contains(&upper.as_str()) {
                    return invalid("unsupported coin");
                }
                session.draft.coin = Some(upper);
                Step::Amount
            }
            Step::Amount => {
                let amount = match text.parse::<f64>() {
                    Ok(v) if v.is_finite() && v >= MIN_AMOUNT_USDT => v,
                    _ => return invalid("amount must be a number >= 50"),
                };
                let Some(profile) = build_profile(&session.draft, amount) else {
                    return invalid("registration is incomplete, start again");
                };
                session.step = Step::AwaitingConfirmation;
                session.profile = Some(profile.clone());
                session.expires_at = now + confirm_ttl;
                return Reply::Completed(profile);
            }
            Step::AwaitingConfirmation => {
                return invalid("registration is complete, send confirm");
            }
        };

        session.step = next;
        Reply::Prompt(next)
    }

    /// Confirm a completed registration and close the session.
    pub fn confirm(&mut self, id: &K, now: DateTime<Utc>) -> Reply {
        let session = match self.lookup(id, now) {
            Lookup::Live(session) => session,
            Lookup::Expired => return Reply::Expired,
            Lookup::Missing => return Reply::NoSession,
        };
        match (session.step, session.profile.clone()) {
            (Step::AwaitingConfirmation, Some(profile)) => {
                self.sessions.remove(id);
                Reply::Confirmed(profile)
            }
            (step, _) => Reply::Invalid {
                step,
                reason: "registration is not complete yet".to_string(),
            },
        }
    }

    /// Look up `id`, removing the session first if it has expired.
    fn lookup(&mut self, id: &K, now: DateTime<Utc>) -> Lookup<'_> {
        match self.sessions.get(id).map(|s| now > s.expires_at) {
            None => Lookup::Missing,
            Some(true) => {
                self.sessions.remove(id);
                Lookup::Expired
            }
            Some(false) => match self.sessions.get_mut(id) {
                Some(session) => Lookup::Live(session),
                None => Lookup::Missing,
            },
        }
    }
}

enum Lookup<'a> {
    Live(&'a mut Session),
    Expired,
    Missing,
}

fn valid_username(text: &str) -> bool {
    let len = text.chars().count();
    (3..=20).contains(&len)
        && text.chars().all(|c| c.is_alphanumeric() || c == '_')
        && text.chars().any(char::is_alphanumeric)
}

fn valid_api_credential(text: &str) -> bool {
    text.len() == 64 && text.chars().all(|c| c.is_ascii_alphanumeric())
}

fn build_profile(draft: &Draft, amount_usdt: f64) -> Option<RegistrationProfile> {
    let username = draft.username.clone()?;
    let email = draft.email.clone()?;
    Some(RegistrationProfile {
        user_id: user_id_for(&username, &email),
        username,
        email,
        api_key: draft.api_key.clone()?,
        api_secret: draft.api_secret.clone()?,
        strategy: draft.strategy.clone()?,
        coin: draft.coin.clone()?,
        amount_usdt,
        demo_mode: true,
    })
}
