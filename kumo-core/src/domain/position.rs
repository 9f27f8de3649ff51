//! Position state and the actions that move it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The last action taken for a symbol. One instance per traded symbol,
/// created as `None` at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    #[default]
    None,
    Buy,
    Sell,
}

/// Action emitted by one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl PositionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionState::None => "NONE",
            PositionState::Buy => "BUY",
            PositionState::Sell => "SELL",
        }
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }

    /// True for actions that change the position.
    pub fn is_trade(&self) -> bool {
        !matches!(self, Action::Hold)
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
