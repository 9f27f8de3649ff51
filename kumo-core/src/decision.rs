//! Decision engine: hysteretic position state machine.
//!
//! | From          | Condition                         | Action | Next |
//! |---------------|-----------------------------------|--------|------|
//! | `None`/`Sell` | bullish >= bullish threshold      | BUY    | Buy  |
//! | `Buy`         | bearish >= bearish threshold      | SELL   | Sell |
//! | any           | otherwise                         | HOLD   | same |
//!
//! The engine is a pure function of (state, counts). It never owns the
//! state: the caller applies `Decision::next_state` once a tick succeeds.

use serde::{Deserialize, Serialize};

use crate::domain::{Action, PositionState};
use crate::signals::SignalCounts;

/// Minimum agreeing tags required to change position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub bullish: usize,
    pub bearish: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            bullish: 3,
            bearish: 3,
        }
    }
}

/// Outcome of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub previous_state: PositionState,
    pub next_state: PositionState,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine {
    thresholds: Thresholds,
}

impl DecisionEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn decide(&self, state: PositionState, counts: SignalCounts) -> Decision {
        let (action, next_state) = match state {
            PositionState::None | PositionState::Sell
                if counts.bullish >= self.thresholds.bullish =>
            {
                (Action::Buy, PositionState::Buy)
            }
            PositionState::Buy if counts.bearish >= self.thresholds.bearish => {
                (Action::Sell, PositionState::Sell)
            }
            _ => (Action::Hold, state),
        };
        Decision {
            action,
            previous_state: state,
            next_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DecisionEngine {
        DecisionEngine::default()
    }

    #[test]
    fn buys_from_none_at_threshold() {
        let d = engine().decide(PositionState::None, SignalCounts::new(3, 0));
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.next_state, PositionState::Buy);
        assert_eq!(d.previous_state, PositionState::None);
    }

    #[test]
    fn holds_from_none_below_threshold() {
        let d = engine().decide(PositionState::None, SignalCounts::new(2, 0));
        assert_eq!(d.action, Action::Hold);
        assert_eq!(d.next_state, PositionState::None);
    }

    #[test]
    fn bearish_evidence_does_not_sell_from_none() {
        let d = engine().decide(PositionState::None, SignalCounts::new(0, 5));
        assert_eq!(d.action, Action::Hold);
        assert_eq!(d.next_state, PositionState::None);
    }

    #[test]
    fn buy_does_not_retrigger() {
        let d = engine().decide(PositionState::Buy, SignalCounts::new(5, 0));
        assert_eq!(d.action, Action::Hold);
        assert_eq!(d.next_state, PositionState::Buy);
    }

    #[test]
    fn sells_from_buy_at_threshold() {
        let d = engine().decide(PositionState::Buy, SignalCounts::new(0, 3));
        assert_eq!(d.action, Action::Sell);
        assert_eq!(d.next_state, PositionState::Sell);
    }

    #[test]
    fn rebuys_from_sell() {
        let d = engine().decide(PositionState::Sell, SignalCounts::new(4, 1));
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.next_state, PositionState::Buy);
    }

    #[test]
    fn hysteresis_sequence() {
        let engine = engine();
        let mut state = PositionState::None;
        let mut actions = Vec::new();
        for counts in [
            SignalCounts::new(3, 0),
            SignalCounts::new(0, 1),
            SignalCounts::new(0, 3),
        ] {
            let d = engine.decide(state, counts);
            actions.push(d.action);
            state = d.next_state;
        }
        assert_eq!(actions, vec![Action::Buy, Action::Hold, Action::Sell]);
        assert_eq!(state, PositionState::Sell);
    }

    #[test]
    fn custom_thresholds_apply() {
        let engine = DecisionEngine::new(Thresholds {
            bullish: 2,
            bearish: 4,
        });
        assert_eq!(
            engine.decide(PositionState::None, SignalCounts::new(2, 0)).action,
            Action::Buy
        );
        assert_eq!(
            engine.decide(PositionState::Buy, SignalCounts::new(0, 3)).action,
            Action::Hold
        );
    }
}
