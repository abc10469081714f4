use serde::{Deserialize, Serialize};
use tracing::info;

/// The engine-wide trading gate, per §4.7: `Halted` blocks every outgoing command, `Reducing`
/// passes only orders that reduce net exposure, `Active` passes everything else through to the
/// remaining risk checks.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum TradingState {
    Halted,
    Active,
    Reducing,
}

impl TradingState {
    pub fn update(&mut self, next: TradingState) -> TradingStateUpdateAudit {
        let prev = *self;

        if prev == next {
            info!(state = ?next, "trading state set, although it was already in that state");
        } else {
            info!(from = ?prev, to = ?next, "trading state transition");
        }

        *self = next;
        TradingStateUpdateAudit { prev, current: next }
    }

    /// Whether an order that either increases (`reduces_exposure = false`) or reduces
    /// (`reduces_exposure = true`) net exposure is permitted to pass the gate.
    pub fn permits(&self, reduces_exposure: bool) -> bool {
        match self {
            TradingState::Halted => false,
            TradingState::Active => true,
            TradingState::Reducing => reduces_exposure,
        }
    }
}

/// Audit record of a [`TradingState`] transition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingStateUpdateAudit {
    pub prev: TradingState,
    pub current: TradingState,
}

impl TradingStateUpdateAudit {
    pub fn transitioned_to_halted(&self) -> bool {
        self.current == TradingState::Halted && self.prev != TradingState::Halted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits() {
        struct TestCase {
            state: TradingState,
            reduces_exposure: bool,
            expected: bool,
        }

        let cases = vec![
            TestCase { state: TradingState::Halted, reduces_exposure: true, expected: false },
            TestCase { state: TradingState::Halted, reduces_exposure: false, expected: false },
            TestCase { state: TradingState::Active, reduces_exposure: false, expected: true },
            TestCase { state: TradingState::Reducing, reduces_exposure: true, expected: true },
            TestCase { state: TradingState::Reducing, reduces_exposure: false, expected: false },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            assert_eq!(test.state.permits(test.reduces_exposure), test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_update_returns_audit_with_prev_and_current() {
        let mut state = TradingState::Active;
        let audit = state.update(TradingState::Halted);

        assert_eq!(audit.prev, TradingState::Active);
        assert_eq!(audit.current, TradingState::Halted);
        assert!(audit.transitioned_to_halted());
        assert_eq!(state, TradingState::Halted);
    }
}
