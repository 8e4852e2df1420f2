//! Software send-attempt budget.
//!
//! Every sensor change grants a fresh budget; each failed transmission
//! spends one attempt. Once it hits zero the node stops retrying until the
//! next change, which bounds the energy spent on an unreachable peer.

/// Remaining software send attempts for the current sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendBudget {
    remaining: u32,
    max: u32,
}

impl SendBudget {
    /// A budget that grants `max` attempts per refill. Starts exhausted:
    /// nothing is sent until the first sensor change.
    pub fn new(max: u32) -> Self {
        Self { remaining: 0, max }
    }

    pub fn refill(&mut self) {
        self.remaining = self.max;
    }

    /// Spend one attempt and return what is left. Never goes below zero.
    pub fn consume(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}


#[cfg(feature = "tap-tests")]
mod tap_tests {
    use super::*;
    use doorlink_esp32_macros::tap_test;

    #[tap_test]
    fn budget_never_underflows() {
        let mut budget = SendBudget::new(2);
        budget.refill();
        for _ in 0..10 {
            budget.consume();
        }
        assert_eq!(budget.remaining(), 0);
    }
}
