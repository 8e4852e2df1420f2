//! Protocol state owned by the main loop.

use super::{LinkConfig, Role, SendBudget};

/// All mutable protocol state of one node.
///
/// Passed by exclusive reference into
/// [`LinkStateMachine::step`](super::LinkStateMachine::step); interrupt
/// handlers never see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkState {
    role: RoleState,
    indicator: bool,
}

/// Role-specific state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleState {
    Remote(RemoteState),
    Led(LedState),
}

/// REMOTE: last sensor value read and its delivery status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteState {
    pub(super) sensor: bool,
    pub(super) budget: SendBudget,
    pub(super) last_send_ok: bool,
}

/// LED: last value received over the air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedState {
    pub(super) sensor: bool,
    pub(super) payloads: u64,
}

impl LinkState {
    pub fn new(role: Role, config: &LinkConfig) -> Self {
        let role = match role {
            Role::Remote => RoleState::Remote(RemoteState {
                sensor: false,
                budget: SendBudget::new(config.send_budget),
                last_send_ok: false,
            }),
            Role::Led => RoleState::Led(LedState {
                sensor: false,
                payloads: 0,
            }),
        };
        Self {
            role,
            indicator: false,
        }
    }

    pub fn role(&self) -> Role {
        match self.role {
            RoleState::Remote(_) => Role::Remote,
            RoleState::Led(_) => Role::Led,
        }
    }

    /// Value currently shown on the indicator.
    pub fn indicator(&self) -> bool {
        self.indicator
    }

    /// Last sensor value read (REMOTE) or received (LED).
    pub fn sensor(&self) -> bool {
        match &self.role {
            RoleState::Remote(remote) => remote.sensor,
            RoleState::Led(led) => led.sensor,
        }
    }

    pub fn remote(&self) -> Option<&RemoteState> {
        match &self.role {
            RoleState::Remote(remote) => Some(remote),
            RoleState::Led(_) => None,
        }
    }

    pub fn led(&self) -> Option<&LedState> {
        match &self.role {
            RoleState::Led(led) => Some(led),
            RoleState::Remote(_) => None,
        }
    }

    pub(super) fn parts_mut(&mut self) -> (&mut RoleState, &mut bool) {
        (&mut self.role, &mut self.indicator)
    }
}

impl RemoteState {
    pub fn budget(&self) -> SendBudget {
        self.budget
    }

    pub fn last_send_ok(&self) -> bool {
        self.last_send_ok
    }
}

impl LedState {
    /// Payloads received since boot.
    pub fn payloads(&self) -> u64 {
        self.payloads
    }
}
