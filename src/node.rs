//! One complete link node: resolved role, protocol state and hardware.
//!
//! `LinkNode` is what the firmware `main` and the host simulator run. It
//! owns the [`LinkState`] so callers only deal with setup, step and shutdown.
//!
//! # Example
//!
//! ```ignore
//! let role = Role::resolve(&mut strap, &mut delay, config.strap_settle_ms);
//! let mut node = LinkNode::new(role, config, radio, sleep, board)?;
//! node.setup()?;
//! loop {
//!     if let Err(e) = node.step() {
//!         warn!("{}", e);
//!     }
//! }
//! ```

use crate::board::Board;
use crate::link::{LinkConfig, LinkError, LinkState, LinkStateMachine, Role, StepReport};
use crate::power::{SleepControl, WakeSignal};
use crate::radio::RadioLink;
use log::{debug, info};

/// A node of the sensor link.
pub struct LinkNode<R, P, B> {
    machine: LinkStateMachine<R, P, B>,
    state: LinkState,
    iterations: u64,
}

impl<R, P, B> LinkNode<R, P, B>
where
    R: RadioLink,
    P: SleepControl,
    B: Board,
{
    /// Build a node for an already-resolved `role`.
    pub fn new(
        role: Role,
        config: LinkConfig,
        radio: R,
        sleep: P,
        board: B,
    ) -> Result<Self, LinkError> {
        let machine = LinkStateMachine::new(config, radio, sleep, board)?;
        let state = LinkState::new(role, machine.config());
        Ok(Self {
            machine,
            state,
            iterations: 0,
        })
    }

    pub fn role(&self) -> Role {
        self.state.role()
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn machine(&self) -> &LinkStateMachine<R, P, B> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut LinkStateMachine<R, P, B> {
        &mut self.machine
    }

    /// Main-loop iterations run so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn wake_signal(&self) -> WakeSignal {
        self.machine.wake_signal()
    }

    /// Configure the radio for this node's role and show the boot blink.
    pub fn setup(&mut self) -> Result<(), LinkError> {
        info!("=== {} starting ===", self.role());
        self.machine.setup(&self.state)
    }

    /// One main-loop iteration.
    pub fn step(&mut self) -> Result<StepReport, LinkError> {
        self.iterations += 1;
        let report = self.machine.step(&mut self.state)?;
        if let Some(reason) = report.wake {
            debug!(
                "{} woke ({:?}) after {} iterations",
                self.role(),
                reason,
                self.iterations
            );
        }
        Ok(report)
    }

    /// Close the radio.
    pub fn shutdown(&mut self) -> Result<(), LinkError> {
        info!("{} shutting down", self.role());
        self.machine.shutdown()
    }
}
