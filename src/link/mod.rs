//! Sensor link protocol.
//!
//! A node resolves its [`Role`] once at boot from the strap pin, then runs
//! [`LinkStateMachine::step`] forever:
//!
//! - **REMOTE** reads the sensor, sends each change with a bounded number of
//!   software retries ([`SendBudget`]) and sleeps until the sensor pin changes.
//! - **LED** drains every pending payload, shows the last one on the
//!   indicator and sleeps on a timer so it can poll the radio again.
//!
//! Both roles count idle iterations; any activity resets the count, and
//! exceeding the role's threshold puts the node to sleep through the
//! [`WakeScheduler`](crate::power::WakeScheduler).

mod budget;
mod config;
mod error;
mod led;
mod machine;
mod remote;
mod role;
mod state;

#[cfg(test)]
mod fakes;

pub use budget::SendBudget;
pub use config::{ConfigError, LinkConfig, MIN_STRAP_SETTLE_MS};
pub use error::LinkError;
pub use machine::{LinkStateMachine, SendOutcome, StepReport};
pub use role::{BootBlink, Role, StrapPin};
pub use state::{LedState, LinkState, RemoteState, RoleState};
