//! Battery-powered two-node sensor link on ESP32 + nRF24L01+.
//!
//! A REMOTE node watches a sensor input and reports every change over the
//! radio; an LED node mirrors the last reported value on its indicator.
//! Both spend almost all their time asleep.
//!
//! The protocol modules are platform-independent and tested on the host;
//! only `board::esp32`, `power::esp32` and the firmware binary need the
//! `esp32` feature.

// Allow the crate to reference itself by name (needed for proc-macro generated code)
extern crate self as doorlink_esp32;

pub mod board;
pub mod link;
pub mod node;
pub mod power;
pub mod radio;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
#[cfg(feature = "tap-tests")]
pub mod testing;

// Re-export commonly used items
pub use board::{Board, DiagnosticInput, NoDiagnostics, NoSensor, PinBoard};
pub use link::{
    ConfigError, LinkConfig, LinkError, LinkState, LinkStateMachine, Role, SendOutcome, StepReport,
};
pub use node::LinkNode;
pub use power::{IdleTicks, PowerError, SleepControl, WakeScheduler, WakeSignal, WakeSource};
pub use radio::{DataRate, Nrf24, PipeAddress, RadioConfig, RadioError, RadioLink, SensorPayload};

// Re-export testing items (only with tap-tests feature)
#[cfg(feature = "tap-tests")]
pub use testing::TestRunner;
