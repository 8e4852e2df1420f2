//! Radio transport for the sensor link.
//!
//! - [`config`]: pipe address, channel, data rate and hardware retry policy
//! - [`link`]: the [`RadioLink`] capability the link state machine drives
//! - [`payload`]: one-byte sensor payload codec
//! - [`nrf24`]: nRF24L01+ driver over `embedded-hal` SPI

mod config;
mod link;
mod nrf24;
mod payload;

pub use config::{
    DataRate, PipeAddress, RadioConfig, DEFAULT_CHANNEL, DEFAULT_PIPE_ADDRESS, MAX_CHANNEL,
    MAX_PAYLOAD_LEN,
};
pub use link::{RadioError, RadioLink};
pub use nrf24::Nrf24;
pub use payload::SensorPayload;
