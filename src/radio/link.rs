//! The radio capability consumed by the link state machine.

use super::{DataRate, PipeAddress};
use std::fmt;

/// Operations the link protocol needs from a short-range transceiver.
///
/// Implementations hold no protocol state: which value to send, when to
/// retry, and when to sleep are all decided by the caller.
pub trait RadioLink {
    /// Bring the transceiver into a known state on `channel` at `data_rate`.
    fn open(&mut self, channel: u8, data_rate: DataRate) -> Result<(), RadioError>;

    /// Power down and release the transceiver.
    fn close(&mut self) -> Result<(), RadioError>;

    fn set_auto_ack(&mut self, enabled: bool) -> Result<(), RadioError>;

    /// Hardware retry policy: `delay_units` between attempts, at most
    /// `max_retries` retransmissions.
    fn set_retry_policy(&mut self, delay_units: u8, max_retries: u8) -> Result<(), RadioError>;

    fn open_write_pipe(&mut self, address: PipeAddress) -> Result<(), RadioError>;

    fn open_read_pipe(&mut self, address: PipeAddress) -> Result<(), RadioError>;

    fn start_listening(&mut self) -> Result<(), RadioError>;

    fn stop_listening(&mut self) -> Result<(), RadioError>;

    fn power_up(&mut self) -> Result<(), RadioError>;

    fn power_down(&mut self) -> Result<(), RadioError>;

    /// Transmit one payload. `Ok(false)` means the peer never acknowledged
    /// within the hardware retry policy.
    fn try_send(&mut self, payload: &[u8]) -> Result<bool, RadioError>;

    /// Whether at least one received payload is pending.
    fn has_data(&mut self) -> Result<bool, RadioError>;

    /// Read the oldest pending payload into `buffer`.
    ///
    /// Returns `true` when no further payload is pending after this one.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<bool, RadioError>;
}

/// Radio errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// SPI bus error.
    Spi(embedded_hal::spi::ErrorKind),
    /// Chip-enable pin error.
    ChipEnable(embedded_hal::digital::ErrorKind),
    /// Radio used before `open`.
    NotOpen,
    /// Empty payload.
    EmptyPayload,
    /// Payload larger than the configured static width.
    PayloadTooLarge { size: usize, max: usize },
    /// Channel outside the supported range.
    InvalidChannel(u8),
    /// Neither TX_DS nor MAX_RT was raised in time.
    Timeout,
    /// Transceiver-specific failure (simulator, backend).
    Device(String),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(kind) => write!(f, "SPI error: {:?}", kind),
            Self::ChipEnable(kind) => write!(f, "CE pin error: {:?}", kind),
            Self::NotOpen => write!(f, "radio not opened"),
            Self::EmptyPayload => write!(f, "empty payload"),
            Self::PayloadTooLarge { size, max } => {
                write!(f, "payload too large: {} bytes (max {})", size, max)
            }
            Self::InvalidChannel(ch) => write!(f, "invalid channel {}", ch),
            Self::Timeout => write!(f, "radio timeout"),
            Self::Device(msg) => write!(f, "radio device error: {}", msg),
        }
    }
}

impl std::error::Error for RadioError {}
