//! Radio link parameters.
//!
//! Both nodes share a single pipe and channel. The values here match what
//! the paired board expects; changing one side without the other breaks
//! the link.

use crate::link::ConfigError;
use std::fmt;

/// Highest RF channel the nRF24L01+ accepts (2400 + 125 MHz).
pub const MAX_CHANNEL: u8 = 125;

/// Largest value for either field of the hardware retry policy (4 bits each).
pub const MAX_RETRY_FIELD: u8 = 15;

/// Largest static payload the transceiver FIFO holds.
pub const MAX_PAYLOAD_LEN: usize = 32;

/// Default shared pipe address.
pub const DEFAULT_PIPE_ADDRESS: u64 = 0xA8_E8F0_F0F1;

/// Default RF channel.
pub const DEFAULT_CHANNEL: u8 = 38;

/// Air data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRate {
    /// 250 kbps, longest range
    Kbps250,
    /// 1 Mbps
    Mbps1,
    /// 2 Mbps
    Mbps2,
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kbps250 => write!(f, "250kbps"),
            Self::Mbps1 => write!(f, "1Mbps"),
            Self::Mbps2 => write!(f, "2Mbps"),
        }
    }
}

/// A 40-bit pipe address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeAddress(u64);

impl PipeAddress {
    /// Address width in bytes.
    pub const WIDTH: usize = 5;

    /// Create an address, rejecting values wider than 40 bits.
    pub fn new(raw: u64) -> Result<Self, ConfigError> {
        if raw >> (Self::WIDTH * 8) != 0 {
            return Err(ConfigError::AddressTooWide(raw));
        }
        Ok(Self(raw))
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Address bytes in over-the-wire order (least significant byte first).
    pub fn to_bytes(self) -> [u8; Self::WIDTH] {
        let le = self.0.to_le_bytes();
        [le[0], le[1], le[2], le[3], le[4]]
    }
}

impl Default for PipeAddress {
    fn default() -> Self {
        Self(DEFAULT_PIPE_ADDRESS)
    }
}

impl fmt::Display for PipeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#012X}", self.0)
    }
}

/// Radio configuration shared by both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub pipe: PipeAddress,
    pub channel: u8,
    pub data_rate: DataRate,
    /// Hardware auto-acknowledge on the shared pipe.
    pub auto_ack: bool,
    /// Delay between hardware retries, in 250us units (0-15).
    pub retry_delay: u8,
    /// Hardware retransmit count (0-15).
    pub retry_count: u8,
    /// Static payload width in bytes.
    pub payload_len: usize,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            pipe: PipeAddress::default(),
            channel: DEFAULT_CHANNEL,
            data_rate: DataRate::Kbps250,
            auto_ack: true,
            retry_delay: 15,
            retry_count: 15,
            payload_len: 1,
        }
    }
}

impl RadioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel > MAX_CHANNEL {
            return Err(ConfigError::InvalidRadio("channel must be <= 125"));
        }
        if self.retry_delay > MAX_RETRY_FIELD {
            return Err(ConfigError::InvalidRadio("retry_delay must be <= 15"));
        }
        if self.retry_count > MAX_RETRY_FIELD {
            return Err(ConfigError::InvalidRadio("retry_count must be <= 15"));
        }
        if self.payload_len == 0 || self.payload_len > MAX_PAYLOAD_LEN {
            return Err(ConfigError::InvalidRadio("payload_len must be 1..=32"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_paired_board() {
        let config = RadioConfig::default();
        assert_eq!(config.pipe.raw(), 0xA8E8F0F0F1);
        assert_eq!(config.channel, 38);
        assert_eq!(config.data_rate, DataRate::Kbps250);
        assert!(config.auto_ack);
        assert_eq!((config.retry_delay, config.retry_count), (15, 15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipe_address_bytes_are_lsb_first() {
        let pipe = PipeAddress::default();
        assert_eq!(pipe.to_bytes(), [0xF1, 0xF0, 0xF0, 0xE8, 0xA8]);
    }

    #[test]
    fn test_pipe_address_rejects_wide_values() {
        assert_eq!(
            PipeAddress::new(0x01_0000_0000_00),
            Err(ConfigError::AddressTooWide(0x01_0000_0000_00))
        );
        assert!(PipeAddress::new(0xFF_FFFF_FFFF).is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let config = RadioConfig {
            channel: 126,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RadioConfig {
            retry_count: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RadioConfig {
            payload_len: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
