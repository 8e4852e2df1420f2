//! Over-the-air payload: one byte, 0 for inactive, 1 for active.

/// Sensor state carried by a single radio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorPayload(bool);

impl SensorPayload {
    /// Encoded length in bytes.
    pub const LEN: usize = 1;

    pub fn new(active: bool) -> Self {
        Self(active)
    }

    pub fn is_active(self) -> bool {
        self.0
    }

    pub fn encode(self) -> [u8; Self::LEN] {
        [self.0 as u8]
    }

    /// Decode the first byte of a received buffer. Any non-zero value reads
    /// as active; an empty buffer reads as inactive.
    pub fn decode(bytes: &[u8]) -> Self {
        Self(bytes.first().is_some_and(|b| *b != 0))
    }
}

impl From<bool> for SensorPayload {
    fn from(active: bool) -> Self {
        Self(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_zero_or_one() {
        assert_eq!(SensorPayload::new(false).encode(), [0]);
        assert_eq!(SensorPayload::new(true).encode(), [1]);
    }

    #[test]
    fn test_decode_treats_nonzero_as_active() {
        assert!(SensorPayload::decode(&[0x7F]).is_active());
        assert!(!SensorPayload::decode(&[0, 1]).is_active());
        assert!(!SensorPayload::decode(&[]).is_active());
    }
}

#[cfg(feature = "tap-tests")]
mod tap_tests {
    use super::*;
    use doorlink_esp32_macros::tap_test;

    #[tap_test]
    fn payload_decodes_first_byte_only() {
        assert!(SensorPayload::decode(&[1, 0, 0]).is_active());
        assert!(!SensorPayload::decode(&[0, 1, 1]).is_active());
    }
}
