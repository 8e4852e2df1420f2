use super::ConfigError;
use crate::power::PowerError;
use crate::radio::RadioError;
use std::fmt;

/// Errors surfaced by the link state machine.
///
/// None of these are fatal: the main loop logs them and keeps stepping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    Radio(RadioError),
    Power(PowerError),
    Config(ConfigError),
    /// GPIO read or write failed.
    Gpio(embedded_hal::digital::ErrorKind),
    /// The radio kept reporting pending payloads past the drain cap. The
    /// last payload read was still applied.
    DrainOverflow { cap: usize },
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Radio(e) => write!(f, "radio: {}", e),
            Self::Power(e) => write!(f, "power: {}", e),
            Self::Config(e) => write!(f, "config: {}", e),
            Self::Gpio(kind) => write!(f, "GPIO error: {:?}", kind),
            Self::DrainOverflow { cap } => {
                write!(f, "radio still had data after {} reads", cap)
            }
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Radio(e) => Some(e),
            Self::Power(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RadioError> for LinkError {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

impl From<PowerError> for LinkError {
    fn from(e: PowerError) -> Self {
        Self::Power(e)
    }
}

impl From<ConfigError> for LinkError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
