//! Link protocol configuration.
//!
//! Defaults reproduce the tuning the paired boards were built with. The two
//! idle thresholds are empirical: the only property that matters is that
//! REMOTE goes back to sleep much sooner than LED.

use super::Role;
use crate::radio::RadioConfig;
use std::fmt;
use std::time::Duration;

/// Shortest strap settle delay that gives a stable reading.
pub const MIN_STRAP_SETTLE_MS: u32 = 20;

/// Link protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Idle iterations before REMOTE sleeps.
    pub remote_idle_threshold: u32,
    /// Idle iterations before LED sleeps.
    pub led_idle_threshold: u32,
    /// Software send attempts granted per sensor change.
    pub send_budget: u32,
    /// Most payloads read in one drain before giving up on the FIFO.
    pub drain_cap: usize,
    pub strap_settle_ms: u32,
    /// Delay between radio power-up and transmit.
    pub radio_settle_ms: u32,
    /// Length of the indicator blink-off after a failed send.
    pub failure_pulse_ms: u32,
    /// Pause after waking before the loop resumes.
    pub wake_settle_ms: u32,
    /// Timer wake period for LED nodes.
    pub led_wake_period: Duration,
    pub radio: RadioConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            remote_idle_threshold: 10,
            led_idle_threshold: 4000,
            send_budget: 1000,
            drain_cap: 16,
            strap_settle_ms: MIN_STRAP_SETTLE_MS,
            radio_settle_ms: 10,
            failure_pulse_ms: 25,
            wake_settle_ms: 5,
            led_wake_period: Duration::from_secs(2),
            radio: RadioConfig::default(),
        }
    }
}

impl LinkConfig {
    /// Override both idle thresholds.
    pub fn with_idle_thresholds(remote: u32, led: u32) -> Self {
        Self {
            remote_idle_threshold: remote,
            led_idle_threshold: led,
            ..Default::default()
        }
    }

    pub fn with_send_budget(mut self, budget: u32) -> Self {
        self.send_budget = budget;
        self
    }

    pub fn with_drain_cap(mut self, cap: usize) -> Self {
        self.drain_cap = cap;
        self
    }

    pub fn with_radio(mut self, radio: RadioConfig) -> Self {
        self.radio = radio;
        self
    }

    /// Delays that only matter on real hardware set to zero.
    pub fn without_delays(mut self) -> Self {
        self.radio_settle_ms = 0;
        self.failure_pulse_ms = 0;
        self.wake_settle_ms = 0;
        self
    }

    /// Idle threshold for `role`.
    pub fn idle_threshold(&self, role: Role) -> u32 {
        match role {
            Role::Remote => self.remote_idle_threshold,
            Role::Led => self.led_idle_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote_idle_threshold == 0 || self.led_idle_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.send_budget == 0 {
            return Err(ConfigError::ZeroSendBudget);
        }
        if self.drain_cap == 0 {
            return Err(ConfigError::ZeroDrainCap);
        }
        if self.strap_settle_ms < MIN_STRAP_SETTLE_MS {
            return Err(ConfigError::StrapSettleTooShort {
                ms: self.strap_settle_ms,
                min: MIN_STRAP_SETTLE_MS,
            });
        }
        if self.led_wake_period.is_zero() {
            return Err(ConfigError::ZeroWakePeriod);
        }
        self.radio.validate()
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroThreshold,
    ZeroSendBudget,
    ZeroDrainCap,
    StrapSettleTooShort { ms: u32, min: u32 },
    ZeroWakePeriod,
    /// Pipe address wider than 40 bits.
    AddressTooWide(u64),
    InvalidRadio(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroThreshold => write!(f, "idle thresholds must be > 0"),
            Self::ZeroSendBudget => write!(f, "send budget must be > 0"),
            Self::ZeroDrainCap => write!(f, "drain cap must be > 0"),
            Self::StrapSettleTooShort { ms, min } => {
                write!(f, "strap settle delay {}ms is below {}ms", ms, min)
            }
            Self::ZeroWakePeriod => write!(f, "LED wake period must be > 0"),
            Self::AddressTooWide(raw) => write!(f, "pipe address {:#X} exceeds 40 bits", raw),
            Self::InvalidRadio(msg) => write!(f, "invalid radio config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
