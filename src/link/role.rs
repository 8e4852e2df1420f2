//! Boot-time role selection from the strap pin.

use crate::power::WakeSource;
use embedded_hal::delay::DelayNs;
use std::fmt;

/// Which half of the link this node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Reads the sensor and transmits its state.
    Remote,
    /// Receives the state and drives the indicator.
    Led,
}

/// Indicator blink pattern shown once after setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootBlink {
    pub count: u32,
    pub pause_ms: u32,
}

/// A strap pin sampled once at boot.
pub trait StrapPin {
    /// Configure as input pulled toward the active level.
    fn pull_active(&mut self);

    fn is_active(&mut self) -> bool;

    /// Return the pin to its quiescent state.
    fn release(&mut self);
}

impl Role {
    /// Sample the strap pin: active means REMOTE, anything else LED.
    ///
    /// Must run before any radio or sleep configuration.
    pub fn resolve<P, D>(pin: &mut P, delay: &mut D, settle_ms: u32) -> Self
    where
        P: StrapPin,
        D: DelayNs,
    {
        pin.pull_active();
        delay.delay_ms(settle_ms);
        let active = pin.is_active();
        pin.release();

        if active {
            Role::Remote
        } else {
            Role::Led
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Remote => "Remote",
            Role::Led => "LED Board",
        }
    }

    /// Wake source armed when this role sleeps. LED has no local input to
    /// interrupt on and must poll the radio periodically.
    pub fn wake_source(self) -> WakeSource {
        match self {
            Role::Remote => WakeSource::Edge,
            Role::Led => WakeSource::Timer,
        }
    }

    pub fn boot_blink(self) -> BootBlink {
        match self {
            Role::Remote => BootBlink {
                count: 2,
                pause_ms: 300,
            },
            Role::Led => BootBlink {
                count: 4,
                pause_ms: 100,
            },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeStrap {
        level: bool,
        pulled: bool,
        log: Vec<&'static str>,
    }

    impl StrapPin for FakeStrap {
        fn pull_active(&mut self) {
            self.pulled = true;
            self.log.push("pull");
        }

        fn is_active(&mut self) -> bool {
            self.log.push("read");
            self.pulled && self.level
        }

        fn release(&mut self) {
            self.pulled = false;
            self.log.push("release");
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    #[test]
    fn test_active_strap_is_remote() {
        let mut pin = FakeStrap {
            level: true,
            ..Default::default()
        };
        let mut delay = RecordingDelay::default();
        assert_eq!(Role::resolve(&mut pin, &mut delay, 20), Role::Remote);
    }

    #[test]
    fn test_inactive_strap_is_led() {
        let mut pin = FakeStrap::default();
        let mut delay = RecordingDelay::default();
        assert_eq!(Role::resolve(&mut pin, &mut delay, 20), Role::Led);
    }

    #[test]
    fn test_resolve_pulls_waits_samples_once_and_releases() {
        let mut pin = FakeStrap {
            level: true,
            ..Default::default()
        };
        let mut delay = RecordingDelay::default();
        Role::resolve(&mut pin, &mut delay, 20);

        assert_eq!(pin.log, vec!["pull", "read", "release"]);
        assert!(!pin.pulled);
        assert!(delay.total_ns >= 20_000_000);
    }

    #[test]
    fn test_role_specific_behaviour() {
        assert_eq!(Role::Remote.wake_source(), WakeSource::Edge);
        assert_eq!(Role::Led.wake_source(), WakeSource::Timer);
        assert_eq!(Role::Led.boot_blink().count, 4);
        assert_eq!(Role::Remote.boot_blink().pause_ms, 300);
        assert_eq!(Role::Led.to_string(), "LED Board");
    }
}
