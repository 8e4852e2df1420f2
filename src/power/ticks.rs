//! Idle tick counter and the wake signal shared with interrupt handlers.
//!
//! The main loop owns [`IdleTicks`]. Interrupt handlers only ever get a
//! [`WakeSignal`], which can zero the counter and post a wake reason but
//! cannot read or increment anything.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

/// What ended a sleep period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WakeSource {
    /// No source fired (or none was armed).
    None = 0,
    /// Periodic timer.
    Timer = 1,
    /// Level change on the sensor pin.
    Edge = 2,
}

impl WakeSource {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Timer,
            2 => Self::Edge,
            _ => Self::None,
        }
    }
}

/// Main-loop iterations since the last activity.
#[derive(Debug, Clone, Default)]
pub struct IdleTicks(Arc<AtomicU32>);

impl IdleTicks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Count one idle iteration and return the new value.
    pub fn increment(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    /// Handle for interrupt context.
    pub fn wake_signal(&self) -> WakeSignal {
        WakeSignal {
            idle: Arc::clone(&self.0),
            reason: Arc::new(AtomicU8::new(WakeSource::None as u8)),
        }
    }
}

/// Interrupt-side handle: reset idle ticks and post a wake reason.
#[derive(Debug, Clone)]
pub struct WakeSignal {
    idle: Arc<AtomicU32>,
    reason: Arc<AtomicU8>,
}

impl WakeSignal {
    /// Called from a timer or pin-change handler. Safe at any point of the
    /// main loop since it only stores.
    pub fn fire(&self, source: WakeSource) {
        self.idle.store(0, Ordering::Relaxed);
        self.reason.store(source as u8, Ordering::Release);
    }

    /// Consume the pending wake reason. Returns [`WakeSource::None`] if
    /// nothing fired since the last call.
    pub fn take(&self) -> WakeSource {
        WakeSource::from_raw(self.reason.swap(WakeSource::None as u8, Ordering::Acquire))
    }
}


#[cfg(feature = "tap-tests")]
mod tap_tests {
    use super::*;
    use doorlink_esp32_macros::tap_test;

    #[tap_test]
    fn wake_signal_zeroes_ticks() {
        let ticks = IdleTicks::new();
        let signal = ticks.wake_signal();
        ticks.increment();
        signal.fire(WakeSource::Timer);
        assert_eq!(ticks.get(), 0);
        assert_eq!(signal.take(), WakeSource::Timer);
    }
}
