//! Low-power sleep sequencing.
//!
//! [`WakeScheduler`] owns the order in which the sleep primitives are
//! invoked; [`SleepControl`] backends only provide the individual steps.
//!
//! # Sequence
//!
//! 1. Arm the wake source (pin change on REMOTE, timer on LED)
//! 2. Power off the analog comparator / ADC
//! 3. Select power-down mode and request sleep
//! 4. With interrupts masked, run the brown-out disable sequence, then
//!    unmask so the sleep instruction itself stays wakeable
//! 5. Sleep
//! 6. With interrupts masked, detach the pin wake and clear the sleep request

use super::{IdleTicks, WakeSignal, WakeSource};
use log::{debug, info};
use std::fmt;
use std::time::Duration;

/// Hardware steps used by [`WakeScheduler`].
pub trait SleepControl {
    /// Arm a wake on the sensor leaving `sensor_active`, the level the node
    /// last sampled. A change that already happened wakes at once.
    fn arm_edge_wake(&mut self, sensor_active: bool) -> Result<(), PowerError>;

    /// Arm the periodic wake timer.
    fn arm_timer_wake(&mut self, period: Duration) -> Result<(), PowerError>;

    /// Power off the analog comparator and ADC for the sleep period.
    fn disable_analog(&mut self) -> Result<(), PowerError>;

    /// Select the deepest sleep mode that resumes after the sleep call and
    /// mark the CPU ready to sleep.
    fn select_power_down(&mut self) -> Result<(), PowerError>;

    /// Run `f` with interrupts masked; they are unmasked again on return.
    fn without_interrupts<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized;

    /// Timed brown-out detector disable. Only valid inside
    /// [`without_interrupts`](Self::without_interrupts).
    fn disable_brown_out(&mut self);

    /// Enter the low-power state. Returns once an enabled wake source fired;
    /// the backend posts the reason to `signal`.
    fn cpu_sleep(&mut self, signal: &WakeSignal) -> Result<(), PowerError>;

    fn detach_edge_wake(&mut self) -> Result<(), PowerError>;

    /// Clear the sleep request (and anything step 4 changed).
    fn clear_sleep_request(&mut self);
}

/// Sleep backend errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerError {
    /// Wake source unavailable on this node (e.g. edge wake without a sensor pin).
    Unsupported(&'static str),
    /// Error reported by the platform sleep API.
    Backend(String),
}

impl fmt::Display for PowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(what) => write!(f, "unsupported wake source: {}", what),
            Self::Backend(msg) => write!(f, "sleep backend error: {}", msg),
        }
    }
}

impl std::error::Error for PowerError {}

/// Puts the node to sleep and reports why it woke.
pub struct WakeScheduler<P> {
    control: P,
    signal: WakeSignal,
    timer_period: Duration,
    sleeps: u32,
}

impl<P: SleepControl> WakeScheduler<P> {
    /// `timer_period` is used whenever a [`WakeSource::Timer`] sleep is requested.
    pub fn new(control: P, ticks: &IdleTicks, timer_period: Duration) -> Self {
        Self {
            control,
            signal: ticks.wake_signal(),
            timer_period,
            sleeps: 0,
        }
    }

    /// Handle to give to interrupt handlers.
    pub fn signal(&self) -> WakeSignal {
        self.signal.clone()
    }

    /// Completed sleep cycles.
    pub fn sleeps(&self) -> u32 {
        self.sleeps
    }

    pub fn control(&self) -> &P {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut P {
        &mut self.control
    }

    /// Sleep until `source` (or any other enabled source) fires.
    ///
    /// `sensor_active` is the sensor level last acted on; an edge wake fires
    /// on any difference from it. Timer sleeps ignore it.
    /// [`WakeSource::None`] arms nothing, so only an already-enabled source
    /// can end the sleep. Returns the reason posted by the wake handler;
    /// `WakeSource::None` means the wake was spurious.
    pub fn sleep(
        &mut self,
        source: WakeSource,
        sensor_active: bool,
    ) -> Result<WakeSource, PowerError> {
        let edge = source == WakeSource::Edge;

        // A reason posted while awake must not be mistaken for this wake.
        self.signal.take();

        info!("Sleeping ({:?} wake)...", source);

        match source {
            WakeSource::Edge => self.control.arm_edge_wake(sensor_active)?,
            WakeSource::Timer => self.control.arm_timer_wake(self.timer_period)?,
            WakeSource::None => {}
        }

        let prepared = self
            .control
            .disable_analog()
            .and_then(|()| self.control.select_power_down());

        let slept = match prepared {
            Ok(()) => {
                self.control.without_interrupts(|c| c.disable_brown_out());
                self.control.cpu_sleep(&self.signal)
            }
            Err(e) => Err(e),
        };

        let restored = self.control.without_interrupts(|c| {
            let detached = if edge {
                c.detach_edge_wake()
            } else {
                Ok(())
            };
            c.clear_sleep_request();
            detached
        });

        slept?;
        restored?;

        self.sleeps = self.sleeps.wrapping_add(1);
        let woke_by = self.signal.take();
        match woke_by {
            WakeSource::None => debug!("Wakeup without a posted reason"),
            reason => info!("Wakeup ({:?})", reason),
        }
        Ok(woke_by)
    }
}
