use super::{SimDelay, SimSensor};
use crate::power::{PowerError, SleepControl, WakeSignal, WakeSource};
use log::{debug, trace};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Granularity at which a sleeping node notices cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Armed {
    Edge { stored: bool, seen: u64 },
    Timer(Duration),
}

/// [`SleepControl`] for simulated nodes.
///
/// A timer sleep blocks the calling thread for the scaled period; an edge
/// sleep blocks until the [`SimSensor`] changes. Both return early, without
/// posting a wake reason, once `cancel` fires.
pub struct SimSleep {
    sensor: Option<SimSensor>,
    delay: SimDelay,
    cancel: CancellationToken,
    armed: Option<Armed>,
}

impl SimSleep {
    pub fn new(sensor: Option<SimSensor>, delay: SimDelay, cancel: CancellationToken) -> Self {
        Self {
            sensor,
            delay,
            cancel,
            armed: None,
        }
    }

    fn sleep_timer(&self, period: Duration, signal: &WakeSignal) {
        let deadline = Instant::now() + self.delay.scale(period);
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                signal.fire(WakeSource::Timer);
                return;
            }
            std::thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }

    fn sleep_edge(&self, sensor: &SimSensor, stored: bool, seen: u64, signal: &WakeSignal) {
        while !self.cancel.is_cancelled() {
            if sensor.wait_for_change(stored, seen, CANCEL_POLL) {
                signal.fire(WakeSource::Edge);
                return;
            }
        }
    }
}

impl SleepControl for SimSleep {
    fn arm_edge_wake(&mut self, sensor_active: bool) -> Result<(), PowerError> {
        let sensor = self
            .sensor
            .as_ref()
            .ok_or(PowerError::Unsupported("edge wake without a sensor"))?;
        self.armed = Some(Armed::Edge {
            stored: sensor_active,
            seen: sensor.changes(),
        });
        Ok(())
    }

    fn arm_timer_wake(&mut self, period: Duration) -> Result<(), PowerError> {
        self.armed = Some(Armed::Timer(period));
        Ok(())
    }

    fn disable_analog(&mut self) -> Result<(), PowerError> {
        trace!("sim: analog off");
        Ok(())
    }

    fn select_power_down(&mut self) -> Result<(), PowerError> {
        trace!("sim: power-down selected");
        Ok(())
    }

    fn without_interrupts<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        f(self)
    }

    fn disable_brown_out(&mut self) {
        trace!("sim: brown-out detector off");
    }

    fn cpu_sleep(&mut self, signal: &WakeSignal) -> Result<(), PowerError> {
        match self.armed {
            Some(Armed::Timer(period)) => self.sleep_timer(period, signal),
            Some(Armed::Edge { stored, seen }) => {
                if let Some(sensor) = &self.sensor {
                    self.sleep_edge(sensor, stored, seen, signal);
                }
            }
            None => debug!("sim: sleep with no wake source armed"),
        }
        Ok(())
    }

    fn detach_edge_wake(&mut self) -> Result<(), PowerError> {
        if matches!(self.armed, Some(Armed::Edge { .. })) {
            self.armed = None;
        }
        Ok(())
    }

    fn clear_sleep_request(&mut self) {
        self.armed = None;
    }
}
