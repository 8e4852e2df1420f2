use super::SimSensor;
use crate::board::Board;
use crate::link::{LinkError, StrapPin};
use embedded_hal::delay::DelayNs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

/// Real-time delay divided by a speed-up factor.
#[derive(Debug, Clone, Copy)]
pub struct SimDelay {
    speedup: u32,
}

impl SimDelay {
    pub fn new(speedup: u32) -> Self {
        Self {
            speedup: speedup.max(1),
        }
    }

    pub fn scale(&self, period: Duration) -> Duration {
        period / self.speedup
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let scaled = self.scale(Duration::from_nanos(u64::from(ns)));
        if !scaled.is_zero() {
            std::thread::sleep(scaled);
        }
    }
}

/// Indicator output observable from other threads.
#[derive(Debug, Clone, Default)]
pub struct SimIndicator(Arc<AtomicBool>);

impl SimIndicator {
    pub fn is_on(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, on: bool) {
        self.0.store(on, Ordering::Release);
    }
}

/// Strap jumper fitted (REMOTE) or not (LED).
#[derive(Debug, Clone, Copy)]
pub struct SimStrap {
    fitted: bool,
    pulled: bool,
}

impl SimStrap {
    pub fn new(fitted: bool) -> Self {
        Self {
            fitted,
            pulled: false,
        }
    }
}

impl StrapPin for SimStrap {
    fn pull_active(&mut self) {
        self.pulled = true;
    }

    fn is_active(&mut self) -> bool {
        self.pulled && self.fitted
    }

    fn release(&mut self) {
        self.pulled = false;
    }
}

/// [`Board`] over simulated IO.
pub struct SimBoard {
    sensor: Option<SimSensor>,
    indicator: SimIndicator,
    delay: SimDelay,
    diagnostics: Option<Receiver<u8>>,
}

impl SimBoard {
    /// `sensor` is `None` for an LED node, which never reads it.
    pub fn new(sensor: Option<SimSensor>, delay: SimDelay) -> Self {
        Self {
            sensor,
            indicator: SimIndicator::default(),
            delay,
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, rx: Receiver<u8>) -> Self {
        self.diagnostics = Some(rx);
        self
    }

    pub fn indicator(&self) -> SimIndicator {
        self.indicator.clone()
    }
}

impl Board for SimBoard {
    fn read_sensor(&mut self) -> Result<bool, LinkError> {
        Ok(self.sensor.as_ref().is_some_and(SimSensor::is_active))
    }

    fn set_indicator(&mut self, on: bool) -> Result<(), LinkError> {
        self.indicator.set(on);
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn poll_diagnostic(&mut self) -> Option<u8> {
        self.diagnostics.as_ref()?.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Role;

    #[test]
    fn test_strap_resolves_role() {
        let mut delay = SimDelay::new(1000);
        assert_eq!(
            Role::resolve(&mut SimStrap::new(true), &mut delay, 20),
            Role::Remote
        );
        assert_eq!(
            Role::resolve(&mut SimStrap::new(false), &mut delay, 20),
            Role::Led
        );
    }

    #[test]
    fn test_board_reads_shared_sensor() {
        let sensor = SimSensor::new(false);
        let mut board = SimBoard::new(Some(sensor.clone()), SimDelay::new(1000));
        assert_eq!(board.read_sensor(), Ok(false));
        sensor.set(true);
        assert_eq!(board.read_sensor(), Ok(true));
    }

    #[test]
    fn test_indicator_visible_through_handle() {
        let mut board = SimBoard::new(None, SimDelay::new(1000));
        let indicator = board.indicator();
        board.set_indicator(true).unwrap();
        assert!(indicator.is_on());
    }

    #[test]
    fn test_diagnostics_polled_without_blocking() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut board = SimBoard::new(None, SimDelay::new(1000)).with_diagnostics(rx);
        assert_eq!(board.poll_diagnostic(), None);
        tx.send(b'd').unwrap();
        assert_eq!(board.poll_diagnostic(), Some(b'd'));
    }
}
