use log::warn;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Level {
    active: bool,
    changes: u64,
}

/// Shared sensor level. Cloning yields another handle to the same sensor.
///
/// Writers flip it from any thread; [`SimSleep`](super::SimSleep) waits on
/// it to emulate the pin-change wake.
#[derive(Debug, Clone, Default)]
pub struct SimSensor {
    inner: Arc<(Mutex<Level>, Condvar)>,
}

impl SimSensor {
    pub fn new(active: bool) -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(Level { active, changes: 0 }),
                Condvar::new(),
            )),
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Level changes so far.
    pub fn changes(&self) -> u64 {
        self.lock().changes
    }

    pub fn set(&self, active: bool) {
        let mut level = self.lock();
        if level.active != active {
            level.active = active;
            level.changes += 1;
            self.inner.1.notify_all();
        }
    }

    /// Flip the level and return the new one.
    pub fn toggle(&self) -> bool {
        let mut level = self.lock();
        level.active = !level.active;
        level.changes += 1;
        self.inner.1.notify_all();
        level.active
    }

    /// Block until the sensor reads other than `stored` or changes again
    /// after `seen` changes, or `timeout` passes. Returns whether it did.
    /// Returns at once if it already differs from `stored`.
    pub fn wait_for_change(&self, stored: bool, seen: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut level = self.lock();
        while level.active == stored && level.changes == seen {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            level = match self.inner.1.wait_timeout(level, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Level> {
        match self.inner.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Sensor mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_counts_only_real_changes() {
        let sensor = SimSensor::new(false);
        sensor.set(false);
        sensor.set(true);
        sensor.set(true);
        assert_eq!(sensor.changes(), 1);
        assert!(sensor.is_active());
    }

    #[test]
    fn test_wait_times_out_without_change() {
        let sensor = SimSensor::new(false);
        assert!(!sensor.wait_for_change(false, 0, Duration::from_millis(10)));
    }

    #[test]
    fn test_wait_returns_at_once_when_level_already_differs() {
        let sensor = SimSensor::new(false);
        sensor.set(true);
        let seen = sensor.changes();
        assert!(sensor.wait_for_change(false, seen, Duration::ZERO));
    }

    #[test]
    fn test_wait_sees_change_from_other_thread() {
        let sensor = SimSensor::new(false);
        let writer = sensor.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            writer.toggle();
        });
        assert!(sensor.wait_for_change(false, 0, Duration::from_secs(5)));
        handle.join().unwrap();
    }
}
