//! Sleep and wake handling.
//!
//! - [`ticks`]: idle counter and the interrupt-side wake signal
//! - [`scheduler`]: ordered sleep sequence over a [`SleepControl`] backend
//! - `esp32`: light-sleep backend (ESP32 only)

mod scheduler;
mod ticks;

#[cfg(feature = "esp32")]
mod esp32;

pub use scheduler::{PowerError, SleepControl, WakeScheduler};
pub use ticks::{IdleTicks, WakeSignal, WakeSource};

#[cfg(feature = "esp32")]
pub use esp32::EspSleep;
