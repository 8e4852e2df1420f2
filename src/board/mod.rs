//! Board-level IO used by the link protocol.
//!
//! The state machine talks to a [`Board`]; [`PinBoard`] implements it on top
//! of `embedded-hal` pins, so the ESP32 build passes `esp-idf-hal` drivers
//! and host tests pass fakes.
//!
//! # Pin Configuration (ESP32 DevKit)
//!
//! | Signal | GPIO | Notes |
//! |--------|------|-------|
//! | Role strap | 25 | Pulled up at boot; high = REMOTE |
//! | Sensor | 26 | Active-low, internal pull-up (REMOTE only) |
//! | Indicator | 2 | On-board LED |

use crate::link::LinkError;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorType, InputPin, OutputPin};
use std::convert::Infallible;

#[cfg(feature = "esp32")]
mod esp32;

/// Physical IO needed by one node.
pub trait Board {
    /// Logical sensor state, `true` when active.
    fn read_sensor(&mut self) -> Result<bool, LinkError>;

    fn set_indicator(&mut self, on: bool) -> Result<(), LinkError>;

    fn delay_ms(&mut self, ms: u32);

    /// Next byte from the diagnostic side channel, if one is waiting.
    /// Must not block.
    fn poll_diagnostic(&mut self) -> Option<u8>;
}

/// Non-blocking byte source for the diagnostic side channel.
pub trait DiagnosticInput {
    fn read_byte(&mut self) -> Option<u8>;
}

/// Diagnostic input that never has data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl DiagnosticInput for NoDiagnostics {
    fn read_byte(&mut self) -> Option<u8> {
        None
    }
}

/// Sensor stand-in for nodes without one. Reads as the idle (pulled-up) level.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensor;

impl ErrorType for NoSensor {
    type Error = Infallible;
}

impl InputPin for NoSensor {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(false)
    }
}

/// [`Board`] over `embedded-hal` pins.
pub struct PinBoard<S, O, D, G = NoDiagnostics> {
    sensor: S,
    indicator: O,
    delay: D,
    diagnostics: G,
}

impl<S, O, D> PinBoard<S, O, D, NoDiagnostics> {
    pub fn new(sensor: S, indicator: O, delay: D) -> Self {
        Self::with_diagnostics(sensor, indicator, delay, NoDiagnostics)
    }
}

impl<S, O, D, G> PinBoard<S, O, D, G> {
    pub fn with_diagnostics(sensor: S, indicator: O, delay: D, diagnostics: G) -> Self {
        Self {
            sensor,
            indicator,
            delay,
            diagnostics,
        }
    }

    pub fn indicator(&self) -> &O {
        &self.indicator
    }
}

impl<S, O, D, G> Board for PinBoard<S, O, D, G>
where
    S: InputPin,
    O: OutputPin,
    D: DelayNs,
    G: DiagnosticInput,
{
    fn read_sensor(&mut self) -> Result<bool, LinkError> {
        // Active-low: the contact pulls the pin to ground.
        self.sensor.is_low().map_err(|e| LinkError::Gpio(e.kind()))
    }

    fn set_indicator(&mut self, on: bool) -> Result<(), LinkError> {
        let result = if on {
            self.indicator.set_high()
        } else {
            self.indicator.set_low()
        };
        result.map_err(|e| LinkError::Gpio(e.kind()))
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn poll_diagnostic(&mut self) -> Option<u8> {
        self.diagnostics.read_byte()
    }
}
