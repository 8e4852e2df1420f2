//! `esp-idf-hal` adapters for the strap pin and the diagnostic UART.

use super::DiagnosticInput;
use crate::link::StrapPin;
use esp_idf_hal::delay::NON_BLOCK;
use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use esp_idf_hal::uart::UartDriver;
use log::warn;

impl StrapPin for PinDriver<'_, AnyIOPin, Input> {
    fn pull_active(&mut self) {
        if let Err(e) = self.set_pull(Pull::Up) {
            warn!("Strap pull-up failed: {}", e);
        }
    }

    fn is_active(&mut self) -> bool {
        self.is_high()
    }

    fn release(&mut self) {
        if let Err(e) = self.set_pull(Pull::Floating) {
            warn!("Strap release failed: {}", e);
        }
    }
}

impl DiagnosticInput for UartDriver<'_> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte, NON_BLOCK) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}
