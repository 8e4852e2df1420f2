//! nRF24L01+ driver.
//!
//! Implements [`RadioLink`] over any `embedded-hal` SPI device plus a CE
//! output pin, so the same code runs against `esp-idf-hal` drivers on the
//! board and against a register-file fake in tests.
//!
//! # Wiring (ESP32 DevKit)
//!
//! | Signal | GPIO | Notes |
//! |--------|------|-------|
//! | SPI CLK | 18 | |
//! | SPI MOSI | 23 | |
//! | SPI MISO | 19 | |
//! | CSN | 5 | Chip select, driven by the SPI device |
//! | CE | 4 | TX pulse / RX enable |
//!
//! The radio only uses static payloads, 5-byte addresses and 16-bit CRC.

use super::config::{MAX_CHANNEL, MAX_PAYLOAD_LEN, MAX_RETRY_FIELD};
use super::{DataRate, PipeAddress, RadioError, RadioLink};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};
use embedded_hal::spi::{Error as _, SpiDevice};
use log::{debug, trace};

// Commands
const R_REGISTER: u8 = 0x00;
const W_REGISTER: u8 = 0x20;
const R_RX_PAYLOAD: u8 = 0x61;
const W_TX_PAYLOAD: u8 = 0xA0;
const FLUSH_TX: u8 = 0xE1;
const FLUSH_RX: u8 = 0xE2;
const NOP: u8 = 0xFF;

// Registers
const CONFIG: u8 = 0x00;
const EN_AA: u8 = 0x01;
const EN_RXADDR: u8 = 0x02;
const SETUP_AW: u8 = 0x03;
const SETUP_RETR: u8 = 0x04;
const RF_CH: u8 = 0x05;
const RF_SETUP: u8 = 0x06;
const STATUS: u8 = 0x07;
const RX_ADDR_P0: u8 = 0x0A;
const RX_ADDR_P1: u8 = 0x0B;
const TX_ADDR: u8 = 0x10;
const RX_PW_P0: u8 = 0x11;
const RX_PW_P1: u8 = 0x12;
const FIFO_STATUS: u8 = 0x17;
const DYNPD: u8 = 0x1C;
const FEATURE: u8 = 0x1D;

// CONFIG bits
const EN_CRC: u8 = 1 << 3;
const CRCO: u8 = 1 << 2;
const PWR_UP: u8 = 1 << 1;
const PRIM_RX: u8 = 1 << 0;

// STATUS bits
const RX_DR: u8 = 1 << 6;
const TX_DS: u8 = 1 << 5;
const MAX_RT: u8 = 1 << 4;

// FIFO_STATUS bits
const RX_EMPTY: u8 = 1 << 0;

// RF_SETUP bits
const RF_DR_LOW: u8 = 1 << 5;
const RF_DR_HIGH: u8 = 1 << 3;
const RF_PWR_MAX: u8 = 0b110;

/// All six pipes auto-acknowledged.
const EN_AA_ALL: u8 = 0x3F;

/// SETUP_AW value for 5-byte addresses.
const AW_5_BYTES: u8 = 0b11;

/// Power-on reset / power-down to standby settle time.
const POWER_UP_DELAY_MS: u32 = 5;

/// Standby to RX/TX settle time.
const RX_SETTLE_US: u32 = 130;

/// Minimum CE high pulse to start a transmission.
const CE_PULSE_US: u32 = 15;

/// Give up waiting for TX_DS/MAX_RT after this long. Worst case at 250kbps
/// with 15 retries at the longest delay is about 70ms.
const TX_TIMEOUT_MS: u32 = 95;

/// nRF24L01+ transceiver.
pub struct Nrf24<SPI, CE, D> {
    spi: SPI,
    ce: CE,
    delay: D,
    payload_len: usize,
    opened: bool,
}

impl<SPI, CE, D> Nrf24<SPI, CE, D>
where
    SPI: SpiDevice,
    CE: OutputPin,
    D: DelayNs,
{
    /// Wrap an SPI device and CE pin. Nothing is written until [`RadioLink::open`].
    pub fn new(spi: SPI, ce: CE, delay: D, payload_len: usize) -> Self {
        Self {
            spi,
            ce,
            delay,
            payload_len: payload_len.clamp(1, MAX_PAYLOAD_LEN),
            opened: false,
        }
    }

    /// Give back the bus, pin and delay.
    pub fn free(self) -> (SPI, CE, D) {
        (self.spi, self.ce, self.delay)
    }

    fn transfer(&mut self, buf: &mut [u8]) -> Result<u8, RadioError> {
        self.spi
            .transfer_in_place(buf)
            .map_err(|e| RadioError::Spi(e.kind()))?;
        Ok(buf[0])
    }

    fn command(&mut self, cmd: u8) -> Result<u8, RadioError> {
        self.transfer(&mut [cmd])
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, RadioError> {
        let mut buf = [R_REGISTER | reg, 0];
        self.transfer(&mut buf)?;
        Ok(buf[1])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), RadioError> {
        self.transfer(&mut [W_REGISTER | reg, value])?;
        Ok(())
    }

    fn write_address(&mut self, reg: u8, address: PipeAddress) -> Result<(), RadioError> {
        let mut buf = [0u8; 1 + PipeAddress::WIDTH];
        buf[0] = W_REGISTER | reg;
        buf[1..].copy_from_slice(&address.to_bytes());
        self.transfer(&mut buf)?;
        Ok(())
    }

    fn update_config(&mut self, set: u8, clear: u8) -> Result<u8, RadioError> {
        let config = (self.read_register(CONFIG)? | set) & !clear;
        self.write_register(CONFIG, config)?;
        Ok(config)
    }

    fn ce(&mut self, high: bool) -> Result<(), RadioError> {
        let result = if high {
            self.ce.set_high()
        } else {
            self.ce.set_low()
        };
        result.map_err(|e| RadioError::ChipEnable(e.kind()))
    }

    fn ensure_open(&self) -> Result<(), RadioError> {
        if self.opened {
            Ok(())
        } else {
            Err(RadioError::NotOpen)
        }
    }

    fn clear_status(&mut self) -> Result<(), RadioError> {
        self.write_register(STATUS, RX_DR | TX_DS | MAX_RT)
    }

    /// Poll STATUS until the transmission either completed or ran out of
    /// hardware retries.
    fn wait_tx_result(&mut self) -> Result<u8, RadioError> {
        for _ in 0..TX_TIMEOUT_MS {
            let status = self.command(NOP)?;
            if status & (TX_DS | MAX_RT) != 0 {
                return Ok(status);
            }
            self.delay.delay_ms(1);
        }
        Err(RadioError::Timeout)
    }
}

fn rf_setup_for(data_rate: DataRate) -> u8 {
    let rate_bits = match data_rate {
        DataRate::Kbps250 => RF_DR_LOW,
        DataRate::Mbps1 => 0,
        DataRate::Mbps2 => RF_DR_HIGH,
    };
    rate_bits | RF_PWR_MAX
}

impl<SPI, CE, D> RadioLink for Nrf24<SPI, CE, D>
where
    SPI: SpiDevice,
    CE: OutputPin,
    D: DelayNs,
{
    fn open(&mut self, channel: u8, data_rate: DataRate) -> Result<(), RadioError> {
        if channel > MAX_CHANNEL {
            return Err(RadioError::InvalidChannel(channel));
        }

        self.ce(false)?;
        self.delay.delay_ms(POWER_UP_DELAY_MS);

        let width = self.payload_len as u8;
        self.write_register(CONFIG, EN_CRC | CRCO)?;
        self.write_register(SETUP_AW, AW_5_BYTES)?;
        self.write_register(RF_CH, channel)?;
        self.write_register(RF_SETUP, rf_setup_for(data_rate))?;
        self.write_register(RX_PW_P0, width)?;
        self.write_register(RX_PW_P1, width)?;
        self.write_register(DYNPD, 0)?;
        self.write_register(FEATURE, 0)?;
        self.clear_status()?;
        self.command(FLUSH_RX)?;
        self.command(FLUSH_TX)?;

        self.opened = true;
        debug!(
            "nRF24 opened: channel {}, {}, {}-byte payload",
            channel, data_rate, width
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), RadioError> {
        if !self.opened {
            return Ok(());
        }
        self.power_down()?;
        self.opened = false;
        Ok(())
    }

    fn set_auto_ack(&mut self, enabled: bool) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.write_register(EN_AA, if enabled { EN_AA_ALL } else { 0 })
    }

    fn set_retry_policy(&mut self, delay_units: u8, max_retries: u8) -> Result<(), RadioError> {
        self.ensure_open()?;
        let delay = delay_units.min(MAX_RETRY_FIELD);
        let count = max_retries.min(MAX_RETRY_FIELD);
        self.write_register(SETUP_RETR, (delay << 4) | count)
    }

    fn open_write_pipe(&mut self, address: PipeAddress) -> Result<(), RadioError> {
        self.ensure_open()?;
        let width = self.payload_len as u8;
        // Pipe 0 receives the auto-ack, so it mirrors the TX address.
        self.write_address(RX_ADDR_P0, address)?;
        self.write_address(TX_ADDR, address)?;
        self.write_register(RX_PW_P0, width)
    }

    fn open_read_pipe(&mut self, address: PipeAddress) -> Result<(), RadioError> {
        self.ensure_open()?;
        let width = self.payload_len as u8;
        self.write_address(RX_ADDR_P1, address)?;
        self.write_register(RX_PW_P1, width)?;
        let enabled = self.read_register(EN_RXADDR)?;
        self.write_register(EN_RXADDR, enabled | 0b10)
    }

    fn start_listening(&mut self) -> Result<(), RadioError> {
        self.ensure_open()?;
        let before = self.read_register(CONFIG)?;
        self.write_register(CONFIG, before | PWR_UP | PRIM_RX)?;
        if before & PWR_UP == 0 {
            self.delay.delay_ms(POWER_UP_DELAY_MS);
        }
        self.clear_status()?;
        self.ce(true)?;
        self.delay.delay_us(RX_SETTLE_US);
        trace!("nRF24 listening");
        Ok(())
    }

    fn stop_listening(&mut self) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.ce(false)?;
        self.delay.delay_us(RX_SETTLE_US);
        self.update_config(0, PRIM_RX)?;
        let enabled = self.read_register(EN_RXADDR)?;
        self.write_register(EN_RXADDR, enabled | 0b01)?;
        trace!("nRF24 stopped listening");
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), RadioError> {
        self.ensure_open()?;
        let config = self.read_register(CONFIG)?;
        if config & PWR_UP == 0 {
            self.write_register(CONFIG, config | PWR_UP)?;
            self.delay.delay_ms(POWER_UP_DELAY_MS);
        }
        Ok(())
    }

    fn power_down(&mut self) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.ce(false)?;
        self.update_config(0, PWR_UP)?;
        Ok(())
    }

    fn try_send(&mut self, payload: &[u8]) -> Result<bool, RadioError> {
        self.ensure_open()?;
        if payload.is_empty() {
            return Err(RadioError::EmptyPayload);
        }
        let width = self.payload_len;
        if payload.len() > width {
            return Err(RadioError::PayloadTooLarge {
                size: payload.len(),
                max: width,
            });
        }

        let mut buf = [0u8; 1 + MAX_PAYLOAD_LEN];
        buf[0] = W_TX_PAYLOAD;
        buf[1..=payload.len()].copy_from_slice(payload);
        self.transfer(&mut buf[..=width])?;

        self.ce(true)?;
        self.delay.delay_us(CE_PULSE_US);
        let result = self.wait_tx_result();
        self.ce(false)?;
        let status = match result {
            Ok(status) => status,
            Err(e) => {
                // Drop the stuck payload so the next one is not queued behind it.
                self.clear_status()?;
                self.command(FLUSH_TX)?;
                return Err(e);
            }
        };

        self.clear_status()?;
        if status & MAX_RT != 0 {
            // A payload that hit MAX_RT stays in the TX FIFO until flushed.
            self.command(FLUSH_TX)?;
            return Ok(false);
        }
        Ok(true)
    }

    fn has_data(&mut self) -> Result<bool, RadioError> {
        self.ensure_open()?;
        Ok(self.read_register(FIFO_STATUS)? & RX_EMPTY == 0)
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<bool, RadioError> {
        self.ensure_open()?;
        let width = self.payload_len;
        let mut buf = [0u8; 1 + MAX_PAYLOAD_LEN];
        buf[0] = R_RX_PAYLOAD;
        self.transfer(&mut buf[..=width])?;

        let n = buffer.len().min(width);
        buffer[..n].copy_from_slice(&buf[1..=n]);

        self.write_register(STATUS, RX_DR)?;
        Ok(self.read_register(FIFO_STATUS)? & RX_EMPTY != 0)
    }
}
