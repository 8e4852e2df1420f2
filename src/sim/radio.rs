use super::Air;
use crate::radio::{DataRate, PipeAddress, RadioError, RadioLink, MAX_CHANNEL, MAX_PAYLOAD_LEN};
use log::debug;

/// [`RadioLink`] endpoint on a simulated [`Air`] channel.
pub struct SimRadio {
    air: Air,
    endpoint: usize,
    opened: bool,
    powered: bool,
    listening: bool,
    auto_ack: bool,
    retries: u8,
    pipe: Option<PipeAddress>,
}

impl SimRadio {
    pub fn new(air: &Air) -> Self {
        Self {
            air: air.clone(),
            endpoint: air.register(),
            opened: false,
            powered: false,
            listening: false,
            auto_ack: true,
            retries: 0,
            pipe: None,
        }
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    fn ensure_open(&self) -> Result<(), RadioError> {
        if self.opened {
            Ok(())
        } else {
            Err(RadioError::NotOpen)
        }
    }

    /// The receiver only hears the air while powered and in RX mode.
    fn sync_listening(&self) {
        self.air
            .set_listening(self.endpoint, self.opened && self.powered && self.listening);
    }
}

impl RadioLink for SimRadio {
    fn open(&mut self, channel: u8, data_rate: DataRate) -> Result<(), RadioError> {
        if channel > MAX_CHANNEL {
            return Err(RadioError::InvalidChannel(channel));
        }
        debug!("sim radio {}: channel {}, {}", self.endpoint, channel, data_rate);
        self.opened = true;
        self.powered = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RadioError> {
        self.opened = false;
        self.powered = false;
        self.listening = false;
        self.sync_listening();
        Ok(())
    }

    fn set_auto_ack(&mut self, enabled: bool) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.auto_ack = enabled;
        Ok(())
    }

    fn set_retry_policy(&mut self, _delay_units: u8, max_retries: u8) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.retries = max_retries;
        Ok(())
    }

    fn open_write_pipe(&mut self, address: PipeAddress) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.pipe = Some(address);
        Ok(())
    }

    fn open_read_pipe(&mut self, address: PipeAddress) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.pipe = Some(address);
        Ok(())
    }

    fn start_listening(&mut self) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.powered = true;
        self.listening = true;
        self.sync_listening();
        Ok(())
    }

    fn stop_listening(&mut self) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.listening = false;
        self.sync_listening();
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.powered = true;
        self.sync_listening();
        Ok(())
    }

    fn power_down(&mut self) -> Result<(), RadioError> {
        self.ensure_open()?;
        self.powered = false;
        self.sync_listening();
        Ok(())
    }

    fn try_send(&mut self, payload: &[u8]) -> Result<bool, RadioError> {
        self.ensure_open()?;
        if payload.is_empty() {
            return Err(RadioError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(RadioError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        if !self.powered || self.listening {
            return Ok(false);
        }
        Ok(self
            .air
            .transmit(self.endpoint, payload, self.auto_ack, self.retries))
    }

    fn has_data(&mut self) -> Result<bool, RadioError> {
        self.ensure_open()?;
        Ok(self.air.queued() > 0)
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<bool, RadioError> {
        self.ensure_open()?;
        buffer.fill(0);
        match self.air.pop() {
            Some((payload, empty)) => {
                let n = payload.len().min(buffer.len());
                buffer[..n].copy_from_slice(&payload[..n]);
                Ok(empty)
            }
            None => Ok(true),
        }
    }
}
