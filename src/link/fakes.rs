//! Scripted radio, board and sleep backends for state machine tests.

use super::{LinkConfig, LinkError, LinkStateMachine};
use crate::board::Board;
use crate::power::{PowerError, SleepControl, WakeSignal, WakeSource};
use crate::radio::{DataRate, PipeAddress, RadioError, RadioLink};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Open(u8, DataRate),
    Close,
    AutoAck(bool),
    RetryPolicy(u8, u8),
    WritePipe(PipeAddress),
    ReadPipe(PipeAddress),
    StartListening,
    StopListening,
    PowerUp,
    PowerDown,
    Send(Vec<u8>),
}

#[derive(Debug, Default)]
pub struct FakeRadio {
    pub calls: Vec<RadioCall>,
    pub sent: Vec<Vec<u8>>,
    /// Per-attempt results; `acks` once exhausted.
    pub send_script: VecDeque<bool>,
    pub acks: bool,
    pub rx: VecDeque<Vec<u8>>,
    /// Report more data pending after every read.
    pub always_more: bool,
    pub receive_fails_after: Option<usize>,
    pub receives: usize,
    pub power_up_fails: bool,
    pub powered: bool,
    pub listening: bool,
}

impl FakeRadio {
    pub fn acking() -> Self {
        Self {
            acks: true,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn scripted(results: &[bool]) -> Self {
        Self {
            send_script: results.iter().copied().collect(),
            acks: true,
            ..Default::default()
        }
    }

    pub fn receiving(payloads: &[&[u8]]) -> Self {
        Self {
            rx: payloads.iter().map(|p| p.to_vec()).collect(),
            ..Default::default()
        }
    }

    pub fn queue(&mut self, payload: &[u8]) {
        self.rx.push_back(payload.to_vec());
    }
}

impl RadioLink for FakeRadio {
    fn open(&mut self, channel: u8, data_rate: DataRate) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Open(channel, data_rate));
        self.powered = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Close);
        self.powered = false;
        self.listening = false;
        Ok(())
    }

    fn set_auto_ack(&mut self, enabled: bool) -> Result<(), RadioError> {
        self.calls.push(RadioCall::AutoAck(enabled));
        Ok(())
    }

    fn set_retry_policy(&mut self, delay_units: u8, max_retries: u8) -> Result<(), RadioError> {
        self.calls.push(RadioCall::RetryPolicy(delay_units, max_retries));
        Ok(())
    }

    fn open_write_pipe(&mut self, address: PipeAddress) -> Result<(), RadioError> {
        self.calls.push(RadioCall::WritePipe(address));
        Ok(())
    }

    fn open_read_pipe(&mut self, address: PipeAddress) -> Result<(), RadioError> {
        self.calls.push(RadioCall::ReadPipe(address));
        Ok(())
    }

    fn start_listening(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::StartListening);
        self.powered = true;
        self.listening = true;
        Ok(())
    }

    fn stop_listening(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::StopListening);
        self.listening = false;
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::PowerUp);
        if self.power_up_fails {
            return Err(RadioError::Timeout);
        }
        self.powered = true;
        Ok(())
    }

    fn power_down(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::PowerDown);
        self.powered = false;
        Ok(())
    }

    fn try_send(&mut self, payload: &[u8]) -> Result<bool, RadioError> {
        self.calls.push(RadioCall::Send(payload.to_vec()));
        self.sent.push(payload.to_vec());
        Ok(self.send_script.pop_front().unwrap_or(self.acks))
    }

    fn has_data(&mut self) -> Result<bool, RadioError> {
        Ok(!self.rx.is_empty())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<bool, RadioError> {
        if self.receive_fails_after.is_some_and(|limit| self.receives >= limit) {
            return Err(RadioError::Device("rx fifo read failed".into()));
        }
        self.receives += 1;
        let payload = self.rx.pop_front().unwrap_or_default();
        buffer.fill(0);
        let n = payload.len().min(buffer.len());
        buffer[..n].copy_from_slice(&payload[..n]);
        Ok(!self.always_more && self.rx.is_empty())
    }
}

#[derive(Debug, Default)]
pub struct FakeBoard {
    /// Successive sensor readings; the last one repeats.
    pub sensor: Vec<bool>,
    pub reads: usize,
    pub sensor_fails_after: Option<usize>,
    pub indicator_writes: Vec<bool>,
    pub delays: Vec<u32>,
    pub diagnostics: VecDeque<u8>,
}

impl FakeBoard {
    pub fn with_sensor(readings: &[bool]) -> Self {
        Self {
            sensor: readings.to_vec(),
            ..Default::default()
        }
    }
}

impl Board for FakeBoard {
    fn read_sensor(&mut self) -> Result<bool, LinkError> {
        if self.sensor_fails_after.is_some_and(|limit| self.reads >= limit) {
            return Err(LinkError::Gpio(embedded_hal::digital::ErrorKind::Other));
        }
        let value = self
            .sensor
            .get(self.reads)
            .or(self.sensor.last())
            .copied()
            .unwrap_or(false);
        self.reads += 1;
        Ok(value)
    }

    fn set_indicator(&mut self, on: bool) -> Result<(), LinkError> {
        self.indicator_writes.push(on);
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }

    fn poll_diagnostic(&mut self) -> Option<u8> {
        self.diagnostics.pop_front()
    }
}

/// Sleep backend that returns immediately. Unless told otherwise it reports
/// the source that was armed.
#[derive(Debug, Default)]
pub struct FakeSleep {
    pub wake_override: Option<WakeSource>,
    pub armed: Option<WakeSource>,
    pub edge_arms: u32,
    pub timer_arms: u32,
    pub edge_armed: bool,
    /// Stored sensor level the last edge wake was armed against.
    pub edge_level: Option<bool>,
    pub timer_period: Option<Duration>,
    pub sleeps: u32,
}

impl FakeSleep {
    pub fn waking_with(source: WakeSource) -> Self {
        Self {
            wake_override: Some(source),
            ..Default::default()
        }
    }
}

impl SleepControl for FakeSleep {
    fn arm_edge_wake(&mut self, sensor_active: bool) -> Result<(), PowerError> {
        self.edge_arms += 1;
        self.edge_armed = true;
        self.edge_level = Some(sensor_active);
        self.armed = Some(WakeSource::Edge);
        Ok(())
    }

    fn arm_timer_wake(&mut self, period: Duration) -> Result<(), PowerError> {
        self.timer_arms += 1;
        self.timer_period = Some(period);
        self.armed = Some(WakeSource::Timer);
        Ok(())
    }

    fn disable_analog(&mut self) -> Result<(), PowerError> {
        Ok(())
    }

    fn select_power_down(&mut self) -> Result<(), PowerError> {
        Ok(())
    }

    fn without_interrupts<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        f(self)
    }

    fn disable_brown_out(&mut self) {}

    fn cpu_sleep(&mut self, signal: &WakeSignal) -> Result<(), PowerError> {
        self.sleeps += 1;
        let source = self.wake_override.or(self.armed.take());
        match source {
            Some(WakeSource::None) | None => {}
            Some(source) => signal.fire(source),
        }
        Ok(())
    }

    fn detach_edge_wake(&mut self) -> Result<(), PowerError> {
        self.edge_armed = false;
        Ok(())
    }

    fn clear_sleep_request(&mut self) {
        self.armed = None;
    }
}

pub fn machine(
    config: LinkConfig,
    radio: FakeRadio,
    sleep: FakeSleep,
    board: FakeBoard,
) -> LinkStateMachine<FakeRadio, FakeSleep, FakeBoard> {
    LinkStateMachine::new(config, radio, sleep, board).unwrap()
}
