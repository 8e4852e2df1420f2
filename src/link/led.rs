//! LED role: drain the radio, mirror the last value, sleep on a timer.

use super::machine::{on_off, StepReport};
use super::{LedState, LinkError, LinkStateMachine, Role};
use crate::board::Board;
use crate::power::SleepControl;
use crate::radio::{RadioLink, SensorPayload, MAX_PAYLOAD_LEN};
use log::{info, warn};

/// Result of reading the receive FIFO.
struct Drain {
    last: Option<SensorPayload>,
    count: usize,
    overflow: bool,
}

impl<R, P, B> LinkStateMachine<R, P, B>
where
    R: RadioLink,
    P: SleepControl,
    B: Board,
{
    pub(super) fn step_led(
        &mut self,
        led: &mut LedState,
        indicator: &mut bool,
        report: &mut StepReport,
    ) -> Result<(), LinkError> {
        let pending = match self.radio.has_data() {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Radio poll failed: {}", e);
                false
            }
        };

        let mut overflow = None;
        if pending {
            let drain = self.drain();
            if let Some(payload) = drain.last {
                let value = payload.is_active();
                led.sensor = value;
                led.payloads += drain.count as u64;
                *indicator = value;
                // Only the final value of a burst reaches the output.
                self.drive_indicator(value);
                self.ticks.reset();
                info!("Received {} ({} payloads)", on_off(value), drain.count);
                report.received = Some(value);
            }
            report.drained = drain.count;
            if drain.overflow {
                warn!(
                    "Radio still reports data after {} reads, deferring the rest",
                    self.config.drain_cap
                );
                overflow = Some(LinkError::DrainOverflow {
                    cap: self.config.drain_cap,
                });
            }
        }

        if let Some(byte) = self.board.poll_diagnostic() {
            info!("Diagnostic input: {:#04x}", byte);
            self.ticks.reset();
            report.diagnostic = Some(byte);
        }

        report.wake = self.idle_tick(Role::Led, led.sensor)?;

        match overflow {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Read payloads until the radio reports its FIFO empty, a read fails
    /// or the drain cap is reached.
    fn drain(&mut self) -> Drain {
        let width = self.config.radio.payload_len.clamp(1, MAX_PAYLOAD_LEN);
        let mut buf = [0u8; MAX_PAYLOAD_LEN];
        let mut drain = Drain {
            last: None,
            count: 0,
            overflow: false,
        };

        loop {
            if drain.count == self.config.drain_cap {
                drain.overflow = true;
                break;
            }
            match self.radio.receive(&mut buf[..width]) {
                Ok(done) => {
                    drain.count += 1;
                    drain.last = Some(SensorPayload::decode(&buf[..width]));
                    if done {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Radio read failed after {} payloads: {}", drain.count, e);
                    break;
                }
            }
        }
        drain
    }
}

#[cfg(test)]
mod tests {
    use super::super::fakes::{machine, FakeBoard, FakeRadio, FakeSleep, RadioCall};
    use super::super::{LinkConfig, LinkError, LinkState, Role};
    use crate::power::WakeSource;

    fn led_config() -> LinkConfig {
        LinkConfig::default().without_delays()
    }

    #[test]
    fn test_burst_applies_only_last_value() {
        let radio = FakeRadio::receiving(&[&[1], &[0], &[1]]);
        let mut m = machine(led_config(), radio, FakeSleep::default(), FakeBoard::default());
        let mut state = LinkState::new(Role::Led, m.config());

        let report = m.step(&mut state).unwrap();

        assert_eq!(report.received, Some(true));
        assert_eq!(report.drained, 3);
        assert!(state.sensor());
        assert!(state.indicator());
        assert_eq!(m.board().indicator_writes, vec![true]);
        assert_eq!(state.led().unwrap().payloads(), 3);
    }

    #[test]
    fn test_nonzero_byte_is_active() {
        let radio = FakeRadio::receiving(&[&[0x80]]);
        let mut m = machine(led_config(), radio, FakeSleep::default(), FakeBoard::default());
        let mut state = LinkState::new(Role::Led, m.config());

        m.step(&mut state).unwrap();
        assert!(state.sensor());
    }

    #[test]
    fn test_reception_resets_idle_ticks() {
        let mut m = machine(
            led_config(),
            FakeRadio::default(),
            FakeSleep::default(),
            FakeBoard::default(),
        );
        let mut state = LinkState::new(Role::Led, m.config());

        for _ in 0..5 {
            m.step(&mut state).unwrap();
        }
        assert_eq!(m.idle_ticks(), 5);

        m.radio_mut().queue(&[0]);
        m.step(&mut state).unwrap();
        // Reset on reception, then this iteration's tick.
        assert_eq!(m.idle_ticks(), 1);
    }

    #[test]
    fn test_empty_poll_leaves_indicator_alone() {
        let mut m = machine(
            led_config(),
            FakeRadio::default(),
            FakeSleep::default(),
            FakeBoard::default(),
        );
        let mut state = LinkState::new(Role::Led, m.config());

        let report = m.step(&mut state).unwrap();

        assert_eq!(report.received, None);
        assert_eq!(report.drained, 0);
        assert!(m.board().indicator_writes.is_empty());
    }

    #[test]
    fn test_drain_cap_bounds_reads_and_applies_last() {
        let mut radio = FakeRadio::receiving(&[&[0], &[1], &[1], &[0], &[1]]);
        radio.always_more = true;
        let config = led_config().with_drain_cap(3);
        let mut m = machine(config, radio, FakeSleep::default(), FakeBoard::default());
        let mut state = LinkState::new(Role::Led, m.config());

        let err = m.step(&mut state).unwrap_err();

        assert_eq!(err, LinkError::DrainOverflow { cap: 3 });
        assert_eq!(m.radio().receives, 3);
        assert!(state.sensor());
        assert_eq!(m.board().indicator_writes, vec![true]);
        assert_eq!(m.idle_ticks(), 1);
    }

    #[test]
    fn test_drain_stops_on_read_error() {
        let mut radio = FakeRadio::receiving(&[&[1]]);
        radio.receive_fails_after = Some(1);
        radio.always_more = true;
        let mut m = machine(led_config(), radio, FakeSleep::default(), FakeBoard::default());
        let mut state = LinkState::new(Role::Led, m.config());

        let report = m.step(&mut state).unwrap();

        assert_eq!(report.drained, 1);
        assert_eq!(report.received, Some(true));
    }

    #[test]
    fn test_diagnostic_byte_resets_idle_ticks() {
        let mut m = machine(
            led_config(),
            FakeRadio::default(),
            FakeSleep::default(),
            FakeBoard::default(),
        );
        let mut state = LinkState::new(Role::Led, m.config());

        for _ in 0..3 {
            m.step(&mut state).unwrap();
        }
        assert_eq!(m.idle_ticks(), 3);
        m.board_mut().diagnostics.push_back(b'?');
        let report = m.step(&mut state).unwrap();

        assert_eq!(report.diagnostic, Some(b'?'));
        assert_eq!(m.idle_ticks(), 1);
    }

    #[test]
    fn test_sleeps_on_timer_after_threshold() {
        let config = LinkConfig::with_idle_thresholds(10, 5).without_delays();
        let sleep = FakeSleep::waking_with(WakeSource::Timer);
        let mut m = machine(config, FakeRadio::default(), sleep, FakeBoard::default());
        let mut state = LinkState::new(Role::Led, m.config());

        for _ in 0..5 {
            assert_eq!(m.step(&mut state).unwrap().wake, None);
        }
        let report = m.step(&mut state).unwrap();

        assert_eq!(report.wake, Some(WakeSource::Timer));
        let sleep = m.scheduler().control();
        assert_eq!(sleep.timer_arms, 1);
        assert_eq!(sleep.edge_arms, 0);
        assert_eq!(m.idle_ticks(), 0);
    }

    #[test]
    fn test_listening_restarts_after_wake() {
        let config = LinkConfig::with_idle_thresholds(10, 1).without_delays();
        let mut m = machine(
            config,
            FakeRadio::default(),
            FakeSleep::waking_with(WakeSource::Timer),
            FakeBoard::default(),
        );
        let mut state = LinkState::new(Role::Led, m.config());

        m.step(&mut state).unwrap();
        m.step(&mut state).unwrap();

        let calls = &m.radio().calls;
        let tail = &calls[calls.len() - 3..];
        assert_eq!(
            tail,
            &[
                RadioCall::StopListening,
                RadioCall::PowerDown,
                RadioCall::StartListening
            ]
        );
        assert!(m.radio().listening);
    }

    #[test]
    fn test_payload_after_wake_is_received() {
        let config = LinkConfig::with_idle_thresholds(10, 1).without_delays();
        let mut m = machine(
            config,
            FakeRadio::default(),
            FakeSleep::waking_with(WakeSource::Timer),
            FakeBoard::default(),
        );
        let mut state = LinkState::new(Role::Led, m.config());

        m.step(&mut state).unwrap();
        m.step(&mut state).unwrap();
        m.radio_mut().queue(&[1]);
        let report = m.step(&mut state).unwrap();

        assert_eq!(report.received, Some(true));
        assert!(state.indicator());
    }
}
