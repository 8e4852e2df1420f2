//! REMOTE role: sample, send, count idle iterations, sleep until the pin changes.

use super::machine::{on_off, SendOutcome, StepReport};
use super::{LinkError, LinkStateMachine, RemoteState, Role};
use crate::board::Board;
use crate::power::SleepControl;
use crate::radio::{RadioLink, SensorPayload};
use log::{debug, info, warn};

impl<R, P, B> LinkStateMachine<R, P, B>
where
    R: RadioLink,
    P: SleepControl,
    B: Board,
{
    pub(super) fn step_remote(
        &mut self,
        remote: &mut RemoteState,
        indicator: &mut bool,
        report: &mut StepReport,
    ) -> Result<(), LinkError> {
        let reading = match self.board.read_sensor() {
            Ok(value) => value,
            Err(e) => {
                warn!("Sensor read failed, keeping {}: {}", on_off(remote.sensor), e);
                remote.sensor
            }
        };
        debug!("Sensor state: {}", on_off(reading));

        let different = reading != remote.sensor;
        if different {
            remote.sensor = reading;
            remote.budget.refill();
            *indicator = reading;
            // Local feedback does not wait for the radio.
            self.drive_indicator(reading);
            info!("Sensor changed: {}", on_off(reading));
            report.sensor_changed = true;
        }

        if !remote.budget.is_exhausted() && (different || !remote.last_send_ok) {
            report.send = Some(self.attempt_send(remote, *indicator));
        }

        report.wake = self.idle_tick(Role::Remote, remote.sensor)?;
        Ok(())
    }

    fn attempt_send(&mut self, remote: &mut RemoteState, indicator: bool) -> SendOutcome {
        let payload = SensorPayload::new(remote.sensor).encode();

        let result = match self.radio.power_up() {
            Ok(()) => {
                self.board.delay_ms(self.config.radio_settle_ms);
                self.radio.try_send(&payload)
            }
            Err(e) => Err(e),
        };

        // The radio never stays powered between attempts.
        if let Err(e) = self.radio.power_down() {
            warn!("Radio power-down failed: {}", e);
        }

        let delivered = match result {
            Ok(acked) => acked,
            Err(e) => {
                warn!("Send error: {}", e);
                false
            }
        };
        remote.last_send_ok = delivered;
        // Every attempt restarts the idle window.
        self.ticks.reset();

        if delivered {
            info!("Sent {}: ok", on_off(remote.sensor));
            return SendOutcome::Delivered;
        }

        let remaining = remote.budget.consume();
        warn!("Send failed ({} tries left)", remaining);

        self.drive_indicator(false);
        self.board.delay_ms(self.config.failure_pulse_ms);
        self.drive_indicator(indicator);

        SendOutcome::Failed { remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fakes::{machine, FakeBoard, FakeRadio, FakeSleep, RadioCall};
    use super::super::{LinkConfig, LinkState, Role, SendOutcome};
    use crate::power::WakeSource;

    fn remote_config() -> LinkConfig {
        LinkConfig::default().without_delays()
    }

    #[test]
    fn test_change_updates_indicator_in_same_iteration() {
        let radio = FakeRadio::failing();
        let board = FakeBoard::with_sensor(&[true]);
        let mut m = machine(remote_config(), radio, FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        let report = m.step(&mut state).unwrap();

        assert!(report.sensor_changed);
        assert!(state.indicator());
        assert!(state.sensor());
        // Indicator went high before the failure pulse, and ended high.
        assert_eq!(m.board().indicator_writes, vec![true, false, true]);
        assert_eq!(state.remote().unwrap().budget().remaining(), 999);
    }

    #[test]
    fn test_flip_refills_budget_and_sends_value() {
        let board = FakeBoard::with_sensor(&[true]);
        let mut m = machine(remote_config(), FakeRadio::acking(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        let report = m.step(&mut state).unwrap();

        assert_eq!(report.send, Some(SendOutcome::Delivered));
        assert_eq!(state.remote().unwrap().budget().remaining(), 1000);
        assert_eq!(m.radio().sent, vec![vec![1]]);
        assert_eq!(m.idle_ticks(), 1);
    }

    #[test]
    fn test_radio_powered_down_after_every_attempt() {
        let board = FakeBoard::with_sensor(&[true, true, false]);
        let mut m = machine(remote_config(), FakeRadio::failing(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        for _ in 0..3 {
            m.step(&mut state).unwrap();
        }

        let calls = &m.radio().calls;
        let sends: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, RadioCall::Send(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(sends.len(), 3);
        for i in sends {
            assert_eq!(calls[i - 1], RadioCall::PowerUp);
            assert_eq!(calls[i + 1], RadioCall::PowerDown);
        }
        assert!(!m.radio().powered);
    }

    #[test]
    fn test_no_send_without_change_after_success() {
        let board = FakeBoard::with_sensor(&[true, true, true]);
        let mut m = machine(remote_config(), FakeRadio::acking(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        m.step(&mut state).unwrap();
        let second = m.step(&mut state).unwrap();
        let third = m.step(&mut state).unwrap();

        assert_eq!(second.send, None);
        assert_eq!(third.send, None);
        assert_eq!(m.radio().sent.len(), 1);
    }

    #[test]
    fn test_failed_send_retried_until_success() {
        let board = FakeBoard::with_sensor(&[true]);
        let radio = FakeRadio::scripted(&[false, false, true]);
        let mut m = machine(remote_config(), radio, FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        let outcomes: Vec<_> = (0..4).map(|_| m.step(&mut state).unwrap().send).collect();

        assert_eq!(
            outcomes,
            vec![
                Some(SendOutcome::Failed { remaining: 999 }),
                Some(SendOutcome::Failed { remaining: 998 }),
                Some(SendOutcome::Delivered),
                None,
            ]
        );
        assert!(state.remote().unwrap().last_send_ok());
    }

    #[test]
    fn test_failed_attempt_restarts_idle_window() {
        let board = FakeBoard::with_sensor(&[true]);
        let mut m = machine(remote_config(), FakeRadio::failing(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        for _ in 0..50 {
            let report = m.step(&mut state).unwrap();
            assert!(report.send.is_some());
            assert_eq!(report.wake, None);
            assert_eq!(m.idle_ticks(), 1);
        }
        assert_eq!(m.scheduler().sleeps(), 0);
    }

    #[test]
    fn test_always_failing_radio_spends_exactly_the_budget() {
        let board = FakeBoard::with_sensor(&[true]);
        let mut m = machine(remote_config(), FakeRadio::failing(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        let mut failures = 0;
        let mut first_sleep = None;
        for i in 0..1500 {
            let report = m.step(&mut state).unwrap();
            if let Some(SendOutcome::Failed { .. }) = report.send {
                failures += 1;
            }
            if report.wake.is_some() && first_sleep.is_none() {
                first_sleep = Some(i);
            }
        }

        assert_eq!(failures, 1000);
        assert_eq!(m.radio().sent.len(), 1000);
        assert!(state.remote().unwrap().budget().is_exhausted());
        // Awake for every attempt, then the usual idle window.
        assert_eq!(first_sleep, Some(1009));
    }

    #[test]
    fn test_new_change_grants_fresh_budget_after_exhaustion() {
        let mut readings = vec![true; 20];
        readings.push(false);
        let board = FakeBoard::with_sensor(&readings);
        let config = remote_config().with_send_budget(5);
        let mut m = machine(config, FakeRadio::failing(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        for _ in 0..20 {
            m.step(&mut state).unwrap();
        }
        assert_eq!(m.radio().sent.len(), 5);

        let report = m.step(&mut state).unwrap();
        assert!(report.sensor_changed);
        assert_eq!(report.send, Some(SendOutcome::Failed { remaining: 4 }));
        assert_eq!(m.radio().sent.last(), Some(&vec![0]));
    }

    #[test]
    fn test_sleeps_only_after_threshold_exceeded() {
        let board = FakeBoard::with_sensor(&[false]);
        let mut m = machine(remote_config(), FakeRadio::acking(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        for _ in 0..10 {
            assert_eq!(m.step(&mut state).unwrap().wake, None);
        }
        let report = m.step(&mut state).unwrap();
        assert_eq!(report.wake, Some(WakeSource::Edge));
        assert_eq!(m.idle_ticks(), 0);
        assert_eq!(m.scheduler().sleeps(), 1);
    }

    #[test]
    fn test_sleep_uses_edge_wake_and_detaches_it() {
        let board = FakeBoard::with_sensor(&[false]);
        let mut m = machine(remote_config(), FakeRadio::acking(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        for _ in 0..11 {
            m.step(&mut state).unwrap();
        }

        let sleep = m.scheduler().control();
        assert_eq!(sleep.edge_arms, 1);
        assert_eq!(sleep.timer_arms, 0);
        assert!(!sleep.edge_armed);
        assert_eq!(m.radio().calls.last(), Some(&RadioCall::PowerDown));
    }

    #[test]
    fn test_edge_wake_armed_against_stored_sensor_state() {
        let board = FakeBoard::with_sensor(&[true]);
        let mut m = machine(remote_config(), FakeRadio::acking(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        for _ in 0..11 {
            m.step(&mut state).unwrap();
        }

        assert_eq!(m.scheduler().control().edge_level, Some(true));
    }

    #[test]
    fn test_attempt_happens_before_sleep_is_permitted() {
        let board = FakeBoard::with_sensor(&[true]);
        let config = LinkConfig::with_idle_thresholds(1, 4000).without_delays();
        let mut m = machine(config, FakeRadio::failing(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        let first = m.step(&mut state).unwrap();
        assert!(first.send.is_some());
        assert_eq!(first.wake, None);
        assert_eq!(m.radio().sent, vec![vec![1]]);
    }

    #[test]
    fn test_sensor_read_error_keeps_previous_value() {
        let mut board = FakeBoard::with_sensor(&[true]);
        board.sensor_fails_after = Some(1);
        let mut m = machine(remote_config(), FakeRadio::acking(), FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        m.step(&mut state).unwrap();
        let report = m.step(&mut state).unwrap();

        assert!(!report.sensor_changed);
        assert!(state.sensor());
    }

    #[test]
    fn test_radio_error_counts_as_failed_attempt() {
        let board = FakeBoard::with_sensor(&[true]);
        let mut radio = FakeRadio::acking();
        radio.power_up_fails = true;
        let mut m = machine(remote_config(), radio, FakeSleep::default(), board);
        let mut state = LinkState::new(Role::Remote, m.config());

        let report = m.step(&mut state).unwrap();

        assert_eq!(report.send, Some(SendOutcome::Failed { remaining: 999 }));
        assert_eq!(m.radio().calls.last(), Some(&RadioCall::PowerDown));
    }
}
