//! The per-role link protocol.
//!
//! One [`step`](LinkStateMachine::step) is one main-loop iteration. REMOTE
//! samples its sensor, transmits on change (retrying within its send budget)
//! and sleeps until the sensor pin changes. LED drains the radio, mirrors the
//! last value on the indicator and sleeps on a timer, polling the radio on
//! each wake.

use super::{LinkConfig, LinkError, LinkState, Role, RoleState};
use crate::board::Board;
use crate::power::{IdleTicks, SleepControl, WakeScheduler, WakeSignal, WakeSource};
use crate::radio::RadioLink;
use log::{info, warn};

/// Result of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Not acknowledged; `remaining` attempts left in the budget.
    Failed { remaining: u32 },
}

/// What happened during one iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    /// REMOTE read a new sensor value.
    pub sensor_changed: bool,
    pub send: Option<SendOutcome>,
    /// LED applied this value from the radio.
    pub received: Option<bool>,
    /// Payloads read while draining.
    pub drained: usize,
    /// Byte read from the diagnostic side channel.
    pub diagnostic: Option<u8>,
    /// Set when the node slept; holds the reported wake reason.
    pub wake: Option<WakeSource>,
}

/// Drives one node's radio, sleep and IO.
pub struct LinkStateMachine<R, P, B> {
    pub(super) config: LinkConfig,
    pub(super) radio: R,
    pub(super) scheduler: WakeScheduler<P>,
    pub(super) board: B,
    pub(super) ticks: IdleTicks,
}

impl<R, P, B> LinkStateMachine<R, P, B>
where
    R: RadioLink,
    P: SleepControl,
    B: Board,
{
    pub fn new(config: LinkConfig, radio: R, sleep: P, board: B) -> Result<Self, LinkError> {
        config.validate()?;
        let ticks = IdleTicks::new();
        let scheduler = WakeScheduler::new(sleep, &ticks, config.led_wake_period);
        Ok(Self {
            config,
            radio,
            scheduler,
            board,
            ticks,
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Handle for timer / pin-change interrupt handlers.
    pub fn wake_signal(&self) -> WakeSignal {
        self.scheduler.signal()
    }

    pub fn idle_ticks(&self) -> u32 {
        self.ticks.get()
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    pub fn scheduler(&self) -> &WakeScheduler<P> {
        &self.scheduler
    }

    /// One-time radio and indicator setup for the role in `state`.
    pub fn setup(&mut self, state: &LinkState) -> Result<(), LinkError> {
        let role = state.role();
        let rc = self.config.radio;

        self.radio.open(rc.channel, rc.data_rate)?;
        self.radio.set_auto_ack(rc.auto_ack)?;
        self.radio.set_retry_policy(rc.retry_delay, rc.retry_count)?;

        match role {
            Role::Remote => {
                self.radio.open_write_pipe(rc.pipe)?;
                self.radio.stop_listening()?;
            }
            Role::Led => {
                self.radio.open_read_pipe(rc.pipe)?;
                self.radio.start_listening()?;
            }
        }

        info!(
            "Role: {} (pipe {}, channel {}, {})",
            role, rc.pipe, rc.channel, rc.data_rate
        );

        self.board.set_indicator(false)?;
        let blink = role.boot_blink();
        for _ in 0..blink.count {
            self.board.delay_ms(blink.pause_ms);
            self.board.set_indicator(true)?;
            self.board.delay_ms(blink.pause_ms);
            self.board.set_indicator(false)?;
        }
        self.ticks.reset();
        Ok(())
    }

    /// Run one main-loop iteration.
    pub fn step(&mut self, state: &mut LinkState) -> Result<StepReport, LinkError> {
        let mut report = StepReport::default();
        let (role, indicator) = state.parts_mut();
        match role {
            RoleState::Remote(remote) => self.step_remote(remote, indicator, &mut report)?,
            RoleState::Led(led) => self.step_led(led, indicator, &mut report)?,
        }
        Ok(report)
    }

    /// Release the radio.
    pub fn shutdown(&mut self) -> Result<(), LinkError> {
        self.radio.close()?;
        Ok(())
    }

    /// Count an idle iteration; sleep once the role's threshold is exceeded.
    ///
    /// `sensor_active` is the stored sensor state; a REMOTE edge wake fires
    /// as soon as the pin differs from it.
    pub(super) fn idle_tick(
        &mut self,
        role: Role,
        sensor_active: bool,
    ) -> Result<Option<WakeSource>, LinkError> {
        if self.ticks.increment() <= self.config.idle_threshold(role) {
            return Ok(None);
        }
        self.enter_sleep(role, sensor_active).map(Some)
    }

    fn enter_sleep(&mut self, role: Role, sensor_active: bool) -> Result<WakeSource, LinkError> {
        if role == Role::Led {
            if let Err(e) = self.radio.stop_listening() {
                warn!("stop_listening before sleep failed: {}", e);
            }
        }
        if let Err(e) = self.radio.power_down() {
            warn!("Radio power-down before sleep failed: {}", e);
        }

        let slept = self.scheduler.sleep(role.wake_source(), sensor_active);

        // Also covers a failed sleep, so the next attempt waits a full window.
        self.ticks.reset();

        if role == Role::Led {
            if let Err(e) = self.radio.start_listening() {
                warn!("Restarting listening after wake failed: {}", e);
            }
        }
        self.board.delay_ms(self.config.wake_settle_ms);

        Ok(slept?)
    }

    /// Set the indicator output. A failed write is logged and otherwise
    /// ignored; the protocol state already holds the value.
    pub(super) fn drive_indicator(&mut self, on: bool) {
        if let Err(e) = self.board.set_indicator(on) {
            warn!("Indicator write failed: {}", e);
        }
    }
}

pub(super) fn on_off(active: bool) -> &'static str {
    if active {
        "ON"
    } else {
        "off"
    }
}
