//! ESP32 sleep backend.
//!
//! Uses light sleep, which keeps RAM and resumes right after
//! `esp_light_sleep_start`, so the main loop continues where it stopped.
//! GPIO wakeup on the ESP32 is level-triggered; arming the pin level that
//! means "not the stored sensor state" gives change-triggered behaviour, and
//! a change that happened before arming wakes the chip immediately.

use super::{PowerError, SleepControl, WakeSignal, WakeSource};
use esp_idf_sys::{self as sys, esp, EspError};
use log::trace;
use std::time::Duration;

/// RTC_CNTL_BROWN_OUT_REG (DR_REG_RTCCNTL_BASE + 0xD4).
const RTC_CNTL_BROWN_OUT_REG: usize = 0x3FF4_8000 + 0xD4;

/// RTC_CNTL_BROWN_OUT_ENA.
const BROWN_OUT_ENA: u32 = 1 << 30;

impl From<EspError> for PowerError {
    fn from(e: EspError) -> Self {
        PowerError::Backend(e.to_string())
    }
}

/// Light-sleep control for the ESP32.
pub struct EspSleep {
    sensor_gpio: Option<sys::gpio_num_t>,
    saved_brown_out: Option<u32>,
    sleep_requested: bool,
}

impl EspSleep {
    /// `sensor_gpio` is the pin to wake on for REMOTE nodes, `None` on LED nodes.
    pub fn new(sensor_gpio: Option<i32>) -> Self {
        Self {
            sensor_gpio,
            saved_brown_out: None,
            sleep_requested: false,
        }
    }
}

impl SleepControl for EspSleep {
    fn arm_edge_wake(&mut self, sensor_active: bool) -> Result<(), PowerError> {
        let pin = self
            .sensor_gpio
            .ok_or(PowerError::Unsupported("edge wake without a sensor pin"))?;

        // The sensor is active-low: active is a low pin, so wake on high.
        let wake_on = if sensor_active {
            sys::gpio_int_type_t_GPIO_INTR_HIGH_LEVEL
        } else {
            sys::gpio_int_type_t_GPIO_INTR_LOW_LEVEL
        };
        esp!(unsafe { sys::gpio_wakeup_enable(pin, wake_on) })?;
        esp!(unsafe { sys::esp_sleep_enable_gpio_wakeup() })?;
        let level = unsafe { sys::gpio_get_level(pin) };
        trace!(
            "GPIO{} wake armed (stored {}, level now {})",
            pin,
            if sensor_active { "active" } else { "inactive" },
            level
        );
        Ok(())
    }

    fn arm_timer_wake(&mut self, period: Duration) -> Result<(), PowerError> {
        esp!(unsafe { sys::esp_sleep_enable_timer_wakeup(period.as_micros() as u64) })?;
        Ok(())
    }

    fn disable_analog(&mut self) -> Result<(), PowerError> {
        // SAR ADC and comparators live in the RTC peripheral domain.
        esp!(unsafe {
            sys::esp_sleep_pd_config(
                sys::esp_sleep_pd_domain_t_ESP_PD_DOMAIN_RTC_PERIPH,
                sys::esp_sleep_pd_option_t_ESP_PD_OPTION_OFF,
            )
        })?;
        Ok(())
    }

    fn select_power_down(&mut self) -> Result<(), PowerError> {
        self.sleep_requested = true;
        Ok(())
    }

    fn without_interrupts<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        esp_idf_hal::interrupt::free(|| f(self))
    }

    fn disable_brown_out(&mut self) {
        let reg = RTC_CNTL_BROWN_OUT_REG as *mut u32;
        // SAFETY: fixed, always-mapped RTC control register; called with
        // interrupts masked so the read-modify-write is not interleaved.
        unsafe {
            let value = core::ptr::read_volatile(reg);
            self.saved_brown_out = Some(value);
            core::ptr::write_volatile(reg, value & !BROWN_OUT_ENA);
        }
    }

    fn cpu_sleep(&mut self, signal: &WakeSignal) -> Result<(), PowerError> {
        if !self.sleep_requested {
            return Err(PowerError::Unsupported("sleep without power-down selected"));
        }
        esp!(unsafe { sys::esp_light_sleep_start() })?;

        let cause = unsafe { sys::esp_sleep_get_wakeup_cause() };
        let source = match cause {
            sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeSource::Timer,
            sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_GPIO => WakeSource::Edge,
            _ => WakeSource::None,
        };
        if source != WakeSource::None {
            signal.fire(source);
        }
        Ok(())
    }

    fn detach_edge_wake(&mut self) -> Result<(), PowerError> {
        if let Some(pin) = self.sensor_gpio {
            esp!(unsafe { sys::gpio_wakeup_disable(pin) })?;
        }
        esp!(unsafe {
            sys::esp_sleep_disable_wakeup_source(sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_GPIO)
        })?;
        Ok(())
    }

    fn clear_sleep_request(&mut self) {
        if let Some(value) = self.saved_brown_out.take() {
            // SAFETY: same register as in `disable_brown_out`.
            unsafe { core::ptr::write_volatile(RTC_CNTL_BROWN_OUT_REG as *mut u32, value) };
        }
        self.sleep_requested = false;
    }
}
