//! Doorlink ESP32 firmware binary.
//!
//! # Wiring (ESP32 DevKit + nRF24L01+)
//!
//! | nRF24 | GPIO |
//! |-------|------|
//! | SCK   | 18   |
//! | MOSI  | 23   |
//! | MISO  | 19   |
//! | CSN   | 5    |
//! | CE    | 4    |
//!
//! Strap on GPIO25 (jumper to 3V3 = REMOTE), sensor on GPIO26 (active-low),
//! indicator on GPIO2.

#[cfg(feature = "esp32")]
fn main() {
    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    // Initialize ESP-IDF logger for log crate integration
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(e) = firmware::run() {
        log::error!("Startup failed: {}, restarting", e);
        // Give the UART time to flush the log line.
        std::thread::sleep(std::time::Duration::from_secs(2));
        esp_idf_hal::reset::restart();
    }
}

#[cfg(feature = "esp32")]
mod firmware {
    use doorlink_esp32::power::EspSleep;
    use doorlink_esp32::{LinkConfig, LinkNode, Nrf24, PinBoard, Role};
    use esp_idf_hal::delay::{Ets, FreeRtos};
    use esp_idf_hal::gpio::{AnyIOPin, IOPin, PinDriver, Pull};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::spi::config::{Config as SpiConfig, DriverConfig};
    use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver};
    use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
    use esp_idf_hal::units::{FromValueType, Hertz};
    use log::{info, warn};

    /// GPIO number of the sensor input, used as the REMOTE wake pin.
    const SENSOR_GPIO: i32 = 26;

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;
        let config = LinkConfig::default();

        // Role comes first: nothing else is configured until it is known.
        let mut strap = PinDriver::input(pins.gpio25.downgrade())?;
        let role = Role::resolve(&mut strap, &mut FreeRtos, config.strap_settle_ms);
        drop(strap);
        info!("Role: {}", role);

        let mut sensor = PinDriver::input(pins.gpio26.downgrade())?;
        sensor.set_pull(Pull::Up)?;
        let indicator = PinDriver::output(pins.gpio2)?;

        let uart = UartDriver::new(
            peripherals.uart0,
            pins.gpio1,
            pins.gpio3,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &UartConfig::new().baudrate(Hertz(115_200)),
        )?;
        let board = PinBoard::with_diagnostics(sensor, indicator, FreeRtos, uart);

        // nRF24L01+ supports up to 10MHz; 4MHz is plenty for 1-byte payloads
        let spi_driver = SpiDriver::new(
            peripherals.spi2,
            pins.gpio18,
            pins.gpio23,
            Some(pins.gpio19),
            &DriverConfig::new(),
        )?;
        let spi = SpiDeviceDriver::new(
            spi_driver,
            Some(pins.gpio5),
            &SpiConfig::new().baudrate(4.MHz().into()),
        )?;
        let ce = PinDriver::output(pins.gpio4)?;
        let radio = Nrf24::new(spi, ce, Ets, config.radio.payload_len);

        let sleep = EspSleep::new(match role {
            Role::Remote => Some(SENSOR_GPIO),
            Role::Led => None,
        });

        let mut node = LinkNode::new(role, config, radio, sleep, board)?;
        node.setup()?;

        info!("Entering main loop...");
        loop {
            if let Err(e) = node.step() {
                warn!("{}", e);
            }
        }
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    println!("This binary requires the 'esp32' feature.");
    println!("Use 'cargo run --bin host-link' to run both nodes on the host.");
}
