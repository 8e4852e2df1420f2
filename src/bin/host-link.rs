//! Run a REMOTE and an LED node against each other on the host.
//!
//! Both nodes run the firmware's link protocol over a simulated radio
//! channel. A background task flips the REMOTE sensor periodically; the LED
//! indicator should follow.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin host-link              # lossless channel
//! cargo run --bin host-link -- 30        # drop 30% of transmissions
//! RUST_LOG=debug cargo run --bin host-link
//! ```

use doorlink_esp32::sim::{
    run_until_cancelled, Air, SimBoard, SimDelay, SimNode, SimRadio, SimSensor, SimSleep, SimStrap,
};
use doorlink_esp32::{LinkConfig, LinkNode, Role};
use log::{error, info};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Simulated time runs this many times faster than real time.
const SPEEDUP: u32 = 20;

/// Real-time pause between main-loop iterations.
const LOOP_PACE: Duration = Duration::from_millis(1);

/// How often the sensor is flipped.
const TOGGLE_PERIOD: Duration = Duration::from_secs(3);

fn build_node(
    fitted_strap: bool,
    air: &Air,
    sensor: &SimSensor,
    cancel: &CancellationToken,
) -> Result<SimNode, doorlink_esp32::LinkError> {
    let config = LinkConfig::default();
    let mut delay = SimDelay::new(SPEEDUP);
    let role = Role::resolve(
        &mut SimStrap::new(fitted_strap),
        &mut delay,
        config.strap_settle_ms,
    );

    // Only REMOTE has the sensor wired.
    let sensor = (role == Role::Remote).then(|| sensor.clone());
    let board = SimBoard::new(sensor.clone(), delay);
    let sleep = SimSleep::new(sensor, delay, cancel.clone());
    LinkNode::new(role, config, SimRadio::new(air), sleep, board)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let loss_percent = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<u8>().ok())
        .unwrap_or(0);

    info!("=== Doorlink host simulation ({}% loss) ===", loss_percent);

    let air = Air::new(loss_percent);
    let sensor = SimSensor::new(false);
    let cancel = CancellationToken::new();

    let (remote, led) = match (
        build_node(true, &air, &sensor, &cancel),
        build_node(false, &air, &sensor, &cancel),
    ) {
        (Ok(remote), Ok(led)) => (remote, led),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to build nodes: {}", e);
            std::process::exit(1);
        }
    };
    let indicator = led.machine().board().indicator();

    let remote_cancel = cancel.clone();
    let remote_task = tokio::task::spawn_blocking(move || {
        run_until_cancelled(remote, remote_cancel, LOOP_PACE)
    });
    let led_cancel = cancel.clone();
    let led_task =
        tokio::task::spawn_blocking(move || run_until_cancelled(led, led_cancel, LOOP_PACE));

    let toggle_cancel = cancel.clone();
    let toggle_sensor = sensor.clone();
    let toggle_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(TOGGLE_PERIOD);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = toggle_cancel.cancelled() => break,
                _ = interval.tick() => {
                    let active = toggle_sensor.toggle();
                    info!(
                        "Sensor -> {} (LED indicator currently {})",
                        if active { "ON" } else { "off" },
                        if indicator.is_on() { "ON" } else { "off" }
                    );
                }
            }
        }
    });

    info!("Running (Ctrl+C to exit)...");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for Ctrl+C: {}", e);
    }
    info!("Shutting down...");
    cancel.cancel();

    if let Err(e) = toggle_task.await {
        error!("Toggle task error: {}", e);
    }
    for (name, task) in [("REMOTE", remote_task), ("LED", led_task)] {
        match task.await {
            Ok(node) => info!("{} ran {} iterations", name, node.iterations()),
            Err(e) => error!("{} task error: {}", name, e),
        }
    }

    let stats = air.stats();
    info!(
        "Air: {} attempts, {} delivered, {} lost, {} refused",
        stats.attempts, stats.delivered, stats.lost, stats.refused
    );
}
