//! Host simulation of the two-node link.
//!
//! Runs the unchanged link protocol against simulated hardware so a REMOTE
//! and an LED node can talk inside one process:
//!
//! - [`Air`]: shared channel with the transceiver's FIFO, loss and retries
//! - [`SimRadio`]: [`RadioLink`](crate::radio::RadioLink) endpoint on the air
//! - [`SimSensor`], [`SimBoard`], [`SimStrap`]: pins and delays
//! - [`SimSleep`]: sleeps that block the node thread until a wake source fires
//!
//! Every node runs on its own blocking thread via [`run_until_cancelled`].

mod air;
mod board;
mod radio;
mod sensor;
mod sleep;

pub use air::{Air, AirStats, RX_FIFO_DEPTH};
pub use board::{SimBoard, SimDelay, SimIndicator, SimStrap};
pub use radio::SimRadio;
pub use sensor::SimSensor;
pub use sleep::SimSleep;

use crate::board::Board;
use crate::node::LinkNode;
use crate::power::SleepControl;
use crate::radio::RadioLink;
use log::{error, info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fully simulated node.
pub type SimNode = LinkNode<SimRadio, SimSleep, SimBoard>;

/// Set up `node` and step it until `cancel` fires, pausing `pace` between
/// iterations. Step errors are logged and the loop continues.
pub fn run_until_cancelled<R, P, B>(
    mut node: LinkNode<R, P, B>,
    cancel: CancellationToken,
    pace: Duration,
) -> LinkNode<R, P, B>
where
    R: RadioLink,
    P: SleepControl,
    B: Board,
{
    if let Err(e) = node.setup() {
        error!("{} setup failed: {}", node.role(), e);
        return node;
    }

    while !cancel.is_cancelled() {
        if let Err(e) = node.step() {
            warn!("{}: {}", node.role(), e);
        }
        if !pace.is_zero() {
            std::thread::sleep(pace);
        }
    }

    if let Err(e) = node.shutdown() {
        warn!("{} shutdown failed: {}", node.role(), e);
    }
    info!("{} stopped after {} iterations", node.role(), node.iterations());
    node
}
