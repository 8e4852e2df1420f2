//! Simulated radio channel shared by every [`SimRadio`](super::SimRadio).
//!
//! Models what the link protocol depends on: a 3-deep receive FIFO that
//! refuses (and so does not acknowledge) payloads once full, per-attempt
//! loss, and hardware auto-retransmission.

use log::{trace, warn};
use rand_core::{OsRng, RngCore};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Receive FIFO depth of the nRF24L01+.
pub const RX_FIFO_DEPTH: usize = 3;

/// Channel counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AirStats {
    /// Transmissions put on the air, including hardware retries.
    pub attempts: u64,
    pub delivered: u64,
    /// Attempts dropped by the loss model.
    pub lost: u64,
    /// Attempts refused because the receive FIFO was full.
    pub refused: u64,
}

struct Channel {
    fifo: VecDeque<Vec<u8>>,
    listeners: HashSet<usize>,
    next_endpoint: usize,
    loss_percent: u8,
    stats: AirStats,
}

/// Shared medium. Cloning yields another handle to the same channel.
#[derive(Clone)]
pub struct Air {
    inner: Arc<Mutex<Channel>>,
}

impl Air {
    /// A channel dropping `loss_percent` % of attempts (clamped to 100).
    pub fn new(loss_percent: u8) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Channel {
                fifo: VecDeque::with_capacity(RX_FIFO_DEPTH),
                listeners: HashSet::new(),
                next_endpoint: 0,
                loss_percent: loss_percent.min(100),
                stats: AirStats::default(),
            })),
        }
    }

    pub fn lossless() -> Self {
        Self::new(0)
    }

    pub fn set_loss_percent(&self, loss_percent: u8) {
        self.lock().loss_percent = loss_percent.min(100);
    }

    pub fn stats(&self) -> AirStats {
        self.lock().stats
    }

    /// Payloads waiting in the receive FIFO.
    pub fn queued(&self) -> usize {
        self.lock().fifo.len()
    }

    pub(super) fn register(&self) -> usize {
        let mut channel = self.lock();
        let id = channel.next_endpoint;
        channel.next_endpoint += 1;
        id
    }

    pub(super) fn set_listening(&self, endpoint: usize, listening: bool) {
        let mut channel = self.lock();
        if listening {
            channel.listeners.insert(endpoint);
        } else {
            channel.listeners.remove(&endpoint);
        }
    }

    /// Transmit `payload` with up to `retries` hardware retransmissions.
    ///
    /// Returns whether the payload was acknowledged. Without auto-ack a
    /// single attempt is made and the result is always `true`, as on the
    /// real transceiver.
    pub(super) fn transmit(&self, from: usize, payload: &[u8], auto_ack: bool, retries: u8) -> bool {
        let mut channel = self.lock();
        let attempts = if auto_ack { u32::from(retries) + 1 } else { 1 };

        for attempt in 0..attempts {
            channel.stats.attempts += 1;
            if channel.drops_attempt() {
                channel.stats.lost += 1;
                continue;
            }
            if !channel.listeners.iter().any(|&id| id != from) {
                continue;
            }
            if channel.fifo.len() >= RX_FIFO_DEPTH {
                channel.stats.refused += 1;
                continue;
            }
            channel.fifo.push_back(payload.to_vec());
            channel.stats.delivered += 1;
            trace!("air: delivered {:?} on attempt {}", payload, attempt + 1);
            return true;
        }
        !auto_ack
    }

    /// Pop the oldest payload; the flag tells whether the FIFO is now empty.
    pub(super) fn pop(&self) -> Option<(Vec<u8>, bool)> {
        let mut channel = self.lock();
        let payload = channel.fifo.pop_front()?;
        Some((payload, channel.fifo.is_empty()))
    }

    fn lock(&self) -> MutexGuard<'_, Channel> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Air mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for Air {
    fn default() -> Self {
        Self::lossless()
    }
}

impl Channel {
    fn drops_attempt(&self) -> bool {
        match self.loss_percent {
            0 => false,
            100 => true,
            p => OsRng.next_u32() % 100 < u32::from(p),
        }
    }
}
