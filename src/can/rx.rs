//! Receive path: interrupt-side capture into a bounded queue and the task
//! that drains it.
//!
//! The interrupt half only ever calls `try_send`, so a full queue drops the
//! frame instead of stalling the handler. The task half awaits on the queue,
//! which is the one place in the system where a task suspends waiting for
//! data.

use super::frame::{decode, ReceivedFrame, RxHeader};
use super::LOG_MODULE;
use crate::error::EcuError;
use crate::log_info;
use crate::logging::Logger;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub const DEFAULT_QUEUE_DEPTH: usize = 16;

/// Runtime switch for per-frame logging. Clones share the flag.
#[derive(Debug, Clone)]
pub struct CanLogSwitch {
    enabled: Arc<AtomicBool>,
}

impl CanLogSwitch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for CanLogSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU32,
    dropped: AtomicU32,
    processed: AtomicU32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanRxStats {
    pub frames_queued: u32,
    pub frames_dropped: u32,
    pub frames_processed: u32,
}

impl Counters {
    fn snapshot(&self) -> CanRxStats {
        CanRxStats {
            frames_queued: self.queued.load(Ordering::Relaxed),
            frames_dropped: self.dropped.load(Ordering::Relaxed),
            frames_processed: self.processed.load(Ordering::Relaxed),
        }
    }
}

/// Build the two halves of the receive pipeline around a queue of `depth`
/// frames (at least one).
pub fn channel(depth: usize, logging: CanLogSwitch, logger: Arc<Logger>) -> (CanRxIsr, CanRxTask) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    let counters = Arc::new(Counters::default());

    let isr = CanRxIsr {
        tx,
        counters: Arc::clone(&counters),
    };
    let task = CanRxTask {
        rx,
        logging,
        logger,
        counters,
    };
    (isr, task)
}

/// Interrupt-side handle. Cheap to clone; every clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct CanRxIsr {
    tx: mpsc::Sender<ReceivedFrame>,
    counters: Arc<Counters>,
}

impl CanRxIsr {
    /// Called from the receive interrupt with the FIFO entry. Returns
    /// `false` when the queue was full and the frame was dropped.
    pub fn on_frame_received(&self, header: &RxHeader, data: &[u8; 8]) -> bool {
        let frame = decode(header, data);
        match self.tx.try_send(frame) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn stats(&self) -> CanRxStats {
        self.counters.snapshot()
    }
}

/// Task-side consumer of received frames.
#[derive(Debug)]
pub struct CanRxTask {
    rx: mpsc::Receiver<ReceivedFrame>,
    logging: CanLogSwitch,
    logger: Arc<Logger>,
    counters: Arc<Counters>,
}

impl CanRxTask {
    /// Handle one frame: a single log line when logging is switched on,
    /// nothing otherwise.
    pub fn process(&self, frame: &ReceivedFrame) {
        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        if self.logging.is_enabled() {
            log_info!(self.logger, LOG_MODULE, "{}", frame);
        }
    }

    /// Process everything already queued without waiting. Returns the
    /// number of frames handled.
    pub fn drain_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(frame) = self.rx.try_recv() {
            self.process(&frame);
            handled += 1;
        }
        handled
    }

    /// Wait for frames forever. Returns once every interrupt-side handle
    /// has been dropped and the queue is empty.
    pub async fn run(mut self) -> Result<(), EcuError> {
        debug!("CAN RX task started");
        while let Some(frame) = self.rx.recv().await {
            self.process(&frame);
        }
        debug!("CAN RX queue closed, task exiting");
        Ok(())
    }

    pub fn logging(&self) -> &CanLogSwitch {
        &self.logging
    }

    pub fn stats(&self) -> CanRxStats {
        self.counters.snapshot()
    }
}
