use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum QueueError {
    /// The frame could not be buffered and was dropped. The producer is
    /// never blocked or otherwise affected.
    #[error("frame queue overflow, frame dropped")]
    Overflow,
}

/// Thread-safe FIFO buffer between the frame producer and the worker.
///
/// Backed by an unbounded channel whose two ends the queue holds itself:
/// `enqueue` never blocks and `drain` never waits. There is no depth limit;
/// a stalled worker grows the queue without bound. That backpressure hazard
/// is accepted by design.
pub struct FrameQueue {
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
}

impl FrameQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Buffers one frame. Non-blocking; the only failure surface is losing
    /// the frame, reported as `Overflow`.
    pub fn enqueue(&self, frame: Frame) -> Result<(), QueueError> {
        // With both channel ends owned here, send can only fail if the
        // runtime is already tearing the channel down.
        self.tx.send(frame).map_err(|_| QueueError::Overflow)
    }

    /// Removes and returns every buffered frame in arrival order.
    /// Non-blocking; an empty queue yields an empty vec.
    pub fn drain(&self) -> Vec<Frame> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}
