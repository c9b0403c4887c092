//! Queue for handing confirmed selections to the side-effect worker.
//!
//! Uses std::sync::mpsc for single-producer, single-consumer communication.
//! The tick loop sends, the confirmation worker receives. The channel is
//! unbounded: a slow handler queues up instead of stalling gaze sampling.

use chrono::{DateTime, Local};
use std::sync::mpsc::{channel, Receiver, Sender};

/// A confirmed selection awaiting its side effect.
#[derive(Debug, Clone)]
pub struct ConfirmedSelection<I> {
    /// The item the user confirmed.
    pub item: I,
    /// Tick number at which the confirmation fired.
    pub tick: u64,
    /// Wall-clock time of the confirmation.
    pub confirmed_at: DateTime<Local>,
}

impl<I> ConfirmedSelection<I> {
    /// Creates a new work item stamped with the current time.
    pub fn new(item: I, tick: u64) -> Self {
        Self {
            item,
            tick,
            confirmed_at: Local::now(),
        }
    }
}

/// Creates the confirmation queue.
///
/// The sender side lives in the tick loop; the receiver side is owned by
/// the confirmation worker thread.
pub fn create_confirm_queue<I>() -> (Sender<ConfirmedSelection<I>>, Receiver<ConfirmedSelection<I>>)
{
    channel()
}
