//! Confirmation worker thread.
//!
//! The user-facing side effect of a selection (speech, text insertion) runs
//! here so it cannot stall gaze sampling. The tick loop fires and forgets;
//! nothing about the outcome flows back into the state machine.

use std::sync::mpsc::Receiver;

use super::queue::ConfirmedSelection;

/// Consumes confirmed selections; implementations own the side effect.
///
/// Closures of the right shape implement this directly.
pub trait SelectionHandler<I>: Send {
    fn handle(&mut self, selection: ConfirmedSelection<I>) -> anyhow::Result<()>;
}

impl<I, F> SelectionHandler<I> for F
where
    F: FnMut(ConfirmedSelection<I>) -> anyhow::Result<()> + Send,
{
    fn handle(&mut self, selection: ConfirmedSelection<I>) -> anyhow::Result<()> {
        self(selection)
    }
}

/// Runs the confirmation worker loop.
///
/// Processes items from the queue until the channel is closed (sender
/// dropped). Handler errors are logged and the loop continues; a failed
/// side effect never reaches back into the selection machine.
///
/// This function blocks until the channel closes, so it should be run in a
/// dedicated thread.
pub fn run_confirm_worker<I>(
    receiver: Receiver<ConfirmedSelection<I>>,
    mut handler: impl SelectionHandler<I>,
) {
    crate::log("Confirmation worker started");

    loop {
        match receiver.recv() {
            Ok(selection) => {
                let tick = selection.tick;
                if let Err(e) = handler.handle(selection) {
                    crate::log(&format!(
                        "Confirmation handler failed at tick {}: {}",
                        tick, e
                    ));
                }
            }
            Err(_) => {
                // Channel closed, sender was dropped.
                crate::log("Confirmation worker: channel closed, exiting");
                break;
            }
        }
    }

    crate::log("Confirmation worker finished");
}
