//! Pipeline control loop.
//!
//! Runs the initial calibration, spawns the confirmation worker, then steps
//! the pipeline at the configured tick rate until stopped. Recalibration
//! blocks the loop for its own duration and replaces the profile only on
//! completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::calibration::{CalibrationEngine, CalibrationUi};
use crate::config::PipelineConfig;
use crate::geometry::Rect;
use crate::selection::Millis;
use crate::tracking::GazeSource;

use super::queue::create_confirm_queue;
use super::worker::{run_confirm_worker, SelectionHandler};
use super::{FrameView, GazePipeline, HitTester};

/// Global stop flag - raised by the embedding application to tear down.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Global recalibration flag - raised on user request, consumed by the loop.
static RECALIBRATE_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Requests that the running pipeline stop after the current tick.
pub fn request_stop() {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

/// Requests a full recalibration pass before the next tick.
pub fn request_recalibration() {
    RECALIBRATE_REQUESTED.store(true, Ordering::SeqCst);
}

/// Resets both control flags. Call before starting the loop.
pub fn reset_control_flags() {
    STOP_REQUESTED.store(false, Ordering::SeqCst);
    RECALIBRATE_REQUESTED.store(false, Ordering::SeqCst);
}

/// Receives the per-tick frame state, for pointer/highlight rendering.
///
/// Closures of the right shape implement this directly.
pub trait TickObserver<I> {
    fn frame(&mut self, view: FrameView<I>);
}

impl<I, F> TickObserver<I> for F
where
    F: FnMut(FrameView<I>),
{
    fn frame(&mut self, view: FrameView<I>) {
        self(view)
    }
}

/// Runs the gaze-to-selection loop until stopped.
///
/// Blocks the calling thread. The initial calibration runs first; aborting
/// it via [`request_stop`] exits before the loop starts. The confirmation
/// handler runs on its own worker thread and is joined on the way out, so
/// queued selections drain before this returns. `max_ticks` bounds the run
/// for replays and tests; `None` runs until a stop request.
#[allow(clippy::too_many_arguments)]
pub fn run_pipeline<I, S, T, U, H, O>(
    config: &PipelineConfig,
    interaction_rect: Rect,
    source: &mut S,
    hit: &T,
    calibration_ui: &mut U,
    handler: H,
    observer: &mut O,
    max_ticks: Option<u64>,
) where
    I: Copy + PartialEq + std::fmt::Debug + Send + 'static,
    S: GazeSource,
    T: HitTester<I>,
    U: CalibrationUi,
    H: SelectionHandler<I> + 'static,
    O: TickObserver<I>,
{
    let engine = CalibrationEngine::new(config);
    let Some(profile) = engine.run(interaction_rect, source, calibration_ui, &STOP_REQUESTED)
    else {
        crate::log("Initial calibration aborted; pipeline not started");
        return;
    };

    let (sender, receiver) = create_confirm_queue();
    let worker = thread::spawn(move || run_confirm_worker(receiver, handler));

    let mut pipeline = GazePipeline::new(config, profile, interaction_rect, sender);

    let frame_interval = Duration::from_millis(1000 / config.fps.max(1) as u64);
    let started = Instant::now();
    let mut ticks: u64 = 0;

    crate::log(&format!("Pipeline started at {} fps", config.fps));

    loop {
        if STOP_REQUESTED.load(Ordering::SeqCst) {
            crate::log("Stop requested, tearing down pipeline");
            break;
        }
        if let Some(max) = max_ticks {
            if ticks >= max {
                crate::log(&format!("Tick limit reached ({})", max));
                break;
            }
        }
        if RECALIBRATE_REQUESTED.swap(false, Ordering::SeqCst) {
            crate::log("Recalibration requested");
            match engine.run(interaction_rect, source, calibration_ui, &STOP_REQUESTED) {
                Some(profile) => pipeline.replace_profile(profile),
                None => crate::log("Recalibration aborted; keeping prior profile"),
            }
            // The stop check runs again before the next tick.
            continue;
        }

        let tick_start = Instant::now();
        let now = started.elapsed().as_millis() as Millis;
        let view = pipeline.tick(source, hit, now);
        observer.frame(view);
        ticks += 1;

        let elapsed = tick_start.elapsed();
        if elapsed < frame_interval {
            thread::sleep(frame_interval - elapsed);
        }
    }

    // Drop the pipeline (and with it the sender) so the worker sees the
    // channel close once the queue drains.
    drop(pipeline);
    crate::log("Waiting for confirmation worker to finish...");
    if worker.join().is_err() {
        crate::log("Confirmation worker thread panicked");
    }
    crate::log("Pipeline torn down");
}
