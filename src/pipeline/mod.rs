//! Per-tick pipeline orchestration.
//!
//! Each tick performs exactly one read of the gaze source, one pass through
//! mapping and smoothing, one hit-test, and one state-machine step, then
//! hands any confirmed selection to the worker queue. No component blocks
//! waiting on another tick's result.

pub mod queue;
pub mod runner;
pub mod worker;

pub use queue::{create_confirm_queue, ConfirmedSelection};
pub use runner::{
    request_recalibration, request_stop, reset_control_flags, run_pipeline, TickObserver,
};
pub use worker::{run_confirm_worker, SelectionHandler};

use std::sync::mpsc::Sender;

use crate::blink::BlinkDetector;
use crate::calibration::CalibrationProfile;
use crate::config::PipelineConfig;
use crate::filter::SmoothingFilter;
use crate::geometry::{Rect, ScreenPoint};
use crate::mapper::GazeMapper;
use crate::selection::{Millis, SelectionMachine, SelectionState};
use crate::tracking::GazeSource;

/// Resolves the item under a screen point; implemented by the UI layer.
pub trait HitTester<I> {
    fn item_at(&self, point: ScreenPoint) -> Option<I>;
}

/// One tick's externally visible pipeline state, for rendering.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<I> {
    /// Authoritative pointer position (latched while frozen, absent while
    /// the signal is lost).
    pub display_point: Option<ScreenPoint>,
    pub state: SelectionState,
    /// The latched candidate while frozen, for highlighting.
    pub frozen_item: Option<I>,
    /// Elapsed fraction of the confirmation window while frozen.
    pub freeze_progress: Option<f64>,
}

/// The gaze-to-selection pipeline.
///
/// Owns the mapper, filter, blink detector and selection machine; each field
/// is written by exactly one component and nothing is shared across ticks.
pub struct GazePipeline<I> {
    mapper: GazeMapper,
    filter: SmoothingFilter,
    blink: BlinkDetector,
    machine: SelectionMachine<I>,
    target_rect: Rect,
    confirm_tx: Sender<ConfirmedSelection<I>>,
    smoothed: Option<ScreenPoint>,
    ticks: u64,
}

impl<I: Copy + PartialEq + std::fmt::Debug> GazePipeline<I> {
    pub fn new(
        config: &PipelineConfig,
        profile: CalibrationProfile,
        target_rect: Rect,
        confirm_tx: Sender<ConfirmedSelection<I>>,
    ) -> Self {
        Self {
            mapper: GazeMapper::new(profile, config.gaze_sensitivity_scaler),
            filter: SmoothingFilter::new(config.gaze_smoothing_factor),
            blink: BlinkDetector::new(config.ear_threshold),
            machine: SelectionMachine::new(config.dwell_to_freeze_ms, config.action_window_ms),
            target_rect,
            confirm_tx,
            smoothed: None,
            ticks: 0,
        }
    }

    /// Replaces the calibration profile wholesale and clears the smoothing
    /// history so the new mapping starts clean.
    pub fn replace_profile(&mut self, profile: CalibrationProfile) {
        self.mapper.set_profile(profile);
        self.filter.reset();
    }

    /// Advances the pipeline by one tick.
    pub fn tick(
        &mut self,
        source: &mut dyn GazeSource,
        hit: &dyn HitTester<I>,
        now: Millis,
    ) -> FrameView<I> {
        self.ticks += 1;

        let raw = if source.update() {
            source.raw_gaze_ratio()
        } else {
            None
        };
        let mapped = self.mapper.map(raw, self.target_rect);
        self.smoothed = self.filter.update(mapped);
        // The EAR is read every tick, frozen or not; the freeze latch
        // affects only the display point.
        let blink_edge = self.blink.observe(source.ear());

        let gazed = self.smoothed.and_then(|p| hit.item_at(p));

        if let Some(item) = self.machine.tick(gazed, self.smoothed, blink_edge, now) {
            crate::log(&format!("Selection confirmed: {:?}", item));
            if self
                .confirm_tx
                .send(ConfirmedSelection::new(item, self.ticks))
                .is_err()
            {
                crate::log("Warning: confirmation worker gone; selection dropped");
            }
        }

        self.frame_view(now)
    }

    /// The externally visible state for the current tick.
    pub fn frame_view(&self, now: Millis) -> FrameView<I> {
        FrameView {
            display_point: self.machine.display_point(self.smoothed),
            state: self.machine.state(),
            frozen_item: self.machine.frozen_item(),
            freeze_progress: self.machine.freeze_progress(now),
        }
    }

    /// The live smoothed point, unlatched; `None` while the signal is lost.
    pub fn smoothed_point(&self) -> Option<ScreenPoint> {
        self.smoothed
    }

    pub fn selection_state(&self) -> SelectionState {
        self.machine.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ItemId;
    use crate::tracking::{ReplaySource, Trace, TraceFrame};

    struct ConstHit(Option<ItemId>);

    impl HitTester<ItemId> for ConstHit {
        fn item_at(&self, _point: ScreenPoint) -> Option<ItemId> {
            self.0
        }
    }

    fn test_config() -> PipelineConfig {
        PipelineConfig {
            dwell_to_freeze_ms: 50,
            action_window_ms: 100,
            ..PipelineConfig::default()
        }
    }

    fn pipeline(
        config: &PipelineConfig,
    ) -> (
        GazePipeline<ItemId>,
        std::sync::mpsc::Receiver<ConfirmedSelection<ItemId>>,
    ) {
        let (sender, receiver) = create_confirm_queue();
        let pipeline = GazePipeline::new(
            config,
            CalibrationProfile::default(),
            Rect::new(0, 0, 200, 200),
            sender,
        );
        (pipeline, receiver)
    }

    #[test]
    fn test_dwell_freeze_blink_confirms_once() {
        let config = test_config();
        let (mut pipeline, receiver) = pipeline(&config);

        let trace = Trace {
            frames: vec![
                TraceFrame::sample(0.5, 0.5, 0.35),
                TraceFrame::sample(0.5, 0.5, 0.35),
                TraceFrame::sample(0.5, 0.5, 0.10),
            ],
        };
        let mut source = ReplaySource::new(trace, config.ear_threshold);
        let hit = ConstHit(Some(ItemId::Key(7)));

        let view = pipeline.tick(&mut source, &hit, 0);
        assert_eq!(view.state, SelectionState::Navigating);
        assert!(view.display_point.is_some());

        // Unbroken dwell past the threshold freezes the candidate.
        let view = pipeline.tick(&mut source, &hit, 60);
        assert_eq!(view.state, SelectionState::Frozen);
        assert_eq!(view.frozen_item, Some(ItemId::Key(7)));

        // The closed-eye frame produces the confirming blink edge.
        let view = pipeline.tick(&mut source, &hit, 70);
        assert_eq!(view.state, SelectionState::Navigating);

        let confirmed = receiver.try_recv().expect("one confirmation queued");
        assert_eq!(confirmed.item, ItemId::Key(7));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_freeze_timeout_confirms_nothing() {
        let config = test_config();
        let (mut pipeline, receiver) = pipeline(&config);

        let trace = Trace {
            frames: vec![TraceFrame::sample(0.5, 0.5, 0.35); 3],
        };
        let mut source = ReplaySource::new(trace, config.ear_threshold);
        let hit = ConstHit(Some(ItemId::Suggestion(1)));

        pipeline.tick(&mut source, &hit, 0);
        let view = pipeline.tick(&mut source, &hit, 60);
        assert_eq!(view.state, SelectionState::Frozen);

        // Window expires with no blink.
        let view = pipeline.tick(&mut source, &hit, 200);
        assert_eq!(view.state, SelectionState::Navigating);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_signal_loss_clears_the_pointer() {
        let config = test_config();
        let (mut pipeline, _receiver) = pipeline(&config);

        let trace = Trace {
            frames: vec![TraceFrame::sample(0.5, 0.5, 0.35), TraceFrame::dropped()],
        };
        let mut source = ReplaySource::new(trace, config.ear_threshold);
        let hit = ConstHit(None);

        let view = pipeline.tick(&mut source, &hit, 0);
        assert!(view.display_point.is_some());

        // An unreadable frame is "no sample this tick": the pointer goes
        // away immediately instead of lingering on a stale average.
        let view = pipeline.tick(&mut source, &hit, 33);
        assert_eq!(view.display_point, None);
        assert_eq!(pipeline.smoothed_point(), None);
    }

    #[test]
    fn test_display_point_latches_during_freeze() {
        let config = test_config();
        let (mut pipeline, _receiver) = pipeline(&config);

        // Gaze drifts to a new position right after the freeze.
        let trace = Trace {
            frames: vec![
                TraceFrame::sample(0.5, 0.5, 0.35),
                TraceFrame::sample(0.5, 0.5, 0.35),
                TraceFrame::sample(0.9, 0.9, 0.35),
            ],
        };
        let mut source = ReplaySource::new(trace, config.ear_threshold);
        let hit = ConstHit(Some(ItemId::Key(0)));

        pipeline.tick(&mut source, &hit, 0);
        let frozen_view = pipeline.tick(&mut source, &hit, 60);
        assert_eq!(frozen_view.state, SelectionState::Frozen);
        let latched = frozen_view.display_point.unwrap();

        let view = pipeline.tick(&mut source, &hit, 70);
        assert_eq!(view.display_point, Some(latched));
        // The live smoothed point kept moving underneath the latch.
        assert_ne!(pipeline.smoothed_point(), Some(latched));
    }

    #[test]
    fn test_replace_profile_resets_smoothing() {
        let config = test_config();
        let (mut pipeline, _receiver) = pipeline(&config);

        let trace = Trace {
            frames: vec![
                TraceFrame::sample(0.25, 0.25, 0.35),
                TraceFrame::sample(0.75, 0.75, 0.35),
            ],
        };
        let mut source = ReplaySource::new(trace, config.ear_threshold);
        let hit = ConstHit(None);

        // First tick maps 0.25 to the rect origin and seeds the average.
        let view = pipeline.tick(&mut source, &hit, 0);
        assert_eq!(view.display_point, Some(ScreenPoint::new(0, 0)));

        pipeline.replace_profile(CalibrationProfile::default());

        // First point after the reset passes through unfiltered instead of
        // being dragged toward the pre-recalibration average: 0.75 maps to
        // (0.75-0.25)/(0.5*1.7) of the 200px rect.
        let view = pipeline.tick(&mut source, &hit, 33);
        assert_eq!(view.display_point, Some(ScreenPoint::new(117, 117)));
    }
}
