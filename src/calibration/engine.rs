//! Five-point calibration run.
//!
//! Visits four inset corners and the center of the interaction rectangle,
//! samples the tracker at each for a fixed window, and derives the per-user
//! ratio bounds from the per-point medians.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::PipelineConfig;
use crate::geometry::{Rect, ScreenPoint};
use crate::tracking::GazeSource;

use super::profile::CalibrationProfile;

/// Receives calibration progress so an external surface can render targets.
pub trait CalibrationUi {
    /// A new fixation target is active; the user should look at it.
    fn show_target(&mut self, target: ScreenPoint, index: usize, total: usize);

    /// A raw ratio pair was collected for the current target.
    fn sample_collected(&mut self, _raw: (f64, f64)) {}
}

/// A no-op surface for headless runs and tests.
pub struct NullCalibrationUi;

impl CalibrationUi for NullCalibrationUi {
    fn show_target(&mut self, _target: ScreenPoint, _index: usize, _total: usize) {}
}

/// Runs the five-point calibration sequence.
pub struct CalibrationEngine {
    point_duration: Duration,
    frame_interval: Duration,
    target_inset: i32,
}

impl CalibrationEngine {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            point_duration: Duration::from_millis(config.calibration_point_duration_ms),
            frame_interval: Duration::from_millis(1000 / config.fps.max(1) as u64),
            target_inset: config.calibration_target_inset_px,
        }
    }

    /// Runs the full sequence and returns the derived profile.
    ///
    /// A completed pass is always authoritative, even if every window came
    /// back empty (the bounds then fall back to defaults). Returns `None`
    /// only when `stop` is raised mid-sequence; the caller keeps whatever
    /// profile it had.
    pub fn run(
        &self,
        rect: Rect,
        source: &mut dyn GazeSource,
        ui: &mut dyn CalibrationUi,
        stop: &AtomicBool,
    ) -> Option<CalibrationProfile> {
        let targets = self.target_points(rect);
        let total = targets.len();

        // Running extremes over all five per-point medians. Any point can
        // move either bound of either axis.
        let mut min_h = 1.0f64;
        let mut max_h = 0.0f64;
        let mut min_v = 1.0f64;
        let mut max_v = 0.0f64;

        for (index, target) in targets.into_iter().enumerate() {
            ui.show_target(target, index, total);
            crate::log(&format!(
                "Calibration target {}/{} at ({}, {})",
                index + 1,
                total,
                target.x,
                target.y
            ));

            let (hs, vs) = self.collect_at_target(source, ui, stop)?;
            if let Some(median_h) = upper_median(hs) {
                min_h = min_h.min(median_h);
                max_h = max_h.max(median_h);
            }
            if let Some(median_v) = upper_median(vs) {
                min_v = min_v.min(median_v);
                max_v = max_v.max(median_v);
            }
        }

        let profile = CalibrationProfile::from_observed_bounds(min_h, max_h, min_v, max_v);
        crate::log(&format!(
            "Calibration complete: H {:.2} -> {:.2}, V {:.2} -> {:.2}",
            profile.h_left, profile.h_right, profile.v_top, profile.v_bottom
        ));
        Some(profile)
    }

    /// The five fixation targets: four inset corners plus the center.
    ///
    /// Corners are inset so the eye cannot fixate past the rectangle edge.
    fn target_points(&self, rect: Rect) -> Vec<ScreenPoint> {
        let inset = self.target_inset;
        vec![
            ScreenPoint::new(rect.left + inset, rect.top + inset),
            ScreenPoint::new(rect.right() - inset, rect.top + inset),
            rect.center(),
            ScreenPoint::new(rect.left + inset, rect.bottom() - inset),
            ScreenPoint::new(rect.right() - inset, rect.bottom() - inset),
        ]
    }

    /// Samples the source for one target window.
    ///
    /// Collects every valid ratio pair seen during the window; unreadable
    /// frames are skipped without shortening the window. Returns `None` on
    /// a stop request.
    fn collect_at_target(
        &self,
        source: &mut dyn GazeSource,
        ui: &mut dyn CalibrationUi,
        stop: &AtomicBool,
    ) -> Option<(Vec<f64>, Vec<f64>)> {
        let deadline = Instant::now() + self.point_duration;
        let mut hs = Vec::new();
        let mut vs = Vec::new();
        while Instant::now() < deadline {
            if stop.load(Ordering::SeqCst) {
                crate::log("Calibration aborted by stop request");
                return None;
            }
            if source.update() {
                if let Some((h, v)) = source.raw_gaze_ratio() {
                    hs.push(h);
                    vs.push(v);
                    ui.sample_collected((h, v));
                }
            }
            std::thread::sleep(self.frame_interval);
        }
        Some((hs, vs))
    }
}

/// Upper median: the element at `len / 2` after sorting.
///
/// Robust against blink-induced outliers and transient tracking loss during
/// the dwell window, unlike the mean.
fn upper_median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(values[values.len() / 2])
}
