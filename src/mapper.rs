//! Gaze-ratio to screen-coordinate mapping.

use crate::calibration::CalibrationProfile;
use crate::geometry::{Rect, ScreenPoint};

/// Spans smaller than this are degenerate after sensitivity scaling.
const MIN_SPAN: f64 = 0.01;

/// Maps raw gaze ratios into pixel coordinates using the calibrated bounds.
#[derive(Clone, Debug)]
pub struct GazeMapper {
    profile: CalibrationProfile,
    sensitivity: f64,
}

impl GazeMapper {
    pub fn new(profile: CalibrationProfile, sensitivity: f64) -> Self {
        Self {
            profile,
            sensitivity,
        }
    }

    /// Replaces the profile wholesale (recalibration).
    pub fn set_profile(&mut self, profile: CalibrationProfile) {
        self.profile = profile;
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Maps a raw ratio pair into `target`, clamped to
    /// `[left, right-1] x [top, bottom-1]`.
    ///
    /// The normalized values are deliberately unclamped: gaze beyond the
    /// calibrated extremes maps beyond [0, 1] and only the final pixel
    /// coordinate is clamped. Returns `None` only for absent input.
    pub fn map(&self, raw: Option<(f64, f64)>, target: Rect) -> Option<ScreenPoint> {
        let (raw_h, raw_v) = raw?;

        let mut span_h = self.profile.h_span() * self.sensitivity;
        let mut span_v = self.profile.v_span() * self.sensitivity;

        // A collapsed span would blow the division up.
        if span_h.abs() < MIN_SPAN {
            span_h = 0.5 * self.sensitivity;
        }
        if span_v.abs() < MIN_SPAN {
            span_v = 0.5 * self.sensitivity;
        }

        let norm_h = if span_h != 0.0 {
            (raw_h - self.profile.h_left) / span_h
        } else {
            0.5
        };
        let norm_v = if span_v != 0.0 {
            (raw_v - self.profile.v_top) / span_v
        } else {
            0.5
        };

        let x = target.left as f64 + norm_h * target.width as f64;
        let y = target.top as f64 + norm_v * target.height as f64;

        let x = (x as i32).clamp(target.left, target.right() - 1);
        let y = (y as i32).clamp(target.top, target.bottom() - 1);
        Some(ScreenPoint::new(x, y))
    }
}
