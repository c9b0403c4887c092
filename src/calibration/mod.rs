//! Calibration module for deriving the per-user gaze mapping.
//!
//! A calibration run walks the user's gaze through five fixed targets and
//! records the observed ratio extremes; the resulting profile feeds the
//! gaze mapper. Recalibration replaces the profile wholesale.

pub mod engine;
pub mod profile;

pub use engine::{CalibrationEngine, CalibrationUi, NullCalibrationUi};
pub use profile::CalibrationProfile;
