//! Pipeline configuration.
//!
//! Loads settings from config.json at startup. Provides timing thresholds,
//! smoothing and sensitivity factors, and calibration parameters. The loaded
//! struct is immutable and passed into each component at construction.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tick rate of the control loop, in frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Exponential smoothing factor for the gaze pointer (0-1, higher = snappier)
    #[serde(default = "default_smoothing_factor")]
    pub gaze_smoothing_factor: f64,
    /// Multiplier on the calibrated span; above 1.0 smaller eye movements cover the full area
    #[serde(default = "default_sensitivity_scaler")]
    pub gaze_sensitivity_scaler: f64,
    /// Eye-aspect-ratio below which the eye counts as closed
    #[serde(default = "default_ear_threshold")]
    pub ear_threshold: f64,
    /// Sustained gaze on one item before the selection freezes (milliseconds)
    #[serde(default = "default_dwell_to_freeze_ms")]
    pub dwell_to_freeze_ms: u64,
    /// Confirmation window after freezing before the candidate is abandoned (milliseconds)
    #[serde(default = "default_action_window_ms")]
    pub action_window_ms: u64,
    /// Sampling window per calibration target (milliseconds)
    #[serde(default = "default_calibration_point_duration_ms")]
    pub calibration_point_duration_ms: u64,
    /// Inset of the corner calibration targets from the rectangle edge (pixels)
    #[serde(default = "default_calibration_target_inset_px")]
    pub calibration_target_inset_px: i32,
}

fn default_fps() -> u32 {
    30
}

fn default_smoothing_factor() -> f64 {
    0.07
}

fn default_sensitivity_scaler() -> f64 {
    1.7
}

fn default_ear_threshold() -> f64 {
    0.24
}

fn default_dwell_to_freeze_ms() -> u64 {
    800
}

fn default_action_window_ms() -> u64 {
    1000
}

fn default_calibration_point_duration_ms() -> u64 {
    2500
}

fn default_calibration_target_inset_px() -> i32 {
    23
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            gaze_smoothing_factor: default_smoothing_factor(),
            gaze_sensitivity_scaler: default_sensitivity_scaler(),
            ear_threshold: default_ear_threshold(),
            dwell_to_freeze_ms: default_dwell_to_freeze_ms(),
            action_window_ms: default_action_window_ms(),
            calibration_point_duration_ms: default_calibration_point_duration_ms(),
            calibration_target_inset_px: default_calibration_target_inset_px(),
        }
    }
}

/// Default location: config.json next to the executable.
pub fn default_config_path() -> PathBuf {
    crate::paths::get_exe_dir().join("config.json")
}

/// Loads configuration from the given file or returns defaults.
pub fn load_config(config_path: &Path) -> PipelineConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    PipelineConfig::default()
}
