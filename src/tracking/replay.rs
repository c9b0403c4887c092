//! Recorded gaze traces.
//!
//! A trace file holds one tracker frame per tick as a real device would
//! produce them; [`ReplaySource`] plays it back behind the [`GazeSource`]
//! contract, including the freeze-on-blink ratio semantics.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::GazeSource;

/// One recorded tracker frame.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Horizontal gaze ratio in [0, 1].
    pub h: f64,
    /// Vertical gaze ratio in [0, 1].
    pub v: f64,
    /// Eye aspect ratio; low while the eye is closed.
    pub ear: f64,
    /// No landmarks this frame (face lost); h/v are ignored.
    #[serde(default)]
    pub lost: bool,
    /// Frame could not be read from the device at all.
    #[serde(default)]
    pub dropped: bool,
}

impl TraceFrame {
    /// A frame with landmarks present.
    pub fn sample(h: f64, v: f64, ear: f64) -> Self {
        Self {
            h,
            v,
            ear,
            lost: false,
            dropped: false,
        }
    }

    /// A frame where the face was not detected.
    pub fn lost() -> Self {
        Self {
            h: 0.0,
            v: 0.0,
            ear: 0.0,
            lost: true,
            dropped: false,
        }
    }

    /// A frame the device failed to deliver.
    pub fn dropped() -> Self {
        Self {
            h: 0.0,
            v: 0.0,
            ear: 0.0,
            lost: false,
            dropped: true,
        }
    }
}

/// A recorded gaze trace.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Trace {
    pub frames: Vec<TraceFrame>,
}

impl Trace {
    /// Loads a trace from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace file {}", path.display()))?;
        let trace: Trace = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse trace file {}", path.display()))?;
        Ok(trace)
    }
}

/// Plays a recorded trace behind the [`GazeSource`] contract.
///
/// The reported ratio is the last valid one: a frame only refreshes it when
/// landmarks are present and the eye is open, so the ratio stays frozen
/// across blinks and tracking loss exactly as a live tracker reports it.
pub struct ReplaySource {
    frames: Vec<TraceFrame>,
    pos: usize,
    cycle: bool,
    ear_threshold: f64,
    current_ear: f64,
    last_valid_ratio: Option<(f64, f64)>,
}

impl ReplaySource {
    pub fn new(trace: Trace, ear_threshold: f64) -> Self {
        Self {
            frames: trace.frames,
            pos: 0,
            cycle: false,
            ear_threshold,
            current_ear: 0.0,
            last_valid_ratio: None,
        }
    }

    /// Opens a trace file. Failure here is the device-initialization failure
    /// of the pipeline: the caller aborts startup rather than retrying.
    pub fn from_file(path: &Path, ear_threshold: f64) -> Result<Self> {
        Ok(Self::new(Trace::from_file(path)?, ear_threshold))
    }

    /// Restarts the trace from the beginning instead of running dry.
    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }

    pub fn is_exhausted(&self) -> bool {
        !self.cycle && self.pos >= self.frames.len()
    }
}

impl GazeSource for ReplaySource {
    fn update(&mut self) -> bool {
        if self.frames.is_empty() {
            return false;
        }
        if self.pos >= self.frames.len() {
            if self.cycle {
                self.pos = 0;
            } else {
                self.current_ear = 0.0;
                return false;
            }
        }
        let frame = self.frames[self.pos];
        self.pos += 1;

        if frame.dropped {
            self.current_ear = 0.0;
            return false;
        }
        if frame.lost {
            self.current_ear = 0.0;
            return true;
        }

        self.current_ear = frame.ear;
        // Only an open eye refreshes the ratio; it stays frozen on the last
        // valid value across blinks and loss.
        if frame.ear > self.ear_threshold {
            self.last_valid_ratio = Some((frame.h, frame.v));
        }
        true
    }

    fn raw_gaze_ratio(&self) -> Option<(f64, f64)> {
        self.last_valid_ratio
    }

    fn ear(&self) -> f64 {
        self.current_ear
    }
}
