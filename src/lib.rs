//! Gaze-to-selection pipeline.
//!
//! Converts a noisy, intermittently-available 2D gaze-ratio signal into
//! discrete, confirmed UI selection events: per-user calibration,
//! ratio-to-screen mapping, temporal smoothing, eyelid-closure edge
//! detection, and a dwell/freeze/confirm selection state machine.
//!
//! Rendering, speech feedback, landmark extraction and word suggestion are
//! external collaborators consumed through the narrow traits in
//! [`tracking`], [`calibration`] and [`pipeline`].

pub mod blink;
pub mod calibration;
pub mod config;
pub mod filter;
pub mod geometry;
pub mod mapper;
pub mod paths;
pub mod pipeline;
pub mod selection;
pub mod tracking;

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("gaze_typer.log");
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let _ = file.write_all(line.as_bytes());
    }
}
