//! Gaze-typing replay driver.
//!
//! Feeds a recorded gaze trace through the selection pipeline and logs every
//! confirmed selection. A real deployment embeds the same pipeline with a
//! live tracker, a renderer and a speech engine in place of the replay
//! pieces wired up here.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use gaze_typer::calibration::CalibrationUi;
use gaze_typer::config::{default_config_path, load_config};
use gaze_typer::geometry::{Rect, ScreenPoint};
use gaze_typer::log;
use gaze_typer::pipeline::{
    reset_control_flags, run_pipeline, ConfirmedSelection, FrameView, HitTester, TickObserver,
};
use gaze_typer::selection::{ItemId, SelectionState};
use gaze_typer::tracking::{ReplaySource, Trace};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the recorded gaze trace (JSON)
    #[clap(short, long)]
    trace: PathBuf,

    /// Path to config.json (defaults to the file next to the executable)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks (defaults to one pass over the trace)
    #[clap(long)]
    max_ticks: Option<u64>,

    /// Interaction area width in pixels
    #[clap(long, default_value_t = 1280)]
    width: i32,

    /// Interaction area height in pixels
    #[clap(long, default_value_t = 720)]
    height: i32,
}

/// Hit-testing over a simple banded layout: a suggestion strip across the
/// top and a key grid below, matching the shape of the on-screen keyboard.
struct BandedLayout {
    rect: Rect,
    suggestion_band_height: i32,
    suggestion_slots: i32,
    key_cols: i32,
    key_rows: i32,
}

impl BandedLayout {
    fn new(rect: Rect) -> Self {
        Self {
            rect,
            suggestion_band_height: rect.height / 6,
            suggestion_slots: 3,
            key_cols: 10,
            key_rows: 4,
        }
    }
}

impl HitTester<ItemId> for BandedLayout {
    fn item_at(&self, point: ScreenPoint) -> Option<ItemId> {
        if !self.rect.contains(point) {
            return None;
        }
        let rel_x = point.x - self.rect.left;
        let rel_y = point.y - self.rect.top;

        if rel_y < self.suggestion_band_height {
            let slot = (rel_x * self.suggestion_slots / self.rect.width)
                .min(self.suggestion_slots - 1);
            return Some(ItemId::Suggestion(slot as u16));
        }

        let key_area_height = self.rect.height - self.suggestion_band_height;
        let col = (rel_x * self.key_cols / self.rect.width).min(self.key_cols - 1);
        let row = ((rel_y - self.suggestion_band_height) * self.key_rows / key_area_height)
            .min(self.key_rows - 1);
        Some(ItemId::Key((row * self.key_cols + col) as u16))
    }
}

/// Announces calibration targets on the console in place of a renderer.
struct ConsoleCalibrationUi;

impl CalibrationUi for ConsoleCalibrationUi {
    fn show_target(&mut self, target: ScreenPoint, index: usize, total: usize) {
        log(&format!(
            "Look at target {}/{} at ({}, {})",
            index + 1,
            total,
            target.x,
            target.y
        ));
    }
}

/// Logs selection-state transitions in place of a renderer.
#[derive(Default)]
struct StateLogger {
    last: Option<SelectionState>,
}

impl TickObserver<ItemId> for StateLogger {
    fn frame(&mut self, view: FrameView<ItemId>) {
        if self.last != Some(view.state) {
            match view.state {
                SelectionState::Frozen => {
                    if let Some(item) = view.frozen_item {
                        log(&format!("Frozen on {:?}, awaiting blink", item));
                    }
                }
                SelectionState::Navigating => log("Navigating"),
            }
            self.last = Some(view.state);
        }
    }
}

fn main() -> Result<()> {
    // Log panics before dying; the hook runs after paths are initializable.
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        eprintln!("[PANIC]{} {}", location, msg);
        log(&format!("[PANIC]{} {}", location, msg));
    }));

    gaze_typer::paths::ensure_directories().context("Failed to create output directories")?;

    let args = Args::parse();
    let config = load_config(&args.config.unwrap_or_else(default_config_path));

    log(&format!("Replaying trace: {}", args.trace.display()));
    // A missing or unreadable trace is the device-initialization failure:
    // fatal for the pipeline, decided here rather than retried inside.
    let trace = Trace::from_file(&args.trace)?;
    let total_frames = trace.frames.len() as u64;
    log(&format!("Trace loaded: {} frames", total_frames));

    let mut source = ReplaySource::new(trace, config.ear_threshold).cycling();

    let interaction_rect = Rect::new(0, 0, args.width, args.height);
    let layout = BandedLayout::new(interaction_rect);

    let handler = |sel: ConfirmedSelection<ItemId>| {
        log(&format!(
            "Confirmed {:?} (tick {}, {})",
            sel.item,
            sel.tick,
            sel.confirmed_at.format("%H:%M:%S%.3f")
        ));
        Ok(())
    };

    reset_control_flags();
    run_pipeline(
        &config,
        interaction_rect,
        &mut source,
        &layout,
        &mut ConsoleCalibrationUi,
        handler,
        &mut StateLogger::default(),
        Some(args.max_ticks.unwrap_or(total_frames)),
    );

    log("Replay finished");
    Ok(())
}
