//! Dwell/freeze/confirm selection state machine.
//!
//! Pure dwell cannot distinguish "looking to read" from "looking to
//! select", and pure blink cannot tell which item an involuntary blink
//! targets. The freeze phase converts continuous attention into one
//! unambiguous confirmation window: dwell on an item latches it, a blink
//! inside the window confirms it, and the window expiring abandons it.

use crate::geometry::ScreenPoint;

/// Milliseconds since the control loop started.
pub type Millis = u64;

/// On-screen items a gaze can select.
///
/// The state machine is generic over the item type and never branches on
/// the variant; this is the concrete type the application instantiates it
/// with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemId {
    /// A keyboard key, by layout index.
    Key(u16),
    /// A word-suggestion slot.
    Suggestion(u16),
}

/// Externally visible machine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionState {
    Navigating,
    Frozen,
}

#[derive(Clone, Copy, Debug)]
enum Phase<I> {
    Navigating {
        dwell_item: Option<I>,
        dwell_start: Millis,
    },
    Frozen {
        item: I,
        position: ScreenPoint,
        start: Millis,
    },
}

/// Turns per-tick gaze and blink inputs into confirmed selections.
#[derive(Clone, Debug)]
pub struct SelectionMachine<I> {
    dwell_to_freeze: Millis,
    action_window: Millis,
    phase: Phase<I>,
}

impl<I: Copy + PartialEq> SelectionMachine<I> {
    pub fn new(dwell_to_freeze_ms: Millis, action_window_ms: Millis) -> Self {
        Self {
            dwell_to_freeze: dwell_to_freeze_ms,
            action_window: action_window_ms,
            phase: Phase::Navigating {
                dwell_item: None,
                dwell_start: 0,
            },
        }
    }

    /// Advances the machine by one tick.
    ///
    /// Returns the confirmed item when a blink edge lands inside the action
    /// window: at most one confirmation per freeze cycle. The transition
    /// back to navigating is unconditional, so a failing confirmation
    /// handler downstream can never strand the machine in the frozen state.
    pub fn tick(
        &mut self,
        gazed: Option<I>,
        smoothed: Option<ScreenPoint>,
        blink_edge: bool,
        now: Millis,
    ) -> Option<I> {
        match self.phase {
            Phase::Navigating {
                dwell_item,
                dwell_start,
            } => {
                match gazed {
                    Some(item) => {
                        if dwell_item != Some(item) {
                            self.phase = Phase::Navigating {
                                dwell_item: Some(item),
                                dwell_start: now,
                            };
                        } else if now.saturating_sub(dwell_start) > self.dwell_to_freeze {
                            if let Some(position) = smoothed {
                                self.phase = Phase::Frozen {
                                    item,
                                    position,
                                    start: now,
                                };
                            }
                        }
                    }
                    None => {
                        // No partial credit: gaze leaving and returning
                        // restarts the dwell.
                        self.phase = Phase::Navigating {
                            dwell_item: None,
                            dwell_start: 0,
                        };
                    }
                }
                None
            }
            Phase::Frozen { item, start, .. } => {
                if now.saturating_sub(start) > self.action_window {
                    // Timeout abandon, not an error.
                    self.phase = Phase::Navigating {
                        dwell_item: None,
                        dwell_start: 0,
                    };
                    None
                } else if blink_edge {
                    self.phase = Phase::Navigating {
                        dwell_item: None,
                        dwell_start: 0,
                    };
                    Some(item)
                } else {
                    None
                }
            }
        }
    }

    pub fn state(&self) -> SelectionState {
        match self.phase {
            Phase::Navigating { .. } => SelectionState::Navigating,
            Phase::Frozen { .. } => SelectionState::Frozen,
        }
    }

    /// The latched candidate while frozen.
    pub fn frozen_item(&self) -> Option<I> {
        match self.phase {
            Phase::Frozen { item, .. } => Some(item),
            Phase::Navigating { .. } => None,
        }
    }

    /// Elapsed fraction of the action window, for progress rendering.
    pub fn freeze_progress(&self, now: Millis) -> Option<f64> {
        match self.phase {
            Phase::Frozen { start, .. } => {
                let elapsed = now.saturating_sub(start) as f64;
                Some((elapsed / self.action_window.max(1) as f64).min(1.0))
            }
            Phase::Navigating { .. } => None,
        }
    }

    /// The authoritative display point: the latched position while frozen,
    /// the live smoothed point otherwise.
    ///
    /// Latching at this seam keeps the user's natural eye jitter from
    /// drifting off the target during confirmation without touching the
    /// smoothing filter's state.
    pub fn display_point(&self, live: Option<ScreenPoint>) -> Option<ScreenPoint> {
        match self.phase {
            Phase::Frozen { position, .. } => Some(position),
            Phase::Navigating { .. } => live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DWELL: Millis = 800;
    const WINDOW: Millis = 1000;

    fn machine() -> SelectionMachine<ItemId> {
        SelectionMachine::new(DWELL, WINDOW)
    }

    const POINT: ScreenPoint = ScreenPoint { x: 100, y: 100 };
    const A: ItemId = ItemId::Key(1);
    const B: ItemId = ItemId::Suggestion(0);

    #[test]
    fn test_dwell_then_blink_confirms() {
        let mut m = machine();

        assert_eq!(m.tick(Some(A), Some(POINT), false, 0), None);
        assert_eq!(m.state(), SelectionState::Navigating);

        // 900ms of unbroken dwell crosses the threshold.
        assert_eq!(m.tick(Some(A), Some(POINT), false, 900), None);
        assert_eq!(m.state(), SelectionState::Frozen);
        assert_eq!(m.frozen_item(), Some(A));

        // Blink 50ms into the window confirms and releases the machine.
        assert_eq!(m.tick(Some(A), Some(POINT), true, 950), Some(A));
        assert_eq!(m.state(), SelectionState::Navigating);
        assert_eq!(m.frozen_item(), None);
    }

    #[test]
    fn test_action_window_timeout_abandons() {
        let mut m = machine();
        m.tick(Some(B), Some(POINT), false, 0);
        m.tick(Some(B), Some(POINT), false, 900);
        assert_eq!(m.state(), SelectionState::Frozen);

        // 1001ms elapsed with no blink: revert, no confirmation.
        assert_eq!(m.tick(Some(B), Some(POINT), false, 1901), None);
        assert_eq!(m.state(), SelectionState::Navigating);
        assert_eq!(m.frozen_item(), None);
    }

    #[test]
    fn test_item_changes_reset_the_dwell_timer() {
        let mut m = machine();
        let mut now = 0;
        // Toggling A -> B -> A every 100ms never accumulates enough dwell.
        for _ in 0..30 {
            let item = if (now / 100) % 2 == 0 { A } else { B };
            assert_eq!(m.tick(Some(item), Some(POINT), false, now), None);
            assert_eq!(m.state(), SelectionState::Navigating);
            now += 100;
        }
    }

    #[test]
    fn test_gaze_loss_clears_dwell_credit() {
        let mut m = machine();
        m.tick(Some(A), Some(POINT), false, 0);
        m.tick(Some(A), Some(POINT), false, 700);
        // Gaze leaves, then returns: the 700ms of credit is gone.
        m.tick(None, None, false, 750);
        m.tick(Some(A), Some(POINT), false, 800);
        assert_eq!(m.tick(Some(A), Some(POINT), false, 1500), None);
        assert_eq!(m.state(), SelectionState::Navigating);

        // Held past the threshold from the new start it freezes.
        assert_eq!(m.tick(Some(A), Some(POINT), false, 1700), None);
        assert_eq!(m.state(), SelectionState::Frozen);
    }

    #[test]
    fn test_blink_while_navigating_is_ignored() {
        let mut m = machine();
        assert_eq!(m.tick(Some(A), Some(POINT), true, 0), None);
        assert_eq!(m.tick(Some(A), Some(POINT), true, 100), None);
        assert_eq!(m.state(), SelectionState::Navigating);
    }

    #[test]
    fn test_display_point_latches_while_frozen() {
        let mut m = machine();
        m.tick(Some(A), Some(POINT), false, 0);
        m.tick(Some(A), Some(POINT), false, 900);
        assert_eq!(m.state(), SelectionState::Frozen);

        // Live gaze drifts; the display point stays latched.
        let drifted = ScreenPoint::new(300, 40);
        assert_eq!(m.display_point(Some(drifted)), Some(POINT));
        assert_eq!(m.display_point(None), Some(POINT));

        m.tick(Some(A), Some(drifted), true, 950);
        assert_eq!(m.display_point(Some(drifted)), Some(drifted));
    }

    #[test]
    fn test_freeze_progress_reports_window_fraction() {
        let mut m = machine();
        assert_eq!(m.freeze_progress(0), None);
        m.tick(Some(A), Some(POINT), false, 0);
        m.tick(Some(A), Some(POINT), false, 900);

        let quarter = m.freeze_progress(1150).unwrap();
        assert!((quarter - 0.25).abs() < 1e-9);
        // Capped at 1.0 even past the window.
        assert_eq!(m.freeze_progress(5000), Some(1.0));
    }
}
