//! Temporal smoothing of the mapped gaze point.

use crate::geometry::ScreenPoint;

/// Exponential moving average over mapped screen points.
///
/// Signal loss is reported immediately rather than smoothed over: an absent
/// input resets the filter so downstream logic can treat the gaze as lost
/// instead of frozen on a stale average.
#[derive(Clone, Debug)]
pub struct SmoothingFilter {
    alpha: f64,
    state: Option<(f64, f64)>,
}

impl SmoothingFilter {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    /// Feeds one tick's mapped point and returns the smoothed point.
    ///
    /// The first point after (re)initialization passes through unfiltered.
    pub fn update(&mut self, point: Option<ScreenPoint>) -> Option<ScreenPoint> {
        let Some(point) = point else {
            self.state = None;
            return None;
        };

        let next = match self.state {
            None => (point.x as f64, point.y as f64),
            Some((sx, sy)) => (
                self.alpha * point.x as f64 + (1.0 - self.alpha) * sx,
                self.alpha * point.y as f64 + (1.0 - self.alpha) * sy,
            ),
        };
        self.state = Some(next);
        Some(ScreenPoint::new(next.0.round() as i32, next.1.round() as i32))
    }

    /// Discards the running average; the next input passes through as-is.
    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_point_passes_through() {
        let mut filter = SmoothingFilter::new(0.07);
        let point = ScreenPoint::new(120, 340);
        assert_eq!(filter.update(Some(point)), Some(point));
    }

    #[test]
    fn test_constant_input_converges_monotonically() {
        let mut filter = SmoothingFilter::new(0.07);
        filter.update(Some(ScreenPoint::new(0, 0)));

        let target = ScreenPoint::new(200, 100);
        let mut last_dx = i32::MAX;
        let mut last_dy = i32::MAX;
        for _ in 0..200 {
            let out = filter.update(Some(target)).unwrap();
            let dx = (target.x - out.x).abs();
            let dy = (target.y - out.y).abs();
            assert!(dx <= last_dx && dy <= last_dy);
            last_dx = dx;
            last_dy = dy;
        }
        assert_eq!(last_dx, 0);
        assert_eq!(last_dy, 0);

        // Once converged it stays put.
        assert_eq!(filter.update(Some(target)), Some(target));
    }

    #[test]
    fn test_absent_input_resets_history() {
        let mut filter = SmoothingFilter::new(0.07);
        filter.update(Some(ScreenPoint::new(500, 500)));

        assert_eq!(filter.update(None), None);

        // The next point carries no influence from pre-reset history.
        let fresh = ScreenPoint::new(10, 10);
        assert_eq!(filter.update(Some(fresh)), Some(fresh));
    }

    #[test]
    fn test_reset_discards_average() {
        let mut filter = SmoothingFilter::new(0.07);
        filter.update(Some(ScreenPoint::new(500, 500)));
        filter.reset();

        let fresh = ScreenPoint::new(42, 7);
        assert_eq!(filter.update(Some(fresh)), Some(fresh));
    }
}
