//! Resolution of a continuous drag into one of the four judgments.
//!
//! A tracker sees the samples of one pointer-down to pointer-up interaction
//! and only looks at the latest displacement when the pointer is released.

use shared::domain::Direction;
use tracing::debug;

/// Cumulative displacement from the pointer-down position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureSample {
    pub dx: f32,
    pub dy: f32,
}

impl GestureSample {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }
}

/// Horizontal wins ties (`|dx| == |dy|`). Displacement must strictly exceed
/// the threshold on the dominant axis.
pub fn resolve(sample: GestureSample, threshold: f32) -> Option<Direction> {
    let GestureSample { dx, dy } = sample;
    if !(dx.is_finite() && dy.is_finite()) {
        return None;
    }

    if dx.abs() >= dy.abs() {
        if dx > threshold {
            Some(Direction::Yes)
        } else if dx < -threshold {
            Some(Direction::No)
        } else {
            None
        }
    } else if dy < -threshold {
        Some(Direction::DontKnow)
    } else if dy > threshold {
        Some(Direction::Trash)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct GestureTracker {
    threshold: f32,
    latest: Option<GestureSample>,
}

impl GestureTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            latest: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.latest.is_some()
    }

    /// Starts a new interaction, discarding anything left from the previous one.
    pub fn begin(&mut self) {
        self.latest = Some(GestureSample::default());
    }

    /// Records a sample. Samples outside an interaction are ignored.
    pub fn sample(&mut self, sample: GestureSample) -> bool {
        match self.latest.as_mut() {
            Some(latest) => {
                *latest = sample;
                true
            }
            None => false,
        }
    }

    /// Ends the interaction. `None` means cancel: the drag stayed under threshold.
    pub fn release(&mut self) -> Option<Direction> {
        let sample = self.latest.take()?;
        let resolved = resolve(sample, self.threshold);
        debug!(
            dx = sample.dx,
            dy = sample.dy,
            resolved = resolved.map(|d| d.as_str()).unwrap_or("none"),
            "gesture: interaction released"
        );
        resolved
    }

    /// Abandons the interaction without resolving it.
    pub fn reset(&mut self) {
        self.latest = None;
    }
}
