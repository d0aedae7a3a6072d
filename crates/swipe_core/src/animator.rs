//! Visual transition for a committed or cancelled gesture.
//!
//! The animator is a pure state object advanced by `tick`. It never decides a
//! direction; it only moves the card and reports when a transition is over.

use std::time::Duration;

use shared::domain::Direction;
use tracing::debug;

use crate::{config::EngineConfig, gesture::GestureSample};

/// What the host applies to the card on each frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub rotation_deg: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEvent {
    /// Commit transition finished and the offset is back at neutral.
    CommitFinished(Direction),
    /// Cancel spring reached neutral.
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Dragging,
    Committing {
        direction: Direction,
        from: (f32, f32),
        to: (f32, f32),
        elapsed: Duration,
    },
    Settling {
        from: (f32, f32),
        elapsed: Duration,
    },
}

/// Rotation follows horizontal offset only and saturates at half the viewport.
pub fn rotation_for(offset_x: f32, viewport_width: f32, max_rotation_deg: f32) -> f32 {
    let half = viewport_width / 2.0;
    if half <= 0.0 || !offset_x.is_finite() {
        return 0.0;
    }
    (offset_x / half * max_rotation_deg).clamp(-max_rotation_deg, max_rotation_deg)
}

fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

#[derive(Debug, Clone)]
pub struct CommitAnimator {
    commit_duration: Duration,
    viewport_width: f32,
    max_rotation_deg: f32,
    spring_omega: f32,
    settle_epsilon: f32,
    max_settle_duration: Duration,
    offset: (f32, f32),
    phase: Phase,
}

impl CommitAnimator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            commit_duration: config.commit_duration,
            viewport_width: config.viewport_width,
            max_rotation_deg: config.max_rotation_deg,
            spring_omega: config.spring_stiffness.max(0.0).sqrt(),
            settle_epsilon: config.settle_epsilon,
            max_settle_duration: config.max_settle_duration,
            offset: (0.0, 0.0),
            phase: Phase::Idle,
        }
    }

    pub fn offset(&self) -> (f32, f32) {
        self.offset
    }

    pub fn rotation_deg(&self) -> f32 {
        rotation_for(self.offset.0, self.viewport_width, self.max_rotation_deg)
    }

    pub fn transform(&self) -> Transform {
        Transform {
            x: self.offset.0,
            y: self.offset.1,
            rotation_deg: self.rotation_deg(),
        }
    }

    pub fn is_committing(&self) -> bool {
        matches!(self.phase, Phase::Committing { .. })
    }

    pub fn is_settling(&self) -> bool {
        matches!(self.phase, Phase::Settling { .. })
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Follows the pointer. Interrupts a settling spring; ignored during a commit.
    pub fn drag_to(&mut self, sample: GestureSample) -> bool {
        if self.is_committing() {
            return false;
        }
        self.offset = (sample.dx, sample.dy);
        self.phase = Phase::Dragging;
        true
    }

    /// Starts sending the card off-screen. Returns `false` if a commit is
    /// already running, in which case nothing changes.
    pub fn start_commit(&mut self, direction: Direction) -> bool {
        if self.is_committing() {
            return false;
        }
        let (ux, uy) = direction.unit_vector();
        let to = (ux * self.viewport_width, uy * self.viewport_width);
        debug!(
            direction = direction.as_str(),
            from_x = self.offset.0,
            from_y = self.offset.1,
            "animator: commit started"
        );
        self.phase = Phase::Committing {
            direction,
            from: self.offset,
            to,
            elapsed: Duration::ZERO,
        };
        true
    }

    /// Springs back to neutral. No-op during a commit or when already neutral.
    pub fn start_cancel(&mut self) -> bool {
        if self.is_committing() {
            return false;
        }
        if self.offset == (0.0, 0.0) {
            self.phase = Phase::Idle;
            return false;
        }
        self.phase = Phase::Settling {
            from: self.offset,
            elapsed: Duration::ZERO,
        };
        true
    }

    /// Advances the running transition by `dt`. Each transition yields its
    /// event exactly once, on the tick that ends it.
    pub fn tick(&mut self, dt: Duration) -> Option<AnimationEvent> {
        match self.phase {
            Phase::Idle | Phase::Dragging => None,
            Phase::Committing {
                direction,
                from,
                to,
                elapsed,
            } => {
                let elapsed = elapsed + dt;
                let t = (elapsed.as_secs_f32() / self.commit_duration.as_secs_f32()).min(1.0);
                if t >= 1.0 {
                    self.offset = (0.0, 0.0);
                    self.phase = Phase::Idle;
                    return Some(AnimationEvent::CommitFinished(direction));
                }
                let k = ease_in_out(t);
                self.offset = (from.0 + (to.0 - from.0) * k, from.1 + (to.1 - from.1) * k);
                self.phase = Phase::Committing {
                    direction,
                    from,
                    to,
                    elapsed,
                };
                None
            }
            Phase::Settling { from, elapsed } => {
                let elapsed = elapsed + dt;
                // Critically damped spring: x(t) = x0 * (1 + wt) * e^(-wt).
                let wt = self.spring_omega * elapsed.as_secs_f32();
                let k = (1.0 + wt) * (-wt).exp();
                self.offset = (from.0 * k, from.1 * k);
                let distance = self.offset.0.hypot(self.offset.1);
                if distance < self.settle_epsilon || elapsed >= self.max_settle_duration {
                    self.offset = (0.0, 0.0);
                    self.phase = Phase::Idle;
                    return Some(AnimationEvent::Settled);
                }
                self.phase = Phase::Settling { from, elapsed };
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.offset = (0.0, 0.0);
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn animator() -> CommitAnimator {
        CommitAnimator::from_config(&EngineConfig::default())
    }

    fn run_to_end(animator: &mut CommitAnimator) -> (Vec<AnimationEvent>, usize) {
        let mut events = Vec::new();
        let mut frames = 0;
        while frames < 1000 {
            frames += 1;
            if let Some(event) = animator.tick(FRAME) {
                events.push(event);
            }
            if animator.is_idle() {
                break;
            }
        }
        // A few extra ticks must not produce a second event.
        for _ in 0..5 {
            if let Some(event) = animator.tick(FRAME) {
                events.push(event);
            }
        }
        (events, frames)
    }

    #[test]
    fn rotation_is_clamped_and_ignores_vertical_offset() {
        assert_eq!(rotation_for(0.0, 400.0, 10.0), 0.0);
        assert_eq!(rotation_for(100.0, 400.0, 10.0), 5.0);
        assert_eq!(rotation_for(-5000.0, 400.0, 10.0), -10.0);

        let mut a = animator();
        a.drag_to(GestureSample::new(0.0, 300.0));
        assert_eq!(a.rotation_deg(), 0.0);
    }

    #[test]
    fn commit_moves_along_direction_then_resets_before_reporting() {
        let mut a = animator();
        a.drag_to(GestureSample::new(130.0, 5.0));
        assert!(a.start_commit(Direction::Yes));

        a.tick(Duration::from_millis(125));
        let (x, _) = a.offset();
        assert!(x > 130.0 && x < 400.0, "midway x={x}");

        let event = a.tick(Duration::from_millis(125));
        assert_eq!(event, Some(AnimationEvent::CommitFinished(Direction::Yes)));
        assert_eq!(a.offset(), (0.0, 0.0));
        assert!(a.is_idle());
    }

    #[test]
    fn commit_reports_exactly_once_in_about_the_commit_duration() {
        let mut a = animator();
        a.start_commit(Direction::DontKnow);
        let (events, frames) = run_to_end(&mut a);
        assert_eq!(events, vec![AnimationEvent::CommitFinished(Direction::DontKnow)]);
        assert_eq!(frames, 16); // ceil(250 / 16)
    }

    #[test]
    fn vertical_commits_leave_on_the_vertical_axis() {
        let mut up = animator();
        up.start_commit(Direction::DontKnow);
        up.tick(Duration::from_millis(200));
        assert!(up.offset().1 < 0.0);
        assert_eq!(up.offset().0, 0.0);

        let mut down = animator();
        down.start_commit(Direction::Trash);
        down.tick(Duration::from_millis(200));
        assert!(down.offset().1 > 0.0);
    }

    #[test]
    fn second_commit_and_drag_are_refused_while_committing() {
        let mut a = animator();
        assert!(a.start_commit(Direction::No));
        assert!(!a.start_commit(Direction::Yes));
        assert!(!a.drag_to(GestureSample::new(10.0, 10.0)));
        assert!(!a.start_cancel());
        let (events, _) = run_to_end(&mut a);
        assert_eq!(events, vec![AnimationEvent::CommitFinished(Direction::No)]);
    }

    #[test]
    fn cancel_springs_back_to_neutral() {
        let mut a = animator();
        a.drag_to(GestureSample::new(80.0, -40.0));
        assert!(a.start_cancel());
        let (events, frames) = run_to_end(&mut a);
        assert_eq!(events, vec![AnimationEvent::Settled]);
        assert!(frames <= 63, "settle is bounded, took {frames} frames");
        assert_eq!(a.transform(), Transform::default());
    }

    #[test]
    fn drag_interrupts_settle() {
        let mut a = animator();
        a.drag_to(GestureSample::new(80.0, 0.0));
        a.start_cancel();
        a.tick(FRAME);
        assert!(a.is_settling());
        assert!(a.drag_to(GestureSample::new(20.0, 0.0)));
        assert!(!a.is_settling());
        assert_eq!(a.tick(FRAME), None);
    }
}
