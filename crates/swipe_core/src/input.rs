//! Pointer and key input normalized into one commit vocabulary.

use std::str::FromStr;

use shared::domain::Direction;
use thiserror::Error;

use crate::gesture::{GestureSample, GestureTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKey {
    Up,
    Down,
    Left,
    Right,
}

impl ArrowKey {
    pub fn direction(self) -> Direction {
        match self {
            Self::Right => Direction::Yes,
            Self::Left => Direction::No,
            Self::Up => Direction::DontKnow,
            Self::Down => Direction::Trash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not an arrow key: '{0}'")]
pub struct UnknownKey(pub String);

impl FromStr for ArrowKey {
    type Err = UnknownKey;

    /// Accepts DOM-style key names (`ArrowUp`) and bare names (`up`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.strip_prefix("arrow").unwrap_or(lower.as_str()) {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(UnknownKey(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown,
    PointerMove(GestureSample),
    PointerUp,
    Key(ArrowKey),
    /// On-screen answer button; behaves exactly like the matching key.
    Button(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputOutcome {
    /// A commit transition is running; input is locked.
    Rejected,
    /// Nothing to do (e.g. a move with no pointer down).
    Ignored,
    Dragging(GestureSample),
    Commit(Direction),
    Cancel,
}

/// Gate in front of the tracker. Once a commit is produced the adapter stays
/// locked until `unlock` is called from the animation completion.
#[derive(Debug, Clone)]
pub struct InputAdapter {
    tracker: GestureTracker,
    locked: bool,
}

impl InputAdapter {
    pub fn new(threshold: f32) -> Self {
        Self {
            tracker: GestureTracker::new(threshold),
            locked: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn handle(&mut self, event: InputEvent) -> InputOutcome {
        if self.locked {
            return InputOutcome::Rejected;
        }

        match event {
            InputEvent::PointerDown => {
                self.tracker.begin();
                InputOutcome::Dragging(GestureSample::default())
            }
            InputEvent::PointerMove(sample) => {
                if self.tracker.sample(sample) {
                    InputOutcome::Dragging(sample)
                } else {
                    InputOutcome::Ignored
                }
            }
            InputEvent::PointerUp => {
                if !self.tracker.is_active() {
                    return InputOutcome::Ignored;
                }
                match self.tracker.release() {
                    Some(direction) => self.commit(direction),
                    None => InputOutcome::Cancel,
                }
            }
            InputEvent::Key(key) => {
                // A key press mid-drag wins; the drag is abandoned.
                self.tracker.reset();
                self.commit(key.direction())
            }
            InputEvent::Button(direction) => {
                self.tracker.reset();
                self.commit(direction)
            }
        }
    }

    fn commit(&mut self, direction: Direction) -> InputOutcome {
        self.locked = true;
        InputOutcome::Commit(direction)
    }
}
