//! Game simulation modules

pub mod ai;
pub mod combat;
pub mod events;
pub mod level;
pub mod physics;
pub mod powerup;
pub mod round;
pub mod snapshot;
pub mod spawn;
pub mod tank;
pub mod tilemap;

pub use events::{EventSink, GameEvent};
pub use round::{RoundConfig, RoundState};

use physics::Direction;

/// One participant's input for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub shoot: bool,
    pub request_life: bool,
}

impl Intent {
    /// No input: used for idle ticks and lost connections
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn moving(direction: Direction) -> Self {
        let mut intent = Self::default();
        match direction {
            Direction::Up => intent.up = true,
            Direction::Down => intent.down = true,
            Direction::Left => intent.left = true,
            Direction::Right => intent.right = true,
        }
        intent
    }

    #[cfg(test)]
    pub fn with_shoot(mut self) -> Self {
        self.shoot = true;
        self
    }

    /// Requested travel direction; conflicting flags resolve up, down, left, right
    pub fn direction(&self) -> Option<Direction> {
        if self.up {
            Some(Direction::Up)
        } else if self.down {
            Some(Direction::Down)
        } else if self.left {
            Some(Direction::Left)
        } else if self.right {
            Some(Direction::Right)
        } else {
            None
        }
    }

    /// Fold a newer intent over an unconsumed older one. Movement follows the
    /// newer record; edge flags survive so a tap is not lost.
    pub fn coalesce(self, newer: Intent) -> Intent {
        Intent {
            shoot: self.shoot || newer.shoot,
            request_life: self.request_life || newer.request_life,
            ..newer
        }
    }
}
