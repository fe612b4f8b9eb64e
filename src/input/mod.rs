//! Raw key state to per-tick intents

pub mod source;

pub use source::{IdleInput, InputSource};
#[cfg(test)]
pub use source::ScriptedInput;

use crate::game::physics::Direction;
use crate::game::Intent;

/// Key state as reported by the keyboard collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub fire: bool,
    pub request_life: bool,
}

impl RawInput {
    #[cfg(test)]
    pub fn holding(direction: Direction) -> Self {
        let mut raw = Self::default();
        match direction {
            Direction::Up => raw.up = true,
            Direction::Down => raw.down = true,
            Direction::Left => raw.left = true,
            Direction::Right => raw.right = true,
        }
        raw
    }

    pub fn held(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

/// Turns successive key states into one intent per sampling tick
#[derive(Debug, Default)]
pub struct IntentSampler {
    /// Held directions, oldest press first
    pressed: Vec<Direction>,
    life_held: bool,
}

impl IntentSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, raw: RawInput) -> Intent {
        self.pressed.retain(|d| raw.held(*d));
        for direction in Direction::ALL {
            if raw.held(direction) && !self.pressed.contains(&direction) {
                self.pressed.push(direction);
            }
        }

        let mut intent = match self.pressed.last() {
            Some(&direction) => Intent::moving(direction),
            None => Intent::idle(),
        };
        intent.shoot = raw.fire;
        intent.request_life = raw.request_life && !self.life_held;
        self.life_held = raw.request_life;
        intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_press_wins() {
        let mut sampler = IntentSampler::new();
        assert_eq!(
            sampler.sample(RawInput::holding(Direction::Left)).direction(),
            Some(Direction::Left)
        );

        let both = RawInput {
            left: true,
            up: true,
            ..RawInput::default()
        };
        assert_eq!(sampler.sample(both).direction(), Some(Direction::Up));

        // Releasing the newer key falls back to the one still held
        assert_eq!(
            sampler.sample(RawInput::holding(Direction::Left)).direction(),
            Some(Direction::Left)
        );
        assert_eq!(sampler.sample(RawInput::default()), Intent::idle());
    }

    #[test]
    fn only_one_direction_flag_is_sent() {
        let mut sampler = IntentSampler::new();
        let all = RawInput {
            up: true,
            down: true,
            left: true,
            right: true,
            ..RawInput::default()
        };
        let intent = sampler.sample(all);
        let set = [intent.up, intent.down, intent.left, intent.right]
            .iter()
            .filter(|f| **f)
            .count();
        assert_eq!(set, 1);
    }

    #[test]
    fn fire_is_level_and_life_is_edge_triggered() {
        let mut sampler = IntentSampler::new();
        let raw = RawInput {
            fire: true,
            request_life: true,
            ..RawInput::default()
        };
        let first = sampler.sample(raw);
        let second = sampler.sample(raw);
        assert!(first.shoot && second.shoot);
        assert!(first.request_life);
        assert!(!second.request_life);

        sampler.sample(RawInput::default());
        assert!(sampler.sample(raw).request_life);
    }
}
