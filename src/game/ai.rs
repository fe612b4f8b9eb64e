//! Enemy tank steering and firing

use rand::Rng;

use super::physics::Direction;

/// Base ticks between steering decisions
pub const STEER_INTERVAL: u32 = 60;
/// Max random extra ticks added to each steering interval
pub const STEER_JITTER: u32 = 60;
/// Chance a steering decision heads for the base instead of wandering
pub const TOWARD_BASE_CHANCE: f64 = 0.6;
pub const FIRE_INTERVAL: u32 = 45;
pub const FIRE_JITTER: u32 = 45;
/// Ticks without displacement before the tank counts as stuck
pub const STUCK_THRESHOLD: u32 = 20;
/// Commitment window after an escape turn
pub const ESCAPE_COMMIT: u32 = 90;

/// Per-enemy controller state
#[derive(Debug, Clone, PartialEq)]
pub struct AiState {
    pub heading: Direction,
    steer_timer: u32,
    fire_timer: u32,
    stuck_ticks: u32,
    last_pos: Option<(f32, f32)>,
}

/// What an enemy wants to do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AiDecision {
    pub direction: Direction,
    pub fire: bool,
}

impl AiState {
    pub fn new(first_fire_delay: u32) -> Self {
        Self {
            heading: Direction::Down,
            steer_timer: STEER_INTERVAL,
            fire_timer: first_fire_delay.max(1),
            stuck_ticks: 0,
            last_pos: None,
        }
    }

    /// Advance the controller by one tick
    pub fn think<R: Rng>(
        &mut self,
        position: (f32, f32),
        target: (f32, f32),
        rng: &mut R,
    ) -> AiDecision {
        if self.last_pos == Some(position) {
            self.stuck_ticks += 1;
        } else {
            self.stuck_ticks = 0;
            self.last_pos = Some(position);
        }

        if self.stuck_ticks > STUCK_THRESHOLD {
            self.heading = random_other_direction(self.heading, rng);
            self.steer_timer = ESCAPE_COMMIT;
            self.stuck_ticks = 0;
        } else {
            self.steer_timer = self.steer_timer.saturating_sub(1);
            if self.steer_timer == 0 {
                self.heading = if rng.gen_bool(TOWARD_BASE_CHANCE) {
                    toward(position, target)
                } else {
                    Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
                };
                self.steer_timer = STEER_INTERVAL + rng.gen_range(0..=STEER_JITTER);
            }
        }

        self.fire_timer = self.fire_timer.saturating_sub(1);
        let fire = self.fire_timer == 0;
        if fire {
            self.fire_timer = FIRE_INTERVAL + rng.gen_range(0..=FIRE_JITTER);
        }

        AiDecision {
            direction: self.heading,
            fire,
        }
    }
}

/// Direction along the dominant axis from `from` to `to`
pub fn toward(from: (f32, f32), to: (f32, f32)) -> Direction {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    if dy.abs() >= dx.abs() {
        if dy >= 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    } else if dx > 0.0 {
        Direction::Right
    } else {
        Direction::Left
    }
}

fn random_other_direction<R: Rng>(current: Direction, rng: &mut R) -> Direction {
    let others: Vec<Direction> = Direction::ALL
        .iter()
        .copied()
        .filter(|d| *d != current)
        .collect();
    others[rng.gen_range(0..others.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn toward_picks_dominant_axis() {
        assert_eq!(toward((0.0, 0.0), (10.0, 100.0)), Direction::Down);
        assert_eq!(toward((0.0, 0.0), (-100.0, 10.0)), Direction::Left);
        assert_eq!(toward((50.0, 50.0), (50.0, 0.0)), Direction::Up);
    }

    #[test]
    fn stuck_tank_escapes_with_new_heading() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ai = AiState::new(1000);
        let before = ai.heading;
        let mut changed_at = None;
        for tick in 0..=STUCK_THRESHOLD + 1 {
            ai.think((10.0, 10.0), (200.0, 400.0), &mut rng);
            if ai.heading != before && changed_at.is_none() {
                changed_at = Some(tick);
            }
        }
        assert_eq!(changed_at, Some(STUCK_THRESHOLD + 1));
        assert_eq!(ai.steer_timer, ESCAPE_COMMIT);
    }

    #[test]
    fn fires_periodically() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ai = AiState::new(5);
        let mut shots = 0;
        for tick in 0..600u32 {
            let pos = (tick as f32, 0.0);
            if ai.think(pos, (200.0, 400.0), &mut rng).fire {
                shots += 1;
            }
        }
        let max_gap = FIRE_INTERVAL + FIRE_JITTER;
        assert!(shots >= 600 / max_gap as usize);
        assert!(shots <= 600 / FIRE_INTERVAL as usize + 1);
    }

    #[test]
    fn same_seed_same_decisions() {
        let mut a = AiState::new(10);
        let mut b = AiState::new(10);
        let mut ra = ChaCha8Rng::seed_from_u64(99);
        let mut rb = ChaCha8Rng::seed_from_u64(99);
        for tick in 0..500u32 {
            let pos = ((tick / 3) as f32, 4.0);
            assert_eq!(
                a.think(pos, (200.0, 400.0), &mut ra),
                b.think(pos, (200.0, 400.0), &mut rb)
            );
        }
    }
}
