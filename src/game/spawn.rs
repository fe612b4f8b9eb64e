//! Enemy introduction schedule

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::physics::{Aabb, TANK_SIZE};
use super::tank::EnemyVariant;

/// Ticks between introductions
pub const SPAWN_DELAY: u32 = 150;
/// Ticks before the first introduction
pub const FIRST_SPAWN_DELAY: u32 = 30;
/// When this many or fewer remain, only the strongest variant appears
pub const STRONGEST_THRESHOLD: u32 = 2;

const WEIGHTED_VARIANTS: [(EnemyVariant, u32); 4] = [
    (EnemyVariant::Regular, 45),
    (EnemyVariant::Fast, 25),
    (EnemyVariant::Power, 15),
    (EnemyVariant::Armored, 15),
];

/// Director configuration
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub total: u32,
    pub max_on_screen: u32,
    pub spawn_points: Vec<(f32, f32)>,
}

/// A spawn the round should materialize this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnOrder {
    pub position: (f32, f32),
    pub variant: EnemyVariant,
}

#[derive(Debug, Clone)]
pub struct SpawnDirector {
    total: u32,
    max_on_screen: u32,
    spawned: u32,
    countdown: u32,
    spawn_points: Vec<(f32, f32)>,
    rng: ChaCha8Rng,
}

impl SpawnDirector {
    pub fn new(config: SpawnConfig, seed: u64) -> Self {
        Self {
            total: config.total,
            max_on_screen: config.max_on_screen,
            spawned: 0,
            countdown: FIRST_SPAWN_DELAY,
            spawn_points: config.spawn_points,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[cfg(test)]
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.spawned)
    }

    pub fn exhausted(&self) -> bool {
        self.spawned >= self.total
    }

    /// Advance one tick. `active_enemies` is the number of live enemies and
    /// `occupied` the boxes a new tank must not overlap.
    pub fn tick(&mut self, active_enemies: usize, occupied: &[Aabb]) -> Option<SpawnOrder> {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0
            || self.exhausted()
            || active_enemies >= self.max_on_screen as usize
            || self.spawn_points.is_empty()
        {
            return None;
        }

        let position = self.spawn_points[self.rng.gen_range(0..self.spawn_points.len())];
        let candidate = Aabb::new(position.0, position.1, TANK_SIZE);
        if occupied.iter().any(|o| o.overlaps(&candidate)) {
            return None;
        }

        let variant = self.pick_variant();
        self.spawned += 1;
        self.countdown = SPAWN_DELAY;
        Some(SpawnOrder { position, variant })
    }

    fn pick_variant(&mut self) -> EnemyVariant {
        if self.remaining() <= STRONGEST_THRESHOLD {
            return EnemyVariant::Heavy;
        }
        let total_weight: u32 = WEIGHTED_VARIANTS.iter().map(|(_, w)| w).sum();
        let mut roll = self.rng.gen_range(0..total_weight);
        for (variant, weight) in WEIGHTED_VARIANTS {
            if roll < weight {
                return variant;
            }
            roll -= weight;
        }
        EnemyVariant::Regular
    }
}
