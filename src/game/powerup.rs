//! Collectible power-ups

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::util::time::secs_to_ticks;

use super::physics::{Aabb, POWERUP_SIZE};
use super::tank::{Tank, MAX_FIRE_RATE_BONUS, MAX_POWER_TIER, MAX_SPEED_MULTIPLIER};

/// Ticks an uncollected power-up stays on the map
pub const POWERUP_LIFETIME: u32 = secs_to_ticks(15);
/// Shield length granted by the helmet pickup
pub const HELMET_SHIELD_TICKS: u32 = secs_to_ticks(10);
/// Length of the base perimeter reinforcement
pub const FORTIFY_TICKS: u32 = secs_to_ticks(20);
/// Length of the freeze applied to the opposing side
pub const FREEZE_TICKS: u32 = secs_to_ticks(8);
/// Speed multiplier gained per speed pickup
pub const SPEED_STEP: f32 = 0.5;
/// Points for collecting any power-up
pub const PICKUP_SCORE: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PowerUpKind {
    /// Temporary shield
    Helmet,
    /// Bullet power tier up
    Star,
    /// Freezes the opposing side
    Timer,
    /// Steel perimeter around the base
    Shovel,
    /// Extra life (extra health for enemies)
    ExtraLife,
    Speed,
    /// Swim capability plus a one-shot hit guard
    Boat,
    /// Tree-clearing shots
    Saw,
    /// Shorter shot cooldown
    RapidFire,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 9] = [
        PowerUpKind::Helmet,
        PowerUpKind::Star,
        PowerUpKind::Timer,
        PowerUpKind::Shovel,
        PowerUpKind::ExtraLife,
        PowerUpKind::Speed,
        PowerUpKind::Boat,
        PowerUpKind::Saw,
        PowerUpKind::RapidFire,
    ];

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl From<PowerUpKind> for u8 {
    fn from(kind: PowerUpKind) -> u8 {
        match kind {
            PowerUpKind::Helmet => 0,
            PowerUpKind::Star => 1,
            PowerUpKind::Timer => 2,
            PowerUpKind::Shovel => 3,
            PowerUpKind::ExtraLife => 4,
            PowerUpKind::Speed => 5,
            PowerUpKind::Boat => 6,
            PowerUpKind::Saw => 7,
            PowerUpKind::RapidFire => 8,
        }
    }
}

impl TryFrom<u8> for PowerUpKind {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        PowerUpKind::ALL
            .get(v as usize)
            .copied()
            .ok_or_else(|| format!("invalid power-up ordinal {v}"))
    }
}

/// What a pickup does beyond the collecting tank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupEffect {
    /// Applied entirely to the collecting tank
    Tank,
    /// Reinforce the base perimeter
    Fortify,
    /// Freeze the side opposing the collector
    FreezeOpponents,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub kind: PowerUpKind,
    pub ttl: u32,
    /// Tank whose hit produced this drop; it cannot collect its own drop
    pub dropped_by: Option<u32>,
}

impl PowerUp {
    pub fn new(id: u32, x: f32, y: f32, kind: PowerUpKind) -> Self {
        Self {
            id,
            x,
            y,
            kind,
            ttl: POWERUP_LIFETIME,
            dropped_by: None,
        }
    }

    pub fn from_tank(mut self, tank_id: u32) -> Self {
        self.dropped_by = Some(tank_id);
        self
    }

    pub fn collectable_by(&self, tank_id: u32) -> bool {
        self.dropped_by != Some(tank_id)
    }

    pub fn bbox(&self) -> Aabb {
        Aabb::new(self.x, self.y, POWERUP_SIZE)
    }

    pub fn expired(&self) -> bool {
        self.ttl == 0
    }

    /// Apply the pickup to a tank; global effects are reported to the caller
    pub fn apply(&self, tank: &mut Tank) -> PickupEffect {
        let mods = &mut tank.mods;
        match self.kind {
            PowerUpKind::Helmet => {
                mods.shield_ticks = mods.shield_ticks.max(HELMET_SHIELD_TICKS);
            }
            PowerUpKind::Star => {
                mods.power_tier = (mods.power_tier + 1).min(MAX_POWER_TIER);
            }
            PowerUpKind::RapidFire => {
                mods.fire_rate_bonus = (mods.fire_rate_bonus + 1).min(MAX_FIRE_RATE_BONUS);
            }
            PowerUpKind::Speed => {
                mods.speed_multiplier = (mods.speed_multiplier + SPEED_STEP).min(MAX_SPEED_MULTIPLIER);
            }
            PowerUpKind::Boat => {
                mods.can_swim = true;
                mods.swim_guard = true;
            }
            PowerUpKind::Saw => {
                mods.cuts_trees = true;
            }
            PowerUpKind::ExtraLife => {
                if tank.player_index().is_some() {
                    tank.grant_life();
                } else {
                    tank.health = tank.health.saturating_add(1);
                }
            }
            PowerUpKind::Shovel => return PickupEffect::Fortify,
            PowerUpKind::Timer => return PickupEffect::FreezeOpponents,
        }
        PickupEffect::Tank
    }
}
