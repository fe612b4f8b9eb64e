//! Tank state, lifecycle and the move / shoot / damage rules

use serde::{Deserialize, Serialize};

use crate::util::time::secs_to_ticks;

use super::ai::AiState;
use super::combat::{Projectile, ProjectileIds, Side};
use super::physics::{snap_to_lattice, Aabb, Direction, PROJECTILE_SIZE, TANK_SIZE};
use super::tilemap::TileMap;

/// Hard cap on per-tick displacement after multipliers
pub const MAX_TANK_SPEED: f32 = 3.0;
/// Speed multiplier cap from stacked speed power-ups
pub const MAX_SPEED_MULTIPLIER: f32 = 2.0;
pub const MAX_POWER_TIER: u8 = 3;
pub const MAX_FIRE_RATE_BONUS: u8 = 3;

/// Ticks between shots with no fire-rate bonus
pub const BASE_COOLDOWN: u32 = 30;
/// Floor on the shot cooldown
pub const MIN_COOLDOWN: u32 = 10;
/// Cooldown reduction per fire-rate bonus level
pub const COOLDOWN_STEP: u32 = 6;

/// Shield granted on spawn and respawn
pub const SPAWN_SHIELD_TICKS: u32 = secs_to_ticks(3);

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum EnemyVariant {
    Regular,
    Armored,
    Fast,
    Power,
    Heavy,
}

impl EnemyVariant {
    /// Variant that drops a power-up each time it survives a hit
    pub fn carries_powerups(self) -> bool {
        self == EnemyVariant::Armored
    }

    /// Points awarded to the player that destroys it
    pub fn score(self) -> u32 {
        match self {
            EnemyVariant::Regular => 100,
            EnemyVariant::Fast => 200,
            EnemyVariant::Power => 300,
            EnemyVariant::Armored => 400,
            EnemyVariant::Heavy => 500,
        }
    }
}

impl From<EnemyVariant> for u8 {
    fn from(v: EnemyVariant) -> u8 {
        match v {
            EnemyVariant::Regular => 0,
            EnemyVariant::Armored => 1,
            EnemyVariant::Fast => 2,
            EnemyVariant::Power => 3,
            EnemyVariant::Heavy => 4,
        }
    }
}

impl TryFrom<u8> for EnemyVariant {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(EnemyVariant::Regular),
            1 => Ok(EnemyVariant::Armored),
            2 => Ok(EnemyVariant::Fast),
            3 => Ok(EnemyVariant::Power),
            4 => Ok(EnemyVariant::Heavy),
            other => Err(format!("invalid enemy variant ordinal {other}")),
        }
    }
}

/// Who controls a tank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankRole {
    Player(u8),
    Enemy(EnemyVariant),
}

impl TankRole {
    pub fn side(self) -> Side {
        match self {
            TankRole::Player(index) => Side::Player(index),
            TankRole::Enemy(_) => Side::Enemy,
        }
    }
}

/// Tank stats per role
#[derive(Debug, Clone, Copy)]
pub struct TankStats {
    /// Displacement per tick before multipliers
    pub base_speed: f32,
    pub max_health: u8,
    /// Projectile displacement per tick
    pub shot_speed: f32,
}

impl TankStats {
    pub fn for_role(role: TankRole) -> Self {
        match role {
            TankRole::Player(_) => Self {
                base_speed: 1.5,
                max_health: 1,
                shot_speed: 4.0,
            },
            TankRole::Enemy(EnemyVariant::Regular) => Self {
                base_speed: 1.0,
                max_health: 1,
                shot_speed: 4.0,
            },
            TankRole::Enemy(EnemyVariant::Fast) => Self {
                base_speed: 2.0,
                max_health: 1,
                shot_speed: 4.0,
            },
            TankRole::Enemy(EnemyVariant::Power) => Self {
                base_speed: 1.0,
                max_health: 1,
                shot_speed: 6.0,
            },
            TankRole::Enemy(EnemyVariant::Armored) => Self {
                base_speed: 1.0,
                max_health: 3,
                shot_speed: 4.0,
            },
            TankRole::Enemy(EnemyVariant::Heavy) => Self {
                base_speed: 0.75,
                max_health: 4,
                shot_speed: 4.0,
            },
        }
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    AwaitingRespawn,
    Eliminated,
}

/// Active modifiers granted by power-ups
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifiers {
    pub shield_ticks: u32,
    pub speed_multiplier: f32,
    pub power_tier: u8,
    pub can_swim: bool,
    /// One-shot hit absorption that comes with the swim upgrade
    pub swim_guard: bool,
    pub cuts_trees: bool,
    pub fire_rate_bonus: u8,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            shield_ticks: 0,
            speed_multiplier: 1.0,
            power_tier: 1,
            can_swim: false,
            swim_guard: false,
            cuts_trees: false,
            fire_rate_bonus: 0,
        }
    }
}

/// Result of a hit on a tank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Shield or swim guard absorbed the hit
    Blocked,
    /// Health dropped but the tank survives
    Damaged { drop_powerup: bool },
    /// Health reached zero; the death transition has been applied
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct Tank {
    pub id: u32,
    pub role: TankRole,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub health: u8,
    pub lives: u8,
    pub state: LifeState,
    pub mods: Modifiers,
    pub cooldown: u32,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub ai: Option<AiState>,
}

impl Tank {
    pub fn new_player(id: u32, index: u8, lives: u8, spawn: (f32, f32)) -> Self {
        let role = TankRole::Player(index);
        let stats = TankStats::for_role(role);
        Self {
            id,
            role,
            x: spawn.0,
            y: spawn.1,
            direction: Direction::Up,
            health: stats.max_health,
            lives,
            state: LifeState::Alive,
            mods: Modifiers {
                shield_ticks: SPAWN_SHIELD_TICKS,
                ..Modifiers::default()
            },
            cooldown: 0,
            spawn_x: spawn.0,
            spawn_y: spawn.1,
            ai: None,
        }
    }

    pub fn new_enemy(id: u32, variant: EnemyVariant, spawn: (f32, f32), ai: AiState) -> Self {
        let role = TankRole::Enemy(variant);
        let stats = TankStats::for_role(role);
        Self {
            id,
            role,
            x: spawn.0,
            y: spawn.1,
            direction: Direction::Down,
            health: stats.max_health,
            lives: 1,
            state: LifeState::Alive,
            mods: Modifiers {
                shield_ticks: SPAWN_SHIELD_TICKS / 3,
                ..Modifiers::default()
            },
            cooldown: 0,
            spawn_x: spawn.0,
            spawn_y: spawn.1,
            ai: Some(ai),
        }
    }

    pub fn stats(&self) -> TankStats {
        TankStats::for_role(self.role)
    }

    pub fn player_index(&self) -> Option<u8> {
        match self.role {
            TankRole::Player(index) => Some(index),
            TankRole::Enemy(_) => None,
        }
    }

    pub fn variant(&self) -> Option<EnemyVariant> {
        match self.role {
            TankRole::Enemy(v) => Some(v),
            TankRole::Player(_) => None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == LifeState::Alive
    }

    pub fn is_eliminated(&self) -> bool {
        self.state == LifeState::Eliminated
    }

    pub fn shielded(&self) -> bool {
        self.mods.shield_ticks > 0
    }

    pub fn bbox(&self) -> Aabb {
        Aabb::new(self.x, self.y, TANK_SIZE)
    }

    pub fn effective_speed(&self) -> f32 {
        (self.stats().base_speed * self.mods.speed_multiplier).min(MAX_TANK_SPEED)
    }

    /// Shot cooldown after firing, given the current fire-rate bonus
    pub fn fire_cooldown(&self) -> u32 {
        BASE_COOLDOWN
            .saturating_sub(self.mods.fire_rate_bonus as u32 * COOLDOWN_STEP)
            .max(MIN_COOLDOWN)
    }

    /// Count down per-tank timers
    pub fn tick_timers(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
        self.mods.shield_ticks = self.mods.shield_ticks.saturating_sub(1);
    }

    /// Face a new direction, lining the tank up with the cell lattice when
    /// the turn changes axis and the aligned position is free
    pub fn turn(&mut self, direction: Direction, map: &TileMap, obstacles: &[Aabb]) {
        if direction == self.direction {
            return;
        }
        if direction.is_horizontal() != self.direction.is_horizontal() {
            let (sx, sy) = if direction.is_horizontal() {
                (self.x, snap_to_lattice(self.y))
            } else {
                (snap_to_lattice(self.x), self.y)
            };
            let snapped = Aabb::new(sx, sy, TANK_SIZE);
            if !map.collides(&snapped, self.mods.can_swim)
                && !obstacles.iter().any(|o| o.overlaps(&snapped))
            {
                self.x = sx;
                self.y = sy;
            }
        }
        self.direction = direction;
    }

    /// Attempt one tick of movement; returns false and leaves state untouched
    /// when the candidate box is blocked
    pub fn try_move(&mut self, direction: Direction, map: &TileMap, obstacles: &[Aabb]) -> bool {
        let speed = self.effective_speed();
        let (dx, dy) = direction.vector();
        let candidate = Aabb::new(self.x + dx * speed, self.y + dy * speed, TANK_SIZE);

        if !candidate.within_map()
            || map.collides(&candidate, self.mods.can_swim)
            || obstacles.iter().any(|o| o.overlaps(&candidate))
        {
            return false;
        }

        self.x = candidate.min_x;
        self.y = candidate.min_y;
        true
    }

    /// Fire if the cooldown allows it
    pub fn shoot(&mut self, ids: &mut ProjectileIds) -> Option<Projectile> {
        if self.cooldown > 0 || !self.is_alive() {
            return None;
        }

        let half = TANK_SIZE / 2.0;
        let p_half = PROJECTILE_SIZE / 2.0;
        let (x, y) = match self.direction {
            Direction::Up => (self.x + half - p_half, self.y - PROJECTILE_SIZE),
            Direction::Down => (self.x + half - p_half, self.y + TANK_SIZE),
            Direction::Left => (self.x - PROJECTILE_SIZE, self.y + half - p_half),
            Direction::Right => (self.x + TANK_SIZE, self.y + half - p_half),
        };

        let power = self.mods.power_tier;
        let speed = if power >= 2 {
            self.stats().shot_speed.max(6.0)
        } else {
            self.stats().shot_speed
        };

        self.cooldown = self.fire_cooldown();
        Some(Projectile::new(
            ids.next_id(),
            self.id,
            self.role.side(),
            x,
            y,
            self.direction,
            speed,
            power,
            self.mods.cuts_trees,
        ))
    }

    /// Apply one projectile hit
    pub fn damage(&mut self) -> DamageOutcome {
        if !self.is_alive() || self.shielded() {
            return DamageOutcome::Blocked;
        }
        if self.mods.swim_guard {
            self.mods.swim_guard = false;
            return DamageOutcome::Blocked;
        }

        self.health = self.health.saturating_sub(1);
        if self.health > 0 {
            let drop_powerup = self.variant().is_some_and(EnemyVariant::carries_powerups);
            return DamageOutcome::Damaged { drop_powerup };
        }

        self.die();
        DamageOutcome::Destroyed
    }

    /// Death transition: consume a life and pick the follow-up state
    fn die(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.state = if self.lives > 0 {
            LifeState::AwaitingRespawn
        } else {
            LifeState::Eliminated
        };
        self.cooldown = 0;
        self.mods = Modifiers::default();
    }

    /// Bring a tank awaiting respawn back at its start position
    pub fn respawn(&mut self) -> bool {
        if self.state != LifeState::AwaitingRespawn {
            return false;
        }
        self.x = self.spawn_x;
        self.y = self.spawn_y;
        self.direction = Direction::Up;
        self.health = self.stats().max_health;
        self.state = LifeState::Alive;
        self.mods.shield_ticks = SPAWN_SHIELD_TICKS;
        self.cooldown = 0;
        true
    }

    /// Grant an extra life, reviving an eliminated tank into the respawn queue
    pub fn grant_life(&mut self) {
        self.lives = self.lives.saturating_add(1);
        if self.state == LifeState::Eliminated {
            self.state = LifeState::AwaitingRespawn;
        }
    }
}
