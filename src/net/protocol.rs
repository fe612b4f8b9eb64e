//! Wire types for host / remote replication
//!
//! Every frame is a 4-byte big-endian length followed by a JSON payload.
//! Enumerations travel as integers (wire version 1):
//!
//! | type           | 0       | 1       | 2     | 3      | 4         | 5     | 6    | 7   | 8         |
//! |----------------|---------|---------|-------|--------|-----------|-------|------|-----|-----------|
//! | `Direction`    | up      | right   | down  | left   |           |       |      |     |           |
//! | `TileKind`     | empty   | brick   | steel | water  | trees     |       |      |     |           |
//! | `EnemyVariant` | regular | armored | fast  | power  | heavy     |       |      |     |           |
//! | `PowerUpKind`  | helmet  | star    | timer | shovel | extralife | speed | boat | saw | rapidfire |

use serde::{Deserialize, Serialize};

use crate::game::physics::Direction;
use crate::game::powerup::PowerUpKind;
use crate::game::tank::EnemyVariant;
use crate::game::tilemap::{TileChange, TileKind};
use crate::game::Intent;

/// Bumped whenever a wire type changes shape
pub const PROTOCOL_VERSION: u32 = 1;

/// Messages sent from host to remote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMsg {
    /// Handshake accepted
    Welcome {
        player_index: u8,
        protocol_version: u32,
        tick_rate: u32,
    },

    /// Full world state for one tick
    Snapshot(Snapshot),

    /// Orderly teardown
    Goodbye,
}

/// Messages sent from remote to host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteMsg {
    Hello { protocol_version: u32 },

    Intent(IntentMsg),

    Goodbye,
}

/// One tick of remote input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMsg {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub shoot: bool,
    pub request_life: bool,
}

impl From<Intent> for IntentMsg {
    fn from(i: Intent) -> Self {
        Self {
            up: i.up,
            down: i.down,
            left: i.left,
            right: i.right,
            shoot: i.shoot,
            request_life: i.request_life,
        }
    }
}

impl From<IntentMsg> for Intent {
    fn from(m: IntentMsg) -> Self {
        Self {
            up: m.up,
            down: m.down,
            left: m.left,
            right: m.right,
            shoot: m.shoot,
            request_life: m.request_life,
        }
    }
}

/// Replicated round state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub players: Vec<PlayerRecord>,
    pub enemies: Vec<EnemyRecord>,
    pub projectiles: Vec<ProjectileRecord>,
    pub powerups: Vec<PowerUpRecord>,
    pub game_over: bool,
    pub victory: bool,
    pub remaining_enemies: u32,
    pub connected_players: u8,
    pub base_alive: bool,
    pub fortify_ticks: u32,
    pub enemy_freeze_ticks: u32,
    pub player_freeze_ticks: u32,
    /// Tile mutations since the previous snapshot, in order
    pub tile_changes: Vec<TileChange>,
    /// Complete grid, row-major; present on the first snapshot of a connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_grid: Option<Vec<TileKind>>,
}

impl Snapshot {
    /// Fold a newer snapshot over this unsent one. The newer world state wins;
    /// tile changes accumulate in order and a pending full grid is kept.
    pub fn coalesce(self, newer: Snapshot) -> Snapshot {
        let mut tile_changes = self.tile_changes;
        tile_changes.extend(newer.tile_changes.iter().cloned());
        Snapshot {
            tile_changes,
            full_grid: newer.full_grid.or(self.full_grid),
            ..newer
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub index: u8,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub lives: u8,
    pub alive: bool,
    pub shielded: bool,
    pub shield_ticks: u32,
    pub power_tier: u8,
    pub speed_multiplier: f32,
    pub can_swim: bool,
    pub swim_guard: bool,
    pub cuts_trees: bool,
    pub fire_rate_bonus: u8,
    pub score: u32,
    pub kills: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyRecord {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub alive: bool,
    pub variant: EnemyVariant,
    pub health: u8,
    pub shielded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileRecord {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub from_enemy: bool,
    pub power: u8,
    pub cuts_trees: bool,
    /// Owning player index; 0 for enemy fire
    pub owner: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpRecord {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub kind: PowerUpKind,
    pub ttl: u32,
}
