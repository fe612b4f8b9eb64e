//! Grid geometry, bounding boxes and movement directions

use serde::{Deserialize, Serialize};

/// Side length of one map cell in world units
pub const TILE_SIZE: f32 = 16.0;
/// Map width in cells
pub const MAP_COLS: usize = 26;
/// Map height in cells
pub const MAP_ROWS: usize = 26;
pub const MAP_WIDTH: f32 = TILE_SIZE * MAP_COLS as f32;
pub const MAP_HEIGHT: f32 = TILE_SIZE * MAP_ROWS as f32;

/// Tank hitbox side length
pub const TANK_SIZE: f32 = 28.0;
/// Gap between a resting tank and the 2x2 cell block it occupies
pub const TANK_INSET: f32 = (2.0 * TILE_SIZE - TANK_SIZE) / 2.0;
/// Base structure side length
pub const BASE_SIZE: f32 = 32.0;
/// Projectile hitbox side length
pub const PROJECTILE_SIZE: f32 = 4.0;
/// Power-up pickup box side length
pub const POWERUP_SIZE: f32 = 32.0;

/// Cardinal facing / travel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit vector in screen coordinates (y grows downward)
    pub fn vector(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Right => (1.0, 0.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

impl From<Direction> for u8 {
    fn from(d: Direction) -> u8 {
        match d {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Right),
            2 => Ok(Direction::Down),
            3 => Ok(Direction::Left),
            other => Err(format!("invalid direction ordinal {other}")),
        }
    }
}

/// Axis-aligned bounding box, half-open on both axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + size,
            max_y: y + size,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Smallest box covering both
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// True when the box lies completely inside the map
    pub fn within_map(&self) -> bool {
        self.min_x >= 0.0 && self.min_y >= 0.0 && self.max_x <= MAP_WIDTH && self.max_y <= MAP_HEIGHT
    }
}

/// True if a point lies inside the map
pub fn point_in_map(x: f32, y: f32) -> bool {
    (0.0..MAP_WIDTH).contains(&x) && (0.0..MAP_HEIGHT).contains(&y)
}

/// Snap a tank coordinate onto the resting lattice used by corridors
pub fn snap_to_lattice(v: f32) -> f32 {
    ((v - TANK_INSET) / TILE_SIZE).round() * TILE_SIZE + TANK_INSET
}
