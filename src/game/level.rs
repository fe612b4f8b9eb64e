//! Stage layouts

use std::path::Path;

use super::physics::{Aabb, BASE_SIZE, MAP_COLS, MAP_ROWS, TANK_INSET, TILE_SIZE};
use super::tilemap::{TileKind, TileMap};

const DEFAULT_STAGE: &str = include_str!("../../levels/stage1.txt");

/// Base cell block (row, col) of its top-left cell
pub const BASE_CELL: (usize, usize) = (24, 12);
/// Cell blocks where player tanks (re)spawn
pub const PLAYER_START_CELLS: [(usize, usize); 2] = [(24, 8), (24, 16)];
/// Cell blocks where enemy tanks enter
pub const ENEMY_SPAWN_CELLS: [(usize, usize); 3] = [(0, 0), (0, 12), (0, 24)];

/// Cells ringing the base that reinforcement turns to steel
pub const PERIMETER_CELLS: [(usize, usize); 8] = [
    (23, 11),
    (23, 12),
    (23, 13),
    (23, 14),
    (24, 11),
    (25, 11),
    (24, 14),
    (25, 14),
];

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("Failed to read level file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("Row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unknown tile '{ch}' at row {row}, col {col}")]
    UnknownTile { ch: char, row: usize, col: usize },

    #[error("Reserved cell at row {row}, col {col} must be empty")]
    ReservedCellBlocked { row: usize, col: usize },
}

/// A parsed stage
#[derive(Debug, Clone)]
pub struct Level {
    pub map: TileMap,
}

impl Level {
    /// Parse a layout: `.` empty, `#` brick, `@` steel, `~` water, `%` trees
    pub fn parse(text: &str) -> Result<Self, LevelError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();

        if rows.len() != MAP_ROWS {
            return Err(LevelError::RowCount {
                expected: MAP_ROWS,
                found: rows.len(),
            });
        }

        let mut map = TileMap::empty();
        for (row, line) in rows.iter().enumerate() {
            let width = line.chars().count();
            if width != MAP_COLS {
                return Err(LevelError::RowWidth {
                    row,
                    expected: MAP_COLS,
                    found: width,
                });
            }
            for (col, ch) in line.chars().enumerate() {
                let kind = match ch {
                    '.' => TileKind::Empty,
                    '#' => TileKind::Brick,
                    '@' => TileKind::Steel,
                    '~' => TileKind::Water,
                    '%' => TileKind::Trees,
                    other => return Err(LevelError::UnknownTile { ch: other, row, col }),
                };
                map.put(row, col, kind);
            }
        }

        let reserved = std::iter::once(BASE_CELL)
            .chain(PLAYER_START_CELLS)
            .chain(ENEMY_SPAWN_CELLS);
        for (top, left) in reserved {
            for row in top..top + 2 {
                for col in left..left + 2 {
                    if map.get(row, col) != Some(TileKind::Empty) {
                        return Err(LevelError::ReservedCellBlocked { row, col });
                    }
                }
            }
        }

        Ok(Self { map })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn default_stage() -> Result<Self, LevelError> {
        Self::parse(DEFAULT_STAGE)
    }
}

fn cell_origin((row, col): (usize, usize)) -> (f32, f32) {
    (col as f32 * TILE_SIZE, row as f32 * TILE_SIZE)
}

/// Top-left of the base structure
pub fn base_position() -> (f32, f32) {
    cell_origin(BASE_CELL)
}

pub fn base_bbox() -> Aabb {
    let (x, y) = base_position();
    Aabb::new(x, y, BASE_SIZE)
}

fn tank_slot(cell: (usize, usize)) -> (f32, f32) {
    let (x, y) = cell_origin(cell);
    (x + TANK_INSET, y + TANK_INSET)
}

/// Start position of a player by 1-based index
pub fn player_start(index: u8) -> (f32, f32) {
    let slot = (index.saturating_sub(1) as usize).min(PLAYER_START_CELLS.len() - 1);
    tank_slot(PLAYER_START_CELLS[slot])
}

pub fn enemy_spawn_points() -> Vec<(f32, f32)> {
    ENEMY_SPAWN_CELLS.iter().copied().map(tank_slot).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::TANK_SIZE;

    fn slot_bbox(pos: (f32, f32)) -> Aabb {
        Aabb::new(pos.0, pos.1, TANK_SIZE)
    }

    #[test]
    fn default_stage_parses() {
        let level = Level::default_stage().expect("bundled stage is valid");
        assert_eq!(level.map.get(23, 11), Some(TileKind::Brick));
        assert_eq!(level.map.get(6, 12), Some(TileKind::Steel));
        assert_eq!(level.map.get(14, 4), Some(TileKind::Water));
        assert_eq!(level.map.get(12, 12), Some(TileKind::Trees));
        for pos in enemy_spawn_points() {
            assert!(!level.map.collides(&slot_bbox(pos), false));
        }
        for index in 1..=2 {
            assert!(!level.map.collides(&slot_bbox(player_start(index)), false));
        }
    }

    #[test]
    fn wrong_row_count_rejected() {
        let err = Level::parse("....\n....").unwrap_err();
        assert!(matches!(err, LevelError::RowCount { found: 2, .. }));
    }

    #[test]
    fn unknown_tile_rejected() {
        let mut text = String::new();
        for row in 0..MAP_ROWS {
            let line = if row == 5 { ".".repeat(25) + "X" } else { ".".repeat(26) };
            text.push_str(&line);
            text.push('\n');
        }
        let err = Level::parse(&text).unwrap_err();
        assert!(matches!(err, LevelError::UnknownTile { ch: 'X', row: 5, col: 25 }));
    }

    #[test]
    fn blocked_base_rejected() {
        let mut rows: Vec<String> = (0..MAP_ROWS).map(|_| ".".repeat(MAP_COLS)).collect();
        rows[24].replace_range(12..13, "#");
        let err = Level::parse(&rows.join("\n")).unwrap_err();
        assert!(matches!(err, LevelError::ReservedCellBlocked { row: 24, col: 12 }));
    }

    #[test]
    fn slots_are_inset() {
        assert_eq!(player_start(1), (130.0, 386.0));
        assert_eq!(player_start(2), (258.0, 386.0));
        assert_eq!(base_position(), (192.0, 384.0));
    }
}
