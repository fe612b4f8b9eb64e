//! Destructible tile grid

use serde::{Deserialize, Serialize};

use super::physics::{Aabb, MAP_COLS, MAP_ROWS, TILE_SIZE};

/// Kind of a single map cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TileKind {
    #[default]
    Empty,
    Brick,
    Steel,
    Water,
    Trees,
}

impl TileKind {
    /// Blocks tank movement regardless of capabilities
    pub fn is_solid(self) -> bool {
        matches!(self, TileKind::Brick | TileKind::Steel)
    }
}

impl From<TileKind> for u8 {
    fn from(kind: TileKind) -> u8 {
        match kind {
            TileKind::Empty => 0,
            TileKind::Brick => 1,
            TileKind::Steel => 2,
            TileKind::Water => 3,
            TileKind::Trees => 4,
        }
    }
}

impl TryFrom<u8> for TileKind {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(TileKind::Empty),
            1 => Ok(TileKind::Brick),
            2 => Ok(TileKind::Steel),
            3 => Ok(TileKind::Water),
            4 => Ok(TileKind::Trees),
            other => Err(format!("invalid tile ordinal {other}")),
        }
    }
}

/// Outcome of a projectile striking a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileEffect {
    None,
    BrickDestroyed,
    SteelDestroyed,
    SteelBlocked,
    /// Trees cleared by a tree-cutting shot; the shot keeps flying
    TreesCleared,
}

impl TileEffect {
    /// Whether the projectile is consumed by the impact
    pub fn stops_projectile(self) -> bool {
        matches!(
            self,
            TileEffect::BrickDestroyed | TileEffect::SteelDestroyed | TileEffect::SteelBlocked
        )
    }

    pub fn is_destructive(self) -> bool {
        matches!(
            self,
            TileEffect::BrickDestroyed | TileEffect::SteelDestroyed | TileEffect::TreesCleared
        )
    }
}

/// One logged mutation of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileChange {
    pub row: u16,
    pub col: u16,
    pub kind: TileKind,
}

/// Fixed-size grid with an ordered mutation log
#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    cells: Vec<TileKind>,
    changes: Vec<TileChange>,
}

impl TileMap {
    pub fn empty() -> Self {
        Self {
            cells: vec![TileKind::Empty; MAP_COLS * MAP_ROWS],
            changes: Vec::new(),
        }
    }

    /// Rebuild a grid from a row-major dump; `None` when the length is wrong
    pub fn from_cells(cells: Vec<TileKind>) -> Option<Self> {
        if cells.len() != MAP_COLS * MAP_ROWS {
            return None;
        }
        Some(Self {
            cells,
            changes: Vec::new(),
        })
    }

    /// Row-major copy of every cell
    pub fn cells(&self) -> &[TileKind] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Option<TileKind> {
        if row < MAP_ROWS && col < MAP_COLS {
            Some(self.cells[row * MAP_COLS + col])
        } else {
            None
        }
    }

    /// Set a cell without logging; used while building a level
    pub fn put(&mut self, row: usize, col: usize, kind: TileKind) {
        if row < MAP_ROWS && col < MAP_COLS {
            self.cells[row * MAP_COLS + col] = kind;
        }
    }

    /// Set a cell and record the mutation for replication
    pub fn set(&mut self, row: usize, col: usize, kind: TileKind) {
        if row >= MAP_ROWS || col >= MAP_COLS {
            return;
        }
        let idx = row * MAP_COLS + col;
        if self.cells[idx] == kind {
            return;
        }
        self.cells[idx] = kind;
        self.changes.push(TileChange {
            row: row as u16,
            col: col as u16,
            kind,
        });
    }

    /// Apply a replicated change on the remote replica
    pub fn apply_change(&mut self, change: &TileChange) {
        self.put(change.row as usize, change.col as usize, change.kind);
    }

    /// True if the box overlaps a blocking cell or leaves the grid
    pub fn collides(&self, bbox: &Aabb, can_swim: bool) -> bool {
        if !bbox.within_map() {
            return true;
        }

        let col_start = (bbox.min_x / TILE_SIZE).floor() as usize;
        let row_start = (bbox.min_y / TILE_SIZE).floor() as usize;
        // Half-open: a box ending exactly on a cell edge does not touch the next cell
        let col_end = ((bbox.max_x / TILE_SIZE).ceil() as usize).min(MAP_COLS);
        let row_end = ((bbox.max_y / TILE_SIZE).ceil() as usize).min(MAP_ROWS);

        for row in row_start..row_end {
            for col in col_start..col_end {
                let kind = self.cells[row * MAP_COLS + col];
                if kind.is_solid() || (kind == TileKind::Water && !can_swim) {
                    return true;
                }
            }
        }
        false
    }

    /// Resolve a projectile impact at a point; trees only fall to a saw shot
    pub fn impact(&mut self, point: (f32, f32), power: u8, cuts_trees: bool) -> TileEffect {
        let (x, y) = point;
        if x < 0.0 || y < 0.0 {
            return TileEffect::None;
        }
        let col = (x / TILE_SIZE) as usize;
        let row = (y / TILE_SIZE) as usize;

        match self.get(row, col) {
            Some(TileKind::Brick) => {
                self.set(row, col, TileKind::Empty);
                TileEffect::BrickDestroyed
            }
            Some(TileKind::Steel) if power >= 2 => {
                self.set(row, col, TileKind::Empty);
                TileEffect::SteelDestroyed
            }
            Some(TileKind::Steel) => TileEffect::SteelBlocked,
            Some(TileKind::Trees) if cuts_trees => {
                self.set(row, col, TileKind::Empty);
                TileEffect::TreesCleared
            }
            _ => TileEffect::None,
        }
    }

    /// Hand the change log to replication, leaving it empty
    pub fn drain_changes(&mut self) -> Vec<TileChange> {
        std::mem::take(&mut self.changes)
    }

    #[cfg(test)]
    pub fn pending_changes(&self) -> &[TileChange] {
        &self.changes
    }
}

impl Default for TileMap {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centre(row: usize, col: usize) -> (f32, f32) {
        (
            col as f32 * TILE_SIZE + TILE_SIZE / 2.0,
            row as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        )
    }

    #[test]
    fn brick_always_breaks() {
        let mut map = TileMap::empty();
        for power in 1..=3 {
            map.put(3, 4, TileKind::Brick);
            assert_eq!(map.impact(centre(3, 4), power, false), TileEffect::BrickDestroyed);
            assert_eq!(map.get(3, 4), Some(TileKind::Empty));
        }
    }

    #[test]
    fn steel_needs_power_two() {
        let mut map = TileMap::empty();
        map.put(5, 5, TileKind::Steel);

        assert_eq!(map.impact(centre(5, 5), 1, false), TileEffect::SteelBlocked);
        assert_eq!(map.get(5, 5), Some(TileKind::Steel));
        assert!(map.pending_changes().is_empty());

        assert_eq!(map.impact(centre(5, 5), 2, false), TileEffect::SteelDestroyed);
        assert_eq!(map.get(5, 5), Some(TileKind::Empty));
    }

    #[test]
    fn destructive_impacts_are_logged_once() {
        let mut map = TileMap::empty();
        map.put(0, 0, TileKind::Brick);
        map.put(0, 1, TileKind::Steel);
        map.impact(centre(0, 0), 1, false);
        map.impact(centre(0, 1), 3, false);

        let changes = map.drain_changes();
        assert_eq!(
            changes,
            vec![
                TileChange { row: 0, col: 0, kind: TileKind::Empty },
                TileChange { row: 0, col: 1, kind: TileKind::Empty },
            ]
        );
        assert!(map.drain_changes().is_empty());
    }

    #[test]
    fn trees_only_fall_to_saw_shots() {
        let mut map = TileMap::empty();
        map.put(2, 2, TileKind::Trees);
        assert_eq!(map.impact(centre(2, 2), 3, false), TileEffect::None);
        assert_eq!(
            map.impact(centre(2, 2), 1, true),
            TileEffect::TreesCleared
        );
        assert!(!TileEffect::TreesCleared.stops_projectile());
    }

    #[test]
    fn water_blocks_only_non_swimmers() {
        let mut map = TileMap::empty();
        map.put(1, 1, TileKind::Water);
        let bbox = Aabb::new(10.0, 10.0, 10.0);
        assert!(map.collides(&bbox, false));
        assert!(!map.collides(&bbox, true));
    }

    #[test]
    fn box_on_cell_edge_does_not_touch_neighbour() {
        let mut map = TileMap::empty();
        map.put(0, 2, TileKind::Brick);
        assert!(!map.collides(&Aabb::new(0.0, 0.0, 32.0), false));
        assert!(map.collides(&Aabb::new(0.5, 0.0, 32.0), false));
    }

    #[test]
    fn out_of_bounds_always_collides() {
        let map = TileMap::empty();
        assert!(map.collides(&Aabb::new(-1.0, 0.0, 8.0), true));
    }
}
