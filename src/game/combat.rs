//! Projectiles and the side rules for who can hit whom

use serde::{Deserialize, Serialize};

use super::physics::{point_in_map, Aabb, Direction, PROJECTILE_SIZE};

/// Which side fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player(u8),
    Enemy,
}

impl Side {
    pub fn is_enemy(self) -> bool {
        matches!(self, Side::Enemy)
    }

    /// Player shots hit enemies only and enemy shots hit players only
    pub fn can_hit(self, target: Side) -> bool {
        match (self, target) {
            (Side::Player(_), Side::Enemy) => true,
            (Side::Enemy, Side::Player(_)) => true,
            _ => false,
        }
    }
}

/// Monotonic projectile id source owned by the round
#[derive(Debug, Clone)]
pub struct ProjectileIds {
    next: u64,
}

impl ProjectileIds {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for ProjectileIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

/// Active projectile in the round
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: u64,
    pub owner_tank: u32,
    pub side: Side,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub speed: f32,
    pub power: u8,
    pub cuts_trees: bool,
}

impl Projectile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        owner_tank: u32,
        side: Side,
        x: f32,
        y: f32,
        direction: Direction,
        speed: f32,
        power: u8,
        cuts_trees: bool,
    ) -> Self {
        Self {
            id,
            owner_tank,
            side,
            x,
            y,
            direction,
            speed,
            power,
            cuts_trees,
        }
    }

    /// Advance by the fixed per-tick displacement
    pub fn update(&mut self) {
        let (dx, dy) = self.direction.vector();
        self.x += dx * self.speed;
        self.y += dy * self.speed;
    }

    pub fn bbox(&self) -> Aabb {
        Aabb::new(self.x, self.y, PROJECTILE_SIZE)
    }

    /// Area swept during the last `update`, from the previous position to now
    pub fn swept_bbox(&self) -> Aabb {
        let (dx, dy) = self.direction.vector();
        let before = Aabb::new(self.x - dx * self.speed, self.y - dy * self.speed, PROJECTILE_SIZE);
        self.bbox().union(&before)
    }

    /// Point used for tile impacts. Per-tick travel is shorter than a cell,
    /// so the centre visits every cell on the flight path.
    pub fn impact_point(&self) -> (f32, f32) {
        self.bbox().center()
    }

    pub fn out_of_bounds(&self) -> bool {
        let (cx, cy) = self.impact_point();
        !point_in_map(cx, cy)
    }
}

/// Indices of projectiles whose paths this tick overlap another's. Both
/// members of every pair are reported; removal happens after the scan.
/// Paths are swept so fast shots cannot pass through each other.
pub fn mutual_annihilations(projectiles: &[Projectile]) -> Vec<usize> {
    let swept: Vec<Aabb> = projectiles.iter().map(Projectile::swept_bbox).collect();
    let mut doomed = vec![false; projectiles.len()];
    for i in 0..projectiles.len() {
        for j in (i + 1)..projectiles.len() {
            if swept[i].overlaps(&swept[j]) {
                doomed[i] = true;
                doomed[j] = true;
            }
        }
    }
    doomed
        .iter()
        .enumerate()
        .filter_map(|(idx, &d)| d.then_some(idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(id: u64, x: f32, y: f32, direction: Direction, side: Side) -> Projectile {
        Projectile::new(id, 0, side, x, y, direction, 4.0, 1, false)
    }

    #[test]
    fn side_filtering() {
        assert!(Side::Player(1).can_hit(Side::Enemy));
        assert!(Side::Enemy.can_hit(Side::Player(2)));
        assert!(!Side::Player(1).can_hit(Side::Player(2)));
        assert!(!Side::Enemy.can_hit(Side::Enemy));
    }

    #[test]
    fn ids_increase() {
        let mut ids = ProjectileIds::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);
    }

    #[test]
    fn overlapping_pair_both_removed() {
        let list = vec![
            shot(1, 100.0, 100.0, Direction::Down, Side::Enemy),
            shot(2, 300.0, 300.0, Direction::Up, Side::Player(1)),
            shot(3, 101.0, 102.0, Direction::Up, Side::Player(1)),
        ];
        assert_eq!(mutual_annihilations(&list), vec![0, 2]);
    }

    #[test]
    fn three_way_overlap_removes_all() {
        let list = vec![
            shot(1, 100.0, 100.0, Direction::Down, Side::Enemy),
            shot(2, 101.0, 100.0, Direction::Up, Side::Player(1)),
            shot(3, 102.0, 100.0, Direction::Left, Side::Player(2)),
        ];
        assert_eq!(mutual_annihilations(&list), vec![0, 1, 2]);
    }

    #[test]
    fn head_on_shots_that_crossed_within_a_tick_clash() {
        // Already advanced: each moved 6 px and they swapped places
        let mut down = shot(1, 100.0, 106.0, Direction::Down, Side::Enemy);
        let mut up = shot(2, 100.0, 100.0, Direction::Up, Side::Player(1));
        down.speed = 6.0;
        up.speed = 6.0;
        assert!(!down.bbox().overlaps(&up.bbox()));
        assert_eq!(mutual_annihilations(&[down, up]), vec![0, 1]);
    }

    #[test]
    fn parallel_shots_apart_do_not_clash() {
        let list = vec![
            shot(1, 100.0, 100.0, Direction::Up, Side::Enemy),
            shot(2, 120.0, 100.0, Direction::Down, Side::Player(1)),
        ];
        assert!(mutual_annihilations(&list).is_empty());
    }

    #[test]
    fn update_moves_along_direction() {
        let mut p = shot(1, 10.0, 10.0, Direction::Left, Side::Enemy);
        p.update();
        assert_eq!((p.x, p.y), (6.0, 10.0));
    }
}
