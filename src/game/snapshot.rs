//! Snapshot building for replication

use crate::net::protocol::{EnemyRecord, PlayerRecord, PowerUpRecord, ProjectileRecord, Snapshot};

use super::combat::Side;
use super::round::RoundState;

/// Builds one snapshot per tick from the round state
pub struct SnapshotBuilder {
    /// Attach the full tile grid to the next snapshot
    resync: bool,
}

impl SnapshotBuilder {
    /// A fresh builder sends the full grid first
    pub fn new() -> Self {
        Self { resync: true }
    }

    pub fn build(&mut self, round: &RoundState) -> Snapshot {
        let players = round
            .players
            .iter()
            .map(|slot| {
                let t = &slot.tank;
                PlayerRecord {
                    index: t.player_index().unwrap_or_default(),
                    x: t.x,
                    y: t.y,
                    direction: t.direction,
                    lives: t.lives,
                    alive: t.is_alive(),
                    shielded: t.shielded(),
                    shield_ticks: t.mods.shield_ticks,
                    power_tier: t.mods.power_tier,
                    speed_multiplier: t.mods.speed_multiplier,
                    can_swim: t.mods.can_swim,
                    swim_guard: t.mods.swim_guard,
                    cuts_trees: t.mods.cuts_trees,
                    fire_rate_bonus: t.mods.fire_rate_bonus,
                    score: slot.score,
                    kills: slot.kills,
                }
            })
            .collect();

        let enemies = round
            .enemies
            .iter()
            .filter_map(|t| {
                Some(EnemyRecord {
                    id: t.id,
                    x: t.x,
                    y: t.y,
                    direction: t.direction,
                    alive: t.is_alive(),
                    variant: t.variant()?,
                    health: t.health,
                    shielded: t.shielded(),
                })
            })
            .collect();

        let projectiles = round
            .projectiles
            .iter()
            .map(|p| ProjectileRecord {
                id: p.id,
                x: p.x,
                y: p.y,
                direction: p.direction,
                from_enemy: p.side.is_enemy(),
                power: p.power,
                cuts_trees: p.cuts_trees,
                owner: match p.side {
                    Side::Player(index) => index,
                    Side::Enemy => 0,
                },
            })
            .collect();

        let powerups = round
            .powerups
            .iter()
            .map(|p| PowerUpRecord {
                id: p.id,
                x: p.x,
                y: p.y,
                kind: p.kind,
                ttl: p.ttl,
            })
            .collect();

        let full_grid = std::mem::take(&mut self.resync).then(|| round.map.cells().to_vec());

        Snapshot {
            tick: round.tick,
            players,
            enemies,
            projectiles,
            powerups,
            game_over: round.game_over,
            victory: round.victory,
            remaining_enemies: round.remaining_enemies(),
            connected_players: round.connected_players,
            base_alive: round.base.alive,
            fortify_ticks: round.fortify_ticks,
            enemy_freeze_ticks: round.enemy_freeze_ticks,
            player_freeze_ticks: round.player_freeze_ticks,
            tile_changes: round.tile_changes().to_vec(),
            full_grid,
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Outbound snapshot stats for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_entities_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, snapshot: &Snapshot, bytes: usize) {
        let entities = snapshot.players.len()
            + snapshot.enemies.len()
            + snapshot.projectiles.len()
            + snapshot.powerups.len();

        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_entities_per_snapshot =
            self.avg_entities_per_snapshot * ((n - 1.0) / n) + (entities as f32 / n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::level::Level;
    use crate::game::tilemap::{TileKind, TileMap};
    use crate::game::RoundConfig;

    fn round() -> RoundState {
        RoundState::new(&RoundConfig::default(), Level { map: TileMap::empty() })
    }

    #[test]
    fn first_snapshot_carries_full_grid() {
        let round = round();
        let mut builder = SnapshotBuilder::new();
        let first = builder.build(&round);
        assert_eq!(first.full_grid.as_ref().map(Vec::len), Some(26 * 26));
        assert!(builder.build(&round).full_grid.is_none());
    }

    #[test]
    fn mirrors_round_state() {
        let mut round = round();
        round.map.put(4, 4, TileKind::Brick);
        round.map.set(4, 4, TileKind::Empty);
        round.step(&[]);
        round.players[1].score = 700;

        let snap = SnapshotBuilder::new().build(&round);
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.players.len(), 2);
        assert_eq!(snap.players[1].index, 2);
        assert_eq!(snap.players[1].score, 700);
        assert!(snap.players[0].shielded);
        assert_eq!(snap.remaining_enemies, 20);
        assert!(snap.base_alive);
        assert_eq!(snap.tile_changes.len(), 1);
    }

    #[test]
    fn stats_track_average() {
        let mut stats = SnapshotStats::default();
        let snap = SnapshotBuilder::new().build(&round());
        stats.record(&snap, 100);
        stats.record(&snap, 300);
        assert_eq!(stats.total_snapshots, 2);
        assert_eq!(stats.total_bytes, 400);
        assert!((stats.avg_entities_per_snapshot - 2.0).abs() < 1e-6);
    }
}
