//! Round state and the authoritative per-tick simulation step

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::ai::{AiState, FIRE_INTERVAL};
use super::combat::{mutual_annihilations, Projectile, ProjectileIds, Side};
use super::events::GameEvent;
use super::level::{self, Level, PERIMETER_CELLS};
use super::physics::{Aabb, TILE_SIZE};
use super::powerup::{PickupEffect, PowerUp, PowerUpKind, FORTIFY_TICKS, FREEZE_TICKS, PICKUP_SCORE};
use super::spawn::{SpawnConfig, SpawnDirector};
use super::tank::{DamageOutcome, LifeState, Tank};
use super::tilemap::{TileChange, TileKind, TileMap};
use super::Intent;

/// Round parameters
#[derive(Debug, Clone)]
pub struct RoundConfig {
    pub seed: u64,
    pub player_count: u8,
    pub player_lives: u8,
    pub total_enemies: u32,
    pub max_enemies_on_screen: u32,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            player_count: 2,
            player_lives: 3,
            total_enemies: 20,
            max_enemies_on_screen: 4,
        }
    }
}

/// The structure the enemies are trying to destroy
#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    pub x: f32,
    pub y: f32,
    pub alive: bool,
}

impl Base {
    pub fn bbox(&self) -> Aabb {
        level::base_bbox()
    }

    pub fn center(&self) -> (f32, f32) {
        self.bbox().center()
    }
}

/// A player's tank plus the stats that outlive its deaths
#[derive(Debug, Clone)]
pub struct PlayerSlot {
    pub tank: Tank,
    pub score: u32,
    pub kills: u32,
}

/// Round aggregate, mutated only by [`RoundState::step`]
pub struct RoundState {
    pub tick: u64,
    pub map: TileMap,
    pub base: Base,
    pub players: Vec<PlayerSlot>,
    pub enemies: Vec<Tank>,
    pub projectiles: Vec<Projectile>,
    pub powerups: Vec<PowerUp>,
    pub spawner: SpawnDirector,
    /// Defeat flag
    pub game_over: bool,
    pub victory: bool,
    pub fortify_ticks: u32,
    pub enemy_freeze_ticks: u32,
    pub player_freeze_ticks: u32,
    pub connected_players: u8,
    tile_changes: Vec<TileChange>,
    fortify_backup: Vec<(usize, usize, TileKind)>,
    projectile_ids: ProjectileIds,
    next_tank_id: u32,
    next_powerup_id: u32,
    rng: ChaCha8Rng,
}

impl RoundState {
    pub fn new(config: &RoundConfig, level: Level) -> Self {
        let (base_x, base_y) = level::base_position();
        let players = (1..=config.player_count.max(1))
            .map(|index| PlayerSlot {
                tank: Tank::new_player(
                    index as u32,
                    index,
                    config.player_lives.max(1),
                    level::player_start(index),
                ),
                score: 0,
                kills: 0,
            })
            .collect::<Vec<_>>();
        let next_tank_id = players.len() as u32 + 1;

        let spawner = SpawnDirector::new(
            SpawnConfig {
                total: config.total_enemies,
                max_on_screen: config.max_enemies_on_screen,
                spawn_points: level::enemy_spawn_points(),
            },
            config.seed,
        );

        Self {
            tick: 0,
            map: level.map,
            base: Base {
                x: base_x,
                y: base_y,
                alive: true,
            },
            players,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            powerups: Vec::new(),
            spawner,
            game_over: false,
            victory: false,
            fortify_ticks: 0,
            enemy_freeze_ticks: 0,
            player_freeze_ticks: 0,
            connected_players: 1,
            tile_changes: Vec::new(),
            fortify_backup: Vec::new(),
            projectile_ids: ProjectileIds::default(),
            next_tank_id,
            next_powerup_id: 1,
            rng: ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(0x9e37_79b9)),
        }
    }

    pub fn set_connected_players(&mut self, count: u8) {
        self.connected_players = count;
    }

    pub fn is_terminal(&self) -> bool {
        self.game_over || self.victory
    }

    /// Tile mutations made during the most recent tick
    pub fn tile_changes(&self) -> &[TileChange] {
        &self.tile_changes
    }

    pub fn active_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_alive()).count()
    }

    /// Enemies not yet introduced plus those on the map
    pub fn remaining_enemies(&self) -> u32 {
        self.spawner.remaining() + self.enemies.len() as u32
    }

    /// Advance the world by one tick. `intents[i]` drives player `i + 1`;
    /// a missing entry counts as no input.
    pub fn step(&mut self, intents: &[Intent]) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.tick += 1;
        self.tile_changes.clear();

        if self.is_terminal() {
            return events;
        }

        self.respawn_players(&mut events);
        self.handle_life_requests(intents, &mut events);
        self.tick_timers();
        self.run_spawner(&mut events);

        self.apply_intents(intents, &mut events);
        self.run_enemy_ai(&mut events);

        for projectile in &mut self.projectiles {
            projectile.update();
        }

        self.resolve_tile_hits(&mut events);
        self.resolve_tank_hits(&mut events);
        self.resolve_base_hits(&mut events);
        self.resolve_projectile_clashes();
        self.resolve_pickups(&mut events);
        self.expire_powerups();

        self.enemies.retain(|e| !e.is_eliminated());

        self.evaluate_terminal(&mut events);

        self.tile_changes = self.map.drain_changes();
        events
    }

    fn respawn_players(&mut self, events: &mut Vec<GameEvent>) {
        for slot in &mut self.players {
            if slot.tank.respawn() {
                if let Some(index) = slot.tank.player_index() {
                    debug!(tick = self.tick, player = index, "player respawned");
                    events.push(GameEvent::PlayerRespawned { index });
                }
            }
        }
    }

    /// An eliminated player may take one life from a teammate holding two or more
    fn handle_life_requests(&mut self, intents: &[Intent], events: &mut Vec<GameEvent>) {
        for requester in 0..self.players.len() {
            let wants = intents.get(requester).is_some_and(|i| i.request_life);
            if !wants || !self.players[requester].tank.is_eliminated() {
                continue;
            }
            let donor = (0..self.players.len())
                .find(|&d| d != requester && self.players[d].tank.lives >= 2);
            if let Some(donor) = donor {
                self.players[donor].tank.lives -= 1;
                self.players[requester].tank.grant_life();
                let from = donor as u8 + 1;
                let to = requester as u8 + 1;
                info!(from, to, "life transferred between players");
                events.push(GameEvent::LifeTransferred { from, to });
            }
        }
    }

    fn tick_timers(&mut self) {
        for slot in &mut self.players {
            slot.tank.tick_timers();
        }
        for enemy in &mut self.enemies {
            enemy.tick_timers();
        }
        self.enemy_freeze_ticks = self.enemy_freeze_ticks.saturating_sub(1);
        self.player_freeze_ticks = self.player_freeze_ticks.saturating_sub(1);

        if self.fortify_ticks > 0 {
            self.fortify_ticks -= 1;
            if self.fortify_ticks == 0 {
                self.revert_fortification();
            }
        }
    }

    fn run_spawner(&mut self, events: &mut Vec<GameEvent>) {
        let occupied: Vec<Aabb> = self
            .live_tanks()
            .map(|(_, bbox)| bbox)
            .collect();
        let active = self.active_enemy_count();

        if let Some(order) = self.spawner.tick(active, &occupied) {
            let id = self.next_tank_id;
            self.next_tank_id += 1;
            let first_fire = self.rng.gen_range(1..=FIRE_INTERVAL);
            self.enemies.push(Tank::new_enemy(
                id,
                order.variant,
                order.position,
                AiState::new(first_fire),
            ));
            debug!(
                tick = self.tick,
                tank_id = id,
                variant = ?order.variant,
                remaining = self.spawner.remaining(),
                "enemy spawned"
            );
            events.push(GameEvent::EnemySpawned { tank_id: id });
        }
    }

    /// Every live tank's id and box
    fn live_tanks(&self) -> impl Iterator<Item = (u32, Aabb)> + '_ {
        self.players
            .iter()
            .map(|s| &s.tank)
            .chain(self.enemies.iter())
            .filter(|t| t.is_alive())
            .map(|t| (t.id, t.bbox()))
    }

    /// Boxes that block a mover: the base and every other live tank the mover
    /// does not already overlap
    fn obstacles_for(&self, mover: u32, mover_box: &Aabb) -> Vec<Aabb> {
        std::iter::once(self.base.bbox())
            .chain(
                self.live_tanks()
                    .filter(|(id, bbox)| *id != mover && !bbox.overlaps(mover_box))
                    .map(|(_, bbox)| bbox),
            )
            .collect()
    }

    fn apply_intents(&mut self, intents: &[Intent], events: &mut Vec<GameEvent>) {
        if self.player_freeze_ticks > 0 {
            return;
        }
        for idx in 0..self.players.len() {
            let intent = intents.get(idx).copied().unwrap_or_default();
            let tank = &self.players[idx].tank;
            if !tank.is_alive() {
                continue;
            }
            let obstacles = self.obstacles_for(tank.id, &tank.bbox());

            let tank = &mut self.players[idx].tank;
            if let Some(direction) = intent.direction() {
                tank.turn(direction, &self.map, &obstacles);
                tank.try_move(direction, &self.map, &obstacles);
            }
            if intent.shoot {
                if let Some(projectile) = tank.shoot(&mut self.projectile_ids) {
                    events.push(GameEvent::ShotFired {
                        projectile_id: projectile.id,
                        side: projectile.side,
                    });
                    self.projectiles.push(projectile);
                }
            }
        }
    }

    fn run_enemy_ai(&mut self, events: &mut Vec<GameEvent>) {
        if self.enemy_freeze_ticks > 0 {
            return;
        }
        let target = self.base.center();
        for idx in 0..self.enemies.len() {
            let tank = &self.enemies[idx];
            if !tank.is_alive() {
                continue;
            }
            let obstacles = self.obstacles_for(tank.id, &tank.bbox());

            let tank = &mut self.enemies[idx];
            let Some(ai) = tank.ai.as_mut() else {
                continue;
            };
            let decision = ai.think((tank.x, tank.y), target, &mut self.rng);
            tank.turn(decision.direction, &self.map, &obstacles);
            tank.try_move(decision.direction, &self.map, &obstacles);

            if decision.fire {
                if let Some(projectile) = tank.shoot(&mut self.projectile_ids) {
                    events.push(GameEvent::ShotFired {
                        projectile_id: projectile.id,
                        side: projectile.side,
                    });
                    self.projectiles.push(projectile);
                }
            }
        }
    }

    /// Tile impacts take priority over the bounds check
    fn resolve_tile_hits(&mut self, events: &mut Vec<GameEvent>) {
        let mut doomed = vec![false; self.projectiles.len()];
        for (idx, projectile) in self.projectiles.iter().enumerate() {
            let point = projectile.impact_point();
            let before = cell_at(&self.map, point);
            let effect = self
                .map
                .impact(point, projectile.power, projectile.cuts_trees);

            if effect.is_destructive() {
                if let Some((row, col, kind)) = before {
                    events.push(GameEvent::TileDestroyed {
                        row: row as u16,
                        col: col as u16,
                        kind,
                    });
                }
            }
            doomed[idx] = effect.stops_projectile() || projectile.out_of_bounds();
        }
        retain_unmarked(&mut self.projectiles, &doomed);
    }

    fn resolve_tank_hits(&mut self, events: &mut Vec<GameEvent>) {
        let mut doomed = vec![false; self.projectiles.len()];
        let mut drops: Vec<(u32, f32, f32)> = Vec::new();

        for (idx, projectile) in self.projectiles.iter().enumerate() {
            let pbox = projectile.bbox();
            let hittable = |t: &Tank| {
                t.is_alive() && projectile.side.can_hit(t.role.side()) && t.bbox().overlaps(&pbox)
            };
            let target = match projectile.side {
                Side::Enemy => self
                    .players
                    .iter_mut()
                    .map(|s| &mut s.tank)
                    .find(|t| hittable(&**t)),
                Side::Player(_) => self.enemies.iter_mut().find(|t| hittable(&**t)),
            };
            let Some(target) = target else {
                continue;
            };

            let outcome = target.damage();
            let (tank_id, side, x, y) = (target.id, target.role.side(), target.x, target.y);
            let variant = target.variant();
            doomed[idx] = true;

            match outcome {
                DamageOutcome::Blocked => {}
                DamageOutcome::Damaged { drop_powerup } => {
                    events.push(GameEvent::TankHit { tank_id });
                    if drop_powerup {
                        drops.push((tank_id, x, y));
                    }
                }
                DamageOutcome::Destroyed => {
                    debug!(tick = self.tick, tank_id, ?side, "tank destroyed");
                    events.push(GameEvent::TankDestroyed { tank_id, side, x, y });
                    if let (Side::Player(shooter), Some(variant)) = (projectile.side, variant) {
                        if let Some(slot) = self.players.get_mut(shooter.saturating_sub(1) as usize) {
                            slot.score += variant.score();
                            slot.kills += 1;
                        }
                    }
                }
            }
        }

        retain_unmarked(&mut self.projectiles, &doomed);
        for (tank_id, x, y) in drops {
            self.drop_powerup(tank_id, x, y, events);
        }
    }

    fn drop_powerup(&mut self, tank_id: u32, x: f32, y: f32, events: &mut Vec<GameEvent>) {
        let id = self.next_powerup_id;
        self.next_powerup_id += 1;
        let kind = PowerUpKind::random(&mut self.rng);
        self.powerups.push(PowerUp::new(id, x, y, kind).from_tank(tank_id));
        events.push(GameEvent::PowerUpSpawned { id, kind });
    }

    fn resolve_base_hits(&mut self, events: &mut Vec<GameEvent>) {
        if !self.base.alive {
            return;
        }
        let base_box = self.base.bbox();
        let doomed: Vec<bool> = self
            .projectiles
            .iter()
            .map(|p| p.bbox().overlaps(&base_box))
            .collect();

        if doomed.iter().any(|d| *d) {
            self.base.alive = false;
            info!(tick = self.tick, "base destroyed");
            events.push(GameEvent::BaseDestroyed);
            retain_unmarked(&mut self.projectiles, &doomed);
        }
    }

    fn resolve_projectile_clashes(&mut self) {
        let hits = mutual_annihilations(&self.projectiles);
        if hits.is_empty() {
            return;
        }
        let mut doomed = vec![false; self.projectiles.len()];
        for idx in hits {
            doomed[idx] = true;
        }
        retain_unmarked(&mut self.projectiles, &doomed);
    }

    /// Players are checked before enemies, so a player wins an exact tie
    fn resolve_pickups(&mut self, events: &mut Vec<GameEvent>) {
        let mut collected = vec![false; self.powerups.len()];

        for idx in 0..self.powerups.len() {
            let powerup = self.powerups[idx].clone();
            let pbox = powerup.bbox();

            let collector = self
                .players
                .iter_mut()
                .map(|s| &mut s.tank)
                .chain(self.enemies.iter_mut())
                .find(|t| {
                    t.is_alive() && powerup.collectable_by(t.id) && t.bbox().overlaps(&pbox)
                });
            let Some(tank) = collector else {
                continue;
            };

            let side = tank.role.side();
            let effect = powerup.apply(tank);
            collected[idx] = true;

            if let Side::Player(index) = side {
                if let Some(slot) = self.players.get_mut(index.saturating_sub(1) as usize) {
                    slot.score += PICKUP_SCORE;
                }
            }

            match effect {
                PickupEffect::Tank => {}
                PickupEffect::Fortify => self.fortify(),
                PickupEffect::FreezeOpponents => {
                    if side.is_enemy() {
                        self.player_freeze_ticks = FREEZE_TICKS;
                    } else {
                        self.enemy_freeze_ticks = FREEZE_TICKS;
                    }
                }
            }

            debug!(tick = self.tick, id = powerup.id, kind = ?powerup.kind, ?side, "power-up collected");
            events.push(GameEvent::PowerUpCollected {
                id: powerup.id,
                kind: powerup.kind,
                collector: side,
            });
        }

        retain_unmarked(&mut self.powerups, &collected);
    }

    fn expire_powerups(&mut self) {
        for powerup in &mut self.powerups {
            powerup.ttl = powerup.ttl.saturating_sub(1);
        }
        self.powerups.retain(|p| !p.expired());
    }

    /// Turn the base perimeter to steel, remembering what was there
    fn fortify(&mut self) {
        if self.fortify_ticks == 0 {
            self.fortify_backup = PERIMETER_CELLS
                .iter()
                .filter_map(|&(row, col)| self.map.get(row, col).map(|kind| (row, col, kind)))
                .collect();
            for &(row, col) in &PERIMETER_CELLS {
                self.map.set(row, col, TileKind::Steel);
            }
        }
        self.fortify_ticks = FORTIFY_TICKS;
    }

    /// Restore the perimeter; cells shot away meanwhile stay empty
    fn revert_fortification(&mut self) {
        for (row, col, kind) in std::mem::take(&mut self.fortify_backup) {
            if self.map.get(row, col) == Some(TileKind::Steel) {
                self.map.set(row, col, kind);
            }
        }
    }

    fn evaluate_terminal(&mut self, events: &mut Vec<GameEvent>) {
        let all_eliminated = self
            .players
            .iter()
            .all(|s| s.tank.state == LifeState::Eliminated);

        if !self.base.alive || all_eliminated {
            self.game_over = true;
            info!(tick = self.tick, base_alive = self.base.alive, "round lost");
            events.push(GameEvent::RoundLost);
        } else if self.spawner.exhausted() && self.enemies.is_empty() {
            self.victory = true;
            info!(tick = self.tick, "round won");
            events.push(GameEvent::RoundWon);
        }
    }
}

fn cell_at(map: &TileMap, (x, y): (f32, f32)) -> Option<(usize, usize, TileKind)> {
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let row = (y / TILE_SIZE) as usize;
    let col = (x / TILE_SIZE) as usize;
    map.get(row, col).map(|kind| (row, col, kind))
}

/// Drop every item whose flag is set, preserving order
fn retain_unmarked<T>(items: &mut Vec<T>, doomed: &[bool]) {
    let mut idx = 0;
    items.retain(|_| {
        let keep = !doomed.get(idx).copied().unwrap_or(false);
        idx += 1;
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::{Direction, TANK_SIZE};
    use crate::game::tank::EnemyVariant;

    fn open_round(players: u8, total_enemies: u32) -> RoundState {
        let level = Level { map: TileMap::empty() };
        RoundState::new(
            &RoundConfig {
                seed: 42,
                player_count: players,
                player_lives: 3,
                total_enemies,
                max_enemies_on_screen: 4,
            },
            level,
        )
    }

    fn unshield(round: &mut RoundState) {
        for slot in &mut round.players {
            slot.tank.mods.shield_ticks = 0;
        }
    }

    fn enemy_at(round: &mut RoundState, variant: EnemyVariant, x: f32, y: f32) -> u32 {
        let id = round.next_tank_id;
        round.next_tank_id += 1;
        let mut tank = Tank::new_enemy(id, variant, (x, y), AiState::new(10_000));
        tank.mods.shield_ticks = 0;
        round.enemies.push(tank);
        id
    }

    fn shot(round: &mut RoundState, side: Side, x: f32, y: f32, direction: Direction) -> u64 {
        let id = round.projectile_ids.next_id();
        round
            .projectiles
            .push(Projectile::new(id, 0, side, x, y, direction, 4.0, 1, false));
        id
    }

    #[test]
    fn projectile_on_base_is_immediate_defeat() {
        let mut round = open_round(1, 5);
        let (bx, by) = level::base_position();
        // Friendly fire counts too; lands inside the base after one step
        shot(&mut round, Side::Player(1), bx + 14.0, by - 6.0, Direction::Down);

        let events = round.step(&[]);
        assert!(!round.base.alive);
        assert!(round.game_over);
        assert!(!round.victory);
        assert!(round.projectiles.is_empty());
        assert!(events.contains(&GameEvent::BaseDestroyed));
        assert!(events.contains(&GameEvent::RoundLost));
    }

    #[test]
    fn terminal_state_is_sticky() {
        let mut round = open_round(1, 5);
        round.base.alive = false;
        round.step(&[]);
        assert!(round.game_over);
        let tick = round.tick;
        let player_pos = (round.players[0].tank.x, round.players[0].tank.y);

        round.step(&[Intent::moving(Direction::Up).with_shoot()]);
        assert_eq!(round.tick, tick + 1);
        assert_eq!((round.players[0].tank.x, round.players[0].tank.y), player_pos);
        assert!(round.projectiles.is_empty());
    }

    #[test]
    fn overlapping_projectiles_annihilate() {
        let mut round = open_round(1, 5);
        shot(&mut round, Side::Enemy, 100.0, 100.0, Direction::Down);
        shot(&mut round, Side::Player(1), 100.0, 110.0, Direction::Up);
        shot(&mut round, Side::Player(1), 300.0, 200.0, Direction::Up);

        round.step(&[]);
        assert_eq!(round.projectiles.len(), 1);
        assert_eq!(round.projectiles[0].x, 300.0);
    }

    #[test]
    fn fast_head_on_projectiles_cannot_tunnel() {
        let mut round = open_round(1, 5);
        round.enemy_freeze_ticks = 1_000_000;
        shot(&mut round, Side::Enemy, 100.0, 100.0, Direction::Down);
        shot(&mut round, Side::Player(1), 100.0, 106.0, Direction::Up);
        for p in &mut round.projectiles {
            p.speed = 6.0;
        }

        round.step(&[]);
        assert!(round.projectiles.is_empty());
    }

    #[test]
    fn player_shot_ignores_players_and_hits_enemies() {
        let mut round = open_round(2, 5);
        round.enemy_freeze_ticks = 1_000_000;
        unshield(&mut round);
        let p2 = round.players[1].tank.clone();
        // Friendly projectile flying through player two
        shot(&mut round, Side::Player(1), p2.x + 10.0, p2.y + 10.0, Direction::Up);
        round.step(&[]);
        assert!(round.players[1].tank.is_alive());
        assert_eq!(round.projectiles.len(), 1);

        round.projectiles.clear();
        let enemy = enemy_at(&mut round, EnemyVariant::Regular, 200.0, 200.0);
        shot(&mut round, Side::Player(1), 210.0, 210.0, Direction::Up);
        let events = round.step(&[]);
        assert!(events.iter().any(|e| matches!(e, GameEvent::TankDestroyed { tank_id, .. } if *tank_id == enemy)));
        assert!(round.enemies.iter().all(|e| e.id != enemy));
        assert_eq!(round.players[0].kills, 1);
        assert_eq!(round.players[0].score, EnemyVariant::Regular.score());
    }

    #[test]
    fn armored_hit_drops_powerup_at_tank() {
        let mut round = open_round(1, 5);
        round.enemy_freeze_ticks = 1_000_000;
        let carrier = enemy_at(&mut round, EnemyVariant::Armored, 200.0, 100.0);
        shot(&mut round, Side::Player(1), 210.0, 120.0, Direction::Up);
        let events = round.step(&[]);

        assert_eq!(round.enemies[0].health, 2);
        assert!(events.contains(&GameEvent::TankHit { tank_id: carrier }));
        // The carrier sits on its own drop without collecting it
        assert_eq!(round.powerups.len(), 1);
        let drop = &round.powerups[0];
        assert_eq!((drop.x, drop.y), (200.0, 100.0));
        assert_eq!(drop.dropped_by, Some(carrier));
    }

    #[test]
    fn player_respawns_then_is_eliminated() {
        let mut round = open_round(1, 5);
        round.enemy_freeze_ticks = 1_000_000;
        let start = level::player_start(1);

        for hit in 1..=3 {
            unshield(&mut round);
            let tank = round.players[0].tank.clone();
            shot(&mut round, Side::Enemy, tank.x + 12.0, tank.y + 4.0, Direction::Down);
            round.step(&[]);

            if hit < 3 {
                assert_eq!(round.players[0].tank.state, LifeState::AwaitingRespawn);
                round.step(&[]);
                let tank = &round.players[0].tank;
                assert!(tank.is_alive());
                assert_eq!((tank.x, tank.y), start);
                assert!(tank.shielded());
                assert!(!round.game_over);
            }
        }
        assert_eq!(round.players[0].tank.state, LifeState::Eliminated);
        assert!(round.game_over);
        round.step(&[]);
        assert!(!round.players[0].tank.is_alive());
    }

    #[test]
    fn one_eliminated_player_does_not_end_round() {
        let mut round = open_round(2, 5);
        round.players[0].tank.lives = 1;
        unshield(&mut round);
        let tank = round.players[0].tank.clone();
        shot(&mut round, Side::Enemy, tank.x + 12.0, tank.y + 4.0, Direction::Down);
        round.step(&[]);
        assert!(round.players[0].tank.is_eliminated());
        assert!(!round.game_over);
    }

    #[test]
    fn life_request_takes_life_from_teammate() {
        let mut round = open_round(2, 5);
        round.players[0].tank.lives = 1;
        unshield(&mut round);
        let tank = round.players[0].tank.clone();
        shot(&mut round, Side::Enemy, tank.x + 12.0, tank.y + 4.0, Direction::Down);
        round.step(&[]);
        assert!(round.players[0].tank.is_eliminated());

        let ask = Intent {
            request_life: true,
            ..Intent::default()
        };
        let events = round.step(&[ask]);
        assert!(events.contains(&GameEvent::LifeTransferred { from: 2, to: 1 }));
        assert_eq!(round.players[1].tank.lives, 2);
        assert_eq!(round.players[0].tank.state, LifeState::AwaitingRespawn);
        round.step(&[]);
        assert!(round.players[0].tank.is_alive());
    }

    #[test]
    fn victory_only_after_all_enemies_introduced_and_gone() {
        let mut round = open_round(1, 2);
        round.enemy_freeze_ticks = u32::MAX;
        let mut ticks = 0;
        while !round.victory && ticks < 5_000 {
            // Clear every live enemy the moment it appears
            for enemy in &mut round.enemies {
                enemy.mods.shield_ticks = 0;
                enemy.health = 1;
                enemy.damage();
            }
            round.step(&[]);
            ticks += 1;
            let expected = round.spawner.exhausted() && round.enemies.is_empty();
            assert_eq!(round.victory, expected);
        }
        assert!(round.victory);
        assert!(!round.game_over);
        assert_eq!(round.spawner.spawned(), 2);
    }

    #[test]
    fn brick_hit_is_logged_for_replication() {
        let mut round = open_round(1, 5);
        round.map.put(5, 5, TileKind::Brick);
        shot(&mut round, Side::Player(1), 5.0 * 16.0 + 6.0, 5.0 * 16.0 + 10.0, Direction::Up);
        let events = round.step(&[]);
        assert!(round.projectiles.is_empty());
        assert_eq!(
            round.tile_changes(),
            &[TileChange { row: 5, col: 5, kind: TileKind::Empty }]
        );
        assert!(events.contains(&GameEvent::TileDestroyed { row: 5, col: 5, kind: TileKind::Brick }));

        round.step(&[]);
        assert!(round.tile_changes().is_empty());
    }

    #[test]
    fn steel_on_edge_stops_shot_before_bounds() {
        let mut round = open_round(1, 5);
        round.map.put(0, 3, TileKind::Steel);
        shot(&mut round, Side::Player(1), 3.0 * 16.0 + 6.0, 2.0, Direction::Up);
        round.step(&[]);
        assert!(round.projectiles.is_empty());
        assert_eq!(round.map.get(0, 3), Some(TileKind::Steel));
    }

    #[test]
    fn projectile_leaving_map_is_removed() {
        let mut round = open_round(1, 5);
        shot(&mut round, Side::Player(1), 100.0, 1.0, Direction::Up);
        round.step(&[]);
        assert!(round.projectiles.is_empty());
    }

    #[test]
    fn shovel_fortifies_and_reverts() {
        let mut round = open_round(1, 5);
        round.enemy_freeze_ticks = 1_000_000;
        round.map.put(23, 11, TileKind::Brick);
        let tank = round.players[0].tank.clone();
        round.powerups.push(PowerUp::new(99, tank.x, tank.y, PowerUpKind::Shovel));

        round.step(&[]);
        assert!(round.powerups.is_empty());
        assert_eq!(round.fortify_ticks, FORTIFY_TICKS);
        for (row, col) in PERIMETER_CELLS {
            assert_eq!(round.map.get(row, col), Some(TileKind::Steel));
        }
        assert_eq!(round.tile_changes().len(), PERIMETER_CELLS.len());
        assert_eq!(round.players[0].score, PICKUP_SCORE);

        for _ in 0..FORTIFY_TICKS {
            round.step(&[]);
        }
        assert_eq!(round.fortify_ticks, 0);
        assert_eq!(round.map.get(23, 11), Some(TileKind::Brick));
        assert_eq!(round.map.get(23, 12), Some(TileKind::Empty));
    }

    #[test]
    fn player_wins_pickup_tie() {
        let mut round = open_round(1, 5);
        round.enemy_freeze_ticks = 1_000_000;
        let tank = round.players[0].tank.clone();
        enemy_at(&mut round, EnemyVariant::Regular, tank.x + 20.0, tank.y);
        round.powerups.push(PowerUp::new(7, tank.x + 10.0, tank.y, PowerUpKind::Star));
        let events = round.step(&[]);
        assert!(events.contains(&GameEvent::PowerUpCollected {
            id: 7,
            kind: PowerUpKind::Star,
            collector: Side::Player(1),
        }));
        assert_eq!(round.players[0].tank.mods.power_tier, 2);
    }

    #[test]
    fn uncollected_powerup_expires() {
        let mut round = open_round(1, 5);
        let mut drop = PowerUp::new(1, 10.0, 10.0, PowerUpKind::Saw);
        drop.ttl = 2;
        round.powerups.push(drop);
        round.step(&[]);
        assert_eq!(round.powerups.len(), 1);
        round.step(&[]);
        assert!(round.powerups.is_empty());
    }

    #[test]
    fn intents_move_and_fire() {
        let mut round = open_round(1, 5);
        round.enemy_freeze_ticks = 1_000_000;
        let start = round.players[0].tank.clone();
        let events = round.step(&[Intent::moving(Direction::Up).with_shoot()]);
        let tank = &round.players[0].tank;
        assert_eq!(tank.y, start.y - 1.5);
        assert_eq!(round.projectiles.len(), 1);
        assert!(matches!(events[0], GameEvent::ShotFired { side: Side::Player(1), .. }));

        let y = tank.y;
        round.step(&[]);
        assert_eq!(round.players[0].tank.y, y);
    }

    #[test]
    fn frozen_players_ignore_intents() {
        let mut round = open_round(1, 5);
        round.player_freeze_ticks = 10;
        round.enemy_freeze_ticks = 1_000_000;
        let y = round.players[0].tank.y;
        round.step(&[Intent::moving(Direction::Up).with_shoot()]);
        assert_eq!(round.players[0].tank.y, y);
        assert!(round.projectiles.is_empty());
    }

    #[test]
    fn tanks_block_each_other() {
        let mut round = open_round(1, 5);
        round.enemy_freeze_ticks = 1_000_000;
        let tank = round.players[0].tank.clone();
        enemy_at(&mut round, EnemyVariant::Regular, tank.x, tank.y - TANK_SIZE - 1.0);
        round.step(&[Intent::moving(Direction::Up)]);
        round.step(&[Intent::moving(Direction::Up)]);
        assert_eq!(round.players[0].tank.y, tank.y);
    }

    #[test]
    fn same_seed_same_world() {
        let mut a = open_round(2, 10);
        let mut b = open_round(2, 10);
        for _ in 0..2_000 {
            a.step(&[]);
            b.step(&[]);
        }
        assert_eq!(a.enemies.len(), b.enemies.len());
        for (ea, eb) in a.enemies.iter().zip(&b.enemies) {
            assert_eq!((ea.id, ea.x, ea.y), (eb.id, eb.x, eb.y));
        }
        assert_eq!(a.projectiles, b.projectiles);
        assert_eq!(a.base.alive, b.base.alive);
    }
}
