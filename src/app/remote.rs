//! Remote render/input driver and the replicated view it maintains

use std::collections::HashSet;
use std::future::Future;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::combat::Side;
use crate::game::physics::{Aabb, POWERUP_SIZE, TANK_SIZE};
use crate::game::tilemap::{TileKind, TileMap};
use crate::game::{EventSink, GameEvent};
use crate::input::{InputSource, IntentSampler};
use crate::net::protocol::{PowerUpRecord, Snapshot};
use crate::net::{ConnectionState, RemoteLink};
use crate::util::time::render_interval;

/// Read-only replica of the host's round, rebuilt from snapshots
pub struct RemoteView {
    snapshot: Option<Snapshot>,
    map: TileMap,
    /// Projectile ids already announced; pruned to the live set each snapshot
    seen_projectiles: HashSet<u64>,
    state: ConnectionState,
}

impl RemoteView {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            map: TileMap::empty(),
            seen_projectiles: HashSet::new(),
            state: ConnectionState::Connecting,
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn set_connection_state(&mut self, state: ConnectionState) {
        self.state = state;
    }

    /// The view stops changing once the link is gone
    pub fn is_frozen(&self) -> bool {
        self.state == ConnectionState::Disconnected
    }

    #[cfg(test)]
    pub fn seen_projectile_count(&self) -> usize {
        self.seen_projectiles.len()
    }

    /// Apply the newest snapshot, reporting what changed since the previous one
    pub fn apply(&mut self, snapshot: Snapshot, sink: &mut dyn EventSink) {
        if self.is_frozen() {
            return;
        }
        if let Some(prev) = &self.snapshot {
            if snapshot.tick <= prev.tick {
                debug!(tick = snapshot.tick, current = prev.tick, "Ignoring stale snapshot");
                return;
            }
        }

        let mut events = Vec::new();
        self.apply_tiles(&snapshot, &mut events);
        self.diff_projectiles(&snapshot, &mut events);
        if let Some(prev) = &self.snapshot {
            diff_tanks(prev, &snapshot, &mut events);
            diff_powerups(prev, &snapshot, &mut events);
            diff_round(prev, &snapshot, &mut events);
        } else {
            for p in &snapshot.powerups {
                events.push(GameEvent::PowerUpSpawned { id: p.id, kind: p.kind });
            }
        }

        for event in &events {
            sink.notify(event);
        }
        self.snapshot = Some(snapshot);
    }

    fn apply_tiles(&mut self, snapshot: &Snapshot, events: &mut Vec<GameEvent>) {
        if let Some(grid) = &snapshot.full_grid {
            match TileMap::from_cells(grid.clone()) {
                Some(map) => self.map = map,
                None => warn!(cells = grid.len(), "Ignoring full grid of the wrong size"),
            }
        }
        for change in &snapshot.tile_changes {
            let before = self.map.get(change.row as usize, change.col as usize);
            self.map.apply_change(change);
            let destroyed = change.kind == TileKind::Empty
                && matches!(before, Some(TileKind::Brick | TileKind::Steel | TileKind::Trees));
            if let (true, Some(kind)) = (destroyed, before) {
                events.push(GameEvent::TileDestroyed {
                    row: change.row,
                    col: change.col,
                    kind,
                });
            }
        }
    }

    fn diff_projectiles(&mut self, snapshot: &Snapshot, events: &mut Vec<GameEvent>) {
        for p in &snapshot.projectiles {
            if self.seen_projectiles.insert(p.id) {
                let side = if p.from_enemy {
                    Side::Enemy
                } else {
                    Side::Player(p.owner)
                };
                events.push(GameEvent::ShotFired {
                    projectile_id: p.id,
                    side,
                });
            }
        }
        let live: HashSet<u64> = snapshot.projectiles.iter().map(|p| p.id).collect();
        self.seen_projectiles.retain(|id| live.contains(id));
    }
}

impl Default for RemoteView {
    fn default() -> Self {
        Self::new()
    }
}

fn diff_tanks(prev: &Snapshot, next: &Snapshot, events: &mut Vec<GameEvent>) {
    for before in prev.players.iter().filter(|p| p.alive) {
        let now_alive = next
            .players
            .iter()
            .find(|p| p.index == before.index)
            .is_some_and(|p| p.alive);
        if !now_alive {
            events.push(GameEvent::TankDestroyed {
                tank_id: before.index as u32,
                side: Side::Player(before.index),
                x: before.x,
                y: before.y,
            });
        }
    }
    for after in &next.players {
        let was_alive = prev
            .players
            .iter()
            .find(|p| p.index == after.index)
            .is_some_and(|p| p.alive);
        if after.alive && !was_alive {
            events.push(GameEvent::PlayerRespawned { index: after.index });
        }
    }

    for before in prev.enemies.iter().filter(|e| e.alive) {
        let now = next.enemies.iter().find(|e| e.id == before.id);
        match now {
            Some(e) if e.alive => {
                if e.health < before.health {
                    events.push(GameEvent::TankHit { tank_id: e.id });
                }
            }
            _ => events.push(GameEvent::TankDestroyed {
                tank_id: before.id,
                side: Side::Enemy,
                x: before.x,
                y: before.y,
            }),
        }
    }
    for after in &next.enemies {
        if !prev.enemies.iter().any(|e| e.id == after.id) {
            events.push(GameEvent::EnemySpawned { tank_id: after.id });
        }
    }
}

fn diff_powerups(prev: &Snapshot, next: &Snapshot, events: &mut Vec<GameEvent>) {
    for p in &next.powerups {
        if !prev.powerups.iter().any(|old| old.id == p.id) {
            events.push(GameEvent::PowerUpSpawned { id: p.id, kind: p.kind });
        }
    }
    for gone in prev.powerups.iter().filter(|old| !next.powerups.iter().any(|p| p.id == old.id)) {
        // A power-up that vanished under a tank was collected; otherwise it expired
        if let Some(collector) = collector_of(gone, next) {
            events.push(GameEvent::PowerUpCollected {
                id: gone.id,
                kind: gone.kind,
                collector,
            });
        }
    }
}

/// Players take precedence, matching the host's pickup order
fn collector_of(powerup: &PowerUpRecord, next: &Snapshot) -> Option<Side> {
    let pbox = Aabb::new(powerup.x, powerup.y, POWERUP_SIZE);
    let touches = |x: f32, y: f32| Aabb::new(x, y, TANK_SIZE).overlaps(&pbox);

    next.players
        .iter()
        .find(|p| p.alive && touches(p.x, p.y))
        .map(|p| Side::Player(p.index))
        .or_else(|| {
            next.enemies
                .iter()
                .find(|e| e.alive && touches(e.x, e.y))
                .map(|_| Side::Enemy)
        })
}

fn diff_round(prev: &Snapshot, next: &Snapshot, events: &mut Vec<GameEvent>) {
    if prev.base_alive && !next.base_alive {
        events.push(GameEvent::BaseDestroyed);
    }
    if !prev.game_over && next.game_over {
        events.push(GameEvent::RoundLost);
    }
    if !prev.victory && next.victory {
        events.push(GameEvent::RoundWon);
    }
}

/// Remote side of a networked round
pub struct RemoteSession<I: InputSource> {
    link: RemoteLink,
    input: I,
    sampler: IntentSampler,
    view: RemoteView,
    sink: Box<dyn EventSink + Send>,
}

impl<I: InputSource> RemoteSession<I> {
    pub fn new(link: RemoteLink, input: I, sink: Box<dyn EventSink + Send>) -> Self {
        let mut view = RemoteView::new();
        view.set_connection_state(link.state());
        Self {
            link,
            input,
            sampler: IntentSampler::new(),
            view,
            sink,
        }
    }

    pub fn view(&self) -> &RemoteView {
        &self.view
    }

    /// One render/input tick: send this tick's intent, apply what arrived
    pub fn tick(&mut self) {
        let intent = self.sampler.sample(self.input.sample());
        self.link.send_intent(intent);

        // Read the state first: the reader posts before it disconnects, so
        // a take after observing Disconnected still sees the final snapshot
        let state = self.link.state();
        if let Some(snapshot) = self.link.take_snapshot() {
            self.view.apply(snapshot, self.sink.as_mut());
        }

        if state != self.view.connection_state() {
            if state == ConnectionState::Disconnected {
                warn!(session = %self.link.session_id(), "Lost connection to host; view frozen");
            }
            self.view.set_connection_state(state);
        }
    }

    fn round_over(&self) -> bool {
        self.view
            .snapshot()
            .is_some_and(|s| s.game_over || s.victory)
    }

    /// Run until the host ends the round, the link drops or `shutdown` fires.
    /// Returns the final view.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> RemoteView {
        let mut render_tick = interval(render_interval());
        render_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = render_tick.tick() => {}
                _ = &mut shutdown => break,
            }
            self.tick();
            if self.view.is_frozen() {
                break;
            }
        }

        if self.round_over() {
            info!(
                tick = self.view.snapshot().map(|s| s.tick),
                "Host ended the round"
            );
        }
        self.link.close().await;
        self.view
    }
}
