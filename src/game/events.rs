//! Discrete game events for presentation and audio collaborators

use tracing::debug;

use super::combat::Side;
use super::powerup::PowerUpKind;
use super::tilemap::TileKind;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ShotFired {
        projectile_id: u64,
        side: Side,
    },
    TankHit {
        tank_id: u32,
    },
    TankDestroyed {
        tank_id: u32,
        side: Side,
        x: f32,
        y: f32,
    },
    PlayerRespawned {
        index: u8,
    },
    LifeTransferred {
        from: u8,
        to: u8,
    },
    TileDestroyed {
        row: u16,
        col: u16,
        kind: TileKind,
    },
    PowerUpSpawned {
        id: u32,
        kind: PowerUpKind,
    },
    PowerUpCollected {
        id: u32,
        kind: PowerUpKind,
        collector: Side,
    },
    EnemySpawned {
        tank_id: u32,
    },
    BaseDestroyed,
    RoundWon,
    RoundLost,
}

/// Receiver of game events (audio, effects, HUD)
pub trait EventSink {
    fn notify(&mut self, event: &GameEvent);
}

/// Sink that records events in the trace log
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn notify(&mut self, event: &GameEvent) {
        debug!(?event, "game event");
    }
}

/// Sink that keeps every event, for inspection
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<GameEvent>,
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn notify(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }
}
