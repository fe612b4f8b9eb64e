//! Host tick driver: owns the round, steps it at the simulation rate and
//! publishes a snapshot after every step

use std::future::Future;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::snapshot::{SnapshotBuilder, SnapshotStats};
use crate::game::{EventSink, Intent, RoundState};
use crate::input::{InputSource, IntentSampler};
use crate::net::codec;
use crate::net::{ConnectionState, HostLink};
use crate::util::time::{secs_to_ticks, tick_duration, Timer};

/// Ticks the host keeps publishing after the round ends so the remote sees it
pub const LINGER_TICKS: u32 = secs_to_ticks(3);
/// Every this many ticks a snapshot is encoded to sample its size
const STATS_SAMPLE_TICKS: u64 = 60;

/// How a hosted round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Victory,
    Defeat,
    /// Stopped before a result (shutdown signal)
    Aborted,
}

pub struct HostSession<I: InputSource> {
    round: RoundState,
    local_input: I,
    sampler: IntentSampler,
    link: Option<HostLink>,
    link_state: ConnectionState,
    snapshot_builder: SnapshotBuilder,
    stats: SnapshotStats,
    sink: Box<dyn EventSink + Send>,
}

impl<I: InputSource> HostSession<I> {
    /// `link` is `None` for local-only play
    pub fn new(
        round: RoundState,
        local_input: I,
        link: Option<HostLink>,
        sink: Box<dyn EventSink + Send>,
    ) -> Self {
        let link_state = link
            .as_ref()
            .map(HostLink::state)
            .unwrap_or(ConnectionState::Disconnected);
        let mut session = Self {
            round,
            local_input,
            sampler: IntentSampler::new(),
            link,
            link_state,
            snapshot_builder: SnapshotBuilder::new(),
            stats: SnapshotStats::default(),
            sink,
        };
        session.sync_connected_players();
        session
    }

    fn sync_connected_players(&mut self) {
        let remote = u8::from(self.link_state == ConnectionState::Connected);
        self.round.set_connected_players(1 + remote);
    }

    /// Track the link state, logging the transition to Disconnected once
    fn poll_link(&mut self) {
        let Some(link) = &self.link else {
            return;
        };
        let state = link.state();
        if state != self.link_state {
            if state == ConnectionState::Disconnected {
                warn!(
                    session = %link.session_id(),
                    tick = self.round.tick,
                    "Remote player lost; continuing with no input for their tank"
                );
            }
            self.link_state = state;
            self.sync_connected_players();
        }
    }

    /// Intents for this tick, indexed by player slot
    fn gather_intents(&mut self) -> Vec<Intent> {
        let mut intents = vec![Intent::idle(); self.round.players.len()];
        if let Some(slot) = intents.first_mut() {
            *slot = self.sampler.sample(self.local_input.sample());
        }
        // Anything still buffered once the link is down is stale
        let remote = self
            .link
            .as_ref()
            .filter(|_| self.link_state == ConnectionState::Connected);
        if let Some(link) = remote {
            let idx = link.player_index().saturating_sub(1) as usize;
            if let (Some(slot), Some(intent)) = (intents.get_mut(idx), link.take_intent()) {
                *slot = intent;
            }
        }
        intents
    }

    /// Run one simulation tick and publish its snapshot. No I/O happens here.
    pub fn tick(&mut self) {
        self.poll_link();
        let intents = self.gather_intents();

        let events = self.round.step(&intents);
        for event in &events {
            self.sink.notify(event);
        }

        let snapshot = self.snapshot_builder.build(&self.round);
        if self.round.tick % STATS_SAMPLE_TICKS == 0 {
            match codec::encode(&snapshot) {
                Ok(frame) => self.stats.record(&snapshot, frame.len()),
                Err(e) => warn!(error = %e, "Snapshot failed to encode"),
            }
        }
        if let Some(link) = &self.link {
            link.publish(snapshot);
        }
    }

    pub fn outcome(&self) -> Option<RoundOutcome> {
        if self.round.game_over {
            Some(RoundOutcome::Defeat)
        } else if self.round.victory {
            Some(RoundOutcome::Victory)
        } else {
            None
        }
    }

    /// Drive the round until it ends (plus a short linger) or `shutdown` fires
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> RoundOutcome {
        info!(
            players = self.round.players.len(),
            networked = self.link.is_some(),
            "Round started"
        );

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut linger = LINGER_TICKS;
        let outcome = loop {
            tokio::select! {
                _ = tick_interval.tick() => {}
                _ = &mut shutdown => break RoundOutcome::Aborted,
            }

            let timer = Timer::new();
            self.tick();
            if timer.elapsed() > tick_duration() {
                warn!(
                    tick = self.round.tick,
                    elapsed_us = timer.elapsed_micros(),
                    "Tick overran its budget"
                );
            }

            if let Some(outcome) = self.outcome() {
                if linger == LINGER_TICKS {
                    info!(tick = self.round.tick, ?outcome, "Round over");
                }
                linger = linger.saturating_sub(1);
                if linger == 0 {
                    break outcome;
                }
            }
        };

        for (idx, slot) in self.round.players.iter().enumerate() {
            info!(player = idx + 1, score = slot.score, kills = slot.kills, "Final score");
        }
        debug!(
            sampled = self.stats.total_snapshots,
            bytes = self.stats.total_bytes,
            avg_entities = self.stats.avg_entities_per_snapshot,
            "Snapshot stats"
        );

        if let Some(link) = self.link.take() {
            link.close().await;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::game::combat::Side;
    use crate::game::events::RecordingSink;
    use crate::game::level::Level;
    use crate::game::physics::Direction;
    use crate::game::tilemap::TileMap;
    use crate::game::RoundConfig;
    use crate::input::{IdleInput, RawInput, ScriptedInput};
    use crate::net::RemoteLink;
    use crate::util::rate_limit::IntakeLimiter;

    fn round() -> RoundState {
        RoundState::new(&RoundConfig::default(), Level { map: TileMap::empty() })
    }

    #[test]
    fn local_input_drives_player_one() {
        let input = ScriptedInput::default().hold(RawInput::holding(Direction::Right), 5);
        let mut host = HostSession::new(round(), input, None, Box::new(RecordingSink::default()));
        let start = host.round.players[0].tank.x;
        for _ in 0..5 {
            host.tick();
        }
        assert!(host.round.players[0].tank.x > start);
        assert_eq!(host.round.connected_players, 1);
    }

    #[test]
    fn events_reach_the_sink_and_outcome_follows_flags() {
        let mut round = round();
        round.base.alive = false;
        let mut host = HostSession::new(round, IdleInput, None, Box::new(RecordingSink::default()));
        host.tick();
        assert_eq!(host.outcome(), Some(RoundOutcome::Defeat));
    }

    #[tokio::test]
    async fn remote_player_drives_its_tank_and_disconnect_is_tolerated() {
        let (host_io, remote_io) = tokio::io::duplex(256 * 1024);
        let pending = tokio::spawn(HostLink::establish(host_io, 2, IntakeLimiter::new()));
        let remote = RemoteLink::establish(remote_io).await.unwrap();
        let link = pending.await.unwrap().unwrap();

        let mut host = HostSession::new(round(), IdleInput, Some(link), Box::new(RecordingSink::default()));
        assert_eq!(host.round.connected_players, 2);
        let start_x = host.round.players[1].tank.x;

        remote.send_intent(Intent::moving(Direction::Left));
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(2)).await;
            host.tick();
            if host.round.players[1].tank.x < start_x {
                break;
            }
        }
        assert!(host.round.players[1].tank.x < start_x);

        // Only one intent arrived: later ticks are idle
        let x = host.round.players[1].tank.x;
        host.tick();
        assert_eq!(host.round.players[1].tank.x, x);

        // An intent buffered just before the goodbye must not be applied
        remote.send_intent(Intent::moving(Direction::Left).with_shoot());
        remote.close().await;
        let link_down = |host: &HostSession<IdleInput>| {
            host.link
                .as_ref()
                .is_some_and(|l| l.state() == ConnectionState::Disconnected)
        };
        for _ in 0..100 {
            if link_down(&host) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(link_down(&host));

        let x = host.round.players[1].tank.x;
        let shots_by_remote = |host: &HostSession<IdleInput>| {
            host.round
                .projectiles
                .iter()
                .filter(|p| p.side == Side::Player(2))
                .count()
        };
        let shots = shots_by_remote(&host);
        host.tick();
        assert_eq!(host.round.connected_players, 1);
        assert_eq!(host.round.players[1].tank.x, x);
        assert_eq!(shots_by_remote(&host), shots);

        let tick = host.round.tick;
        host.tick();
        assert_eq!(host.round.tick, tick + 1);
        assert!(!host.round.is_terminal());
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let host = HostSession::new(round(), IdleInput, None, Box::new(RecordingSink::default()));
        let outcome = host.run(tokio::time::sleep(Duration::from_millis(50))).await;
        assert_eq!(outcome, RoundOutcome::Aborted);
    }
}
