//! Tank Duel - authoritative tank combat with host/remote replication
//!
//! One process hosts the round and runs the simulation; an optional second
//! process joins as the remote player over TCP. `ROLE` picks the side:
//! - `host`: wait for one remote player, then simulate and publish snapshots
//! - `remote`: connect to a host, send intents and mirror its snapshots
//! - `local`: simulate without any network

mod app;
mod config;
mod game;
mod input;
mod net;
mod util;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{HostSession, RemoteSession};
use crate::config::{Config, Role};
use crate::game::events::LogSink;
use crate::game::level::Level;
use crate::game::{RoundConfig, RoundState};
use crate::input::IdleInput;
use crate::net::transport::{self, HostListener};
use crate::net::{HostLink, NetError, RemoteLink};
use crate::util::rate_limit::IntakeLimiter;

/// Slot the remote player takes on the host
const REMOTE_PLAYER_INDEX: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level, config.log_json);

    info!(role = ?config.role, "Starting Tank Duel");

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.notify_one();
        });
    }

    match config.role {
        Role::Host => run_host(&config, shutdown, true).await?,
        Role::Local => run_host(&config, shutdown, false).await?,
        Role::Remote => run_remote(&config, shutdown).await?,
    }

    info!("Shutdown complete");
    Ok(())
}

fn load_level(config: &Config) -> anyhow::Result<Level> {
    match &config.level_file {
        Some(path) => Level::load(path).with_context(|| format!("loading level {path}")),
        None => Ok(Level::default_stage()?),
    }
}

/// Bind, accept the remote player and complete the handshake
async fn accept_remote(config: &Config) -> Result<HostLink, NetError> {
    let listener = HostListener::bind(&config.bind_addr).await?;
    let (stream, _peer) = listener.accept_one().await?;
    HostLink::establish(stream, REMOTE_PLAYER_INDEX, IntakeLimiter::new()).await
}

async fn run_host(config: &Config, shutdown: Arc<Notify>, networked: bool) -> anyhow::Result<()> {
    let level = load_level(config)?;

    let link = if networked {
        info!(addr = %config.bind_addr, "Waiting for remote player");
        tokio::select! {
            result = accept_remote(config) => match result {
                Ok(link) => Some(link),
                Err(e) => {
                    error!(error = %e, "Networked round could not start");
                    warn!("Falling back to local-only play");
                    None
                }
            },
            _ = shutdown.notified() => {
                info!("Shutdown before a remote player joined");
                return Ok(());
            }
        }
    } else {
        None
    };

    let seed = config.round_seed.unwrap_or_else(rand::random);
    let round_config = RoundConfig {
        seed,
        player_count: if link.is_some() { 2 } else { 1 },
        player_lives: config.player_lives,
        total_enemies: config.total_enemies,
        max_enemies_on_screen: config.max_enemies_on_screen,
    };
    info!(seed, players = round_config.player_count, "Round configured");

    let round = RoundState::new(&round_config, level);
    let session = HostSession::new(round, IdleInput, link, Box::new(LogSink));
    let outcome = session.run(async move { shutdown.notified().await }).await;

    info!(?outcome, "Round finished");
    Ok(())
}

async fn run_remote(config: &Config, shutdown: Arc<Notify>) -> anyhow::Result<()> {
    let stream = transport::connect(&config.host_addr, config.connect_timeout).await?;
    let link = RemoteLink::establish(stream).await?;

    let session = RemoteSession::new(link, IdleInput, Box::new(LogSink));
    let view = session.run(async move { shutdown.notified().await }).await;

    match view.snapshot() {
        Some(last) => info!(
            tick = last.tick,
            victory = last.victory,
            game_over = last.game_over,
            state = ?view.connection_state(),
            "Remote session ended"
        ),
        None => info!("Remote session ended before any snapshot arrived"),
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
