//! Live replication links: handshake plus background reader / writer tasks
//!
//! The tick driver never touches the socket. It posts outbound messages into a
//! latest-wins mailbox and takes inbound ones from another; the tasks spawned
//! here move frames between those mailboxes and the stream.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::Intent;
use crate::util::rate_limit::IntakeLimiter;
use crate::util::time::SIMULATION_TPS;

use super::codec::{read_frame, write_frame};
use super::error::NetError;
use super::mailbox::{Coalesce, Mailbox};
use super::protocol::{HostMsg, RemoteMsg, Snapshot, PROTOCOL_VERSION};

/// Time allowed for the Hello / Welcome exchange
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
/// Time allowed for the writer to flush a goodbye on close
const CLOSE_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Anything the links can run over
pub trait Stream: AsyncRead + AsyncWrite + Send + 'static {}
impl<S: AsyncRead + AsyncWrite + Send + 'static> Stream for S {}

/// Shared pieces of one live connection
struct Link {
    session_id: Uuid,
    state: watch::Sender<ConnectionState>,
    shutdown: Notify,
}

impl Link {
    fn new(session_id: Uuid) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectionState::Connected);
        Arc::new(Self {
            session_id,
            state,
            shutdown: Notify::new(),
        })
    }

    /// Mark the connection lost; returns false if it already was
    fn disconnect(&self, reason: &str) -> bool {
        let previous = self.state.send_replace(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            info!(session = %self.session_id, reason, "Connection closed");
            self.shutdown.notify_one();
            true
        } else {
            false
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

/// Drain `outbound` onto the stream until shutdown or a write failure
fn spawn_writer<W, T, M>(
    link: Arc<Link>,
    mut writer: WriteHalf<W>,
    outbound: Arc<Mailbox<T>>,
    wrap: fn(T) -> M,
    goodbye: M,
) -> JoinHandle<()>
where
    W: Stream,
    T: Coalesce + Send + 'static,
    M: Serialize + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = outbound.recv() => {
                    if let Err(e) = write_frame(&mut writer, &wrap(msg)).await {
                        warn!(session = %link.session_id, error = %e, "Write failed");
                        link.disconnect("write failed");
                        break;
                    }
                }
                _ = link.shutdown.notified() => {
                    if let Some(msg) = outbound.take() {
                        let _ = write_frame(&mut writer, &wrap(msg)).await;
                    }
                    if let Err(e) = write_frame(&mut writer, &goodbye).await {
                        debug!(session = %link.session_id, error = %e, "Goodbye not delivered");
                    }
                    break;
                }
            }
        }
        debug!(session = %link.session_id, "Writer task finished");
    })
}

async fn close_link(link: &Link, mut writer: JoinHandle<()>, reader: JoinHandle<()>) {
    if !link.disconnect("local close") {
        // Peer already left; the writer may still be waiting on a permit
        link.shutdown.notify_one();
    }
    if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        // Stalled peer: stop the blocked write so the stream is released
        debug!(session = %link.session_id, "Writer did not finish in time");
        writer.abort();
        let _ = writer.await;
    }
    reader.abort();
    let _ = reader.await;
}

/// Host end of a connection to the remote player
pub struct HostLink {
    link: Arc<Link>,
    player_index: u8,
    snapshots: Arc<Mailbox<Snapshot>>,
    intents: Arc<Mailbox<Intent>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl HostLink {
    /// Complete the handshake on an accepted stream and start the I/O tasks
    pub async fn establish<S: Stream>(
        stream: S,
        player_index: u8,
        limiter: IntakeLimiter,
    ) -> Result<Self, NetError> {
        let session_id = Uuid::new_v4();
        let (mut rd, mut wr) = tokio::io::split(stream);

        let hello = tokio::time::timeout(HANDSHAKE_TIMEOUT, read_frame::<_, RemoteMsg>(&mut rd))
            .await
            .map_err(|_| NetError::HandshakeFailed("no hello before timeout".to_string()))??;
        let peer_version = match hello {
            Some(RemoteMsg::Hello { protocol_version }) => protocol_version,
            Some(other) => {
                return Err(NetError::HandshakeFailed(format!(
                    "expected hello, got {other:?}"
                )))
            }
            None => return Err(NetError::HandshakeFailed("peer closed".to_string())),
        };
        if peer_version != PROTOCOL_VERSION {
            let _ = write_frame(&mut wr, &HostMsg::Goodbye).await;
            return Err(NetError::VersionMismatch {
                local: PROTOCOL_VERSION,
                peer: peer_version,
            });
        }

        let welcome = HostMsg::Welcome {
            player_index,
            protocol_version: PROTOCOL_VERSION,
            tick_rate: SIMULATION_TPS,
        };
        write_frame(&mut wr, &welcome).await?;
        info!(session = %session_id, player_index, "Remote player joined");

        let link = Link::new(session_id);
        let snapshots = Arc::new(Mailbox::new());
        let intents = Arc::new(Mailbox::new());

        let writer = spawn_writer(
            link.clone(),
            wr,
            snapshots.clone(),
            HostMsg::Snapshot,
            HostMsg::Goodbye,
        );
        let reader = tokio::spawn(host_read_loop(link.clone(), rd, intents.clone(), limiter));

        Ok(Self {
            link,
            player_index,
            snapshots,
            intents,
            reader,
            writer,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.link.session_id
    }

    pub fn player_index(&self) -> u8 {
        self.player_index
    }

    /// Queue a snapshot without waiting on the socket
    pub fn publish(&self, snapshot: Snapshot) {
        if self.link.state() != ConnectionState::Connected {
            return;
        }
        if self.snapshots.post(snapshot) {
            debug!(session = %self.link.session_id, "Unsent snapshot superseded");
        }
    }

    /// Latest intent received since the previous call
    pub fn take_intent(&self) -> Option<Intent> {
        self.intents.take()
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    /// Send a goodbye and stop the I/O tasks
    pub async fn close(self) {
        close_link(&self.link, self.writer, self.reader).await;
    }
}

async fn host_read_loop<S: Stream>(
    link: Arc<Link>,
    mut rd: ReadHalf<S>,
    intents: Arc<Mailbox<Intent>>,
    limiter: IntakeLimiter,
) {
    let reason = loop {
        match read_frame::<_, RemoteMsg>(&mut rd).await {
            Ok(Some(RemoteMsg::Intent(msg))) => {
                if !limiter.check_intent() {
                    warn!(session = %link.session_id, "Rate limited intent frame");
                    continue;
                }
                intents.post(msg.into());
            }
            Ok(Some(RemoteMsg::Hello { .. })) => {
                debug!(session = %link.session_id, "Ignoring repeated hello");
            }
            Ok(Some(RemoteMsg::Goodbye)) => break "peer said goodbye",
            Ok(None) => break "peer closed stream",
            Err(e) => {
                warn!(session = %link.session_id, error = %e, "Read failed");
                break "read failed";
            }
        }
    };
    link.disconnect(reason);
}

/// Remote end of a connection to the host
pub struct RemoteLink {
    link: Arc<Link>,
    player_index: u8,
    tick_rate: u32,
    snapshots: Arc<Mailbox<Snapshot>>,
    intents: Arc<Mailbox<Intent>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl RemoteLink {
    /// Say hello, wait for the welcome and start the I/O tasks
    pub async fn establish<S: Stream>(stream: S) -> Result<Self, NetError> {
        let session_id = Uuid::new_v4();
        let (mut rd, mut wr) = tokio::io::split(stream);

        write_frame(
            &mut wr,
            &RemoteMsg::Hello {
                protocol_version: PROTOCOL_VERSION,
            },
        )
        .await?;

        let reply = tokio::time::timeout(HANDSHAKE_TIMEOUT, read_frame::<_, HostMsg>(&mut rd))
            .await
            .map_err(|_| NetError::HandshakeFailed("no welcome before timeout".to_string()))??;
        let (player_index, tick_rate) = match reply {
            Some(HostMsg::Welcome {
                player_index,
                protocol_version,
                tick_rate,
            }) => {
                if protocol_version != PROTOCOL_VERSION {
                    return Err(NetError::VersionMismatch {
                        local: PROTOCOL_VERSION,
                        peer: protocol_version,
                    });
                }
                (player_index, tick_rate)
            }
            Some(HostMsg::Goodbye) | None => {
                return Err(NetError::HandshakeFailed("host refused the session".to_string()))
            }
            Some(HostMsg::Snapshot(_)) => {
                return Err(NetError::HandshakeFailed("snapshot before welcome".to_string()))
            }
        };
        info!(session = %session_id, player_index, tick_rate, "Joined host");

        let link = Link::new(session_id);
        let snapshots = Arc::new(Mailbox::new());
        let intents = Arc::new(Mailbox::new());

        let writer = spawn_writer(
            link.clone(),
            wr,
            intents.clone(),
            |intent: Intent| RemoteMsg::Intent(intent.into()),
            RemoteMsg::Goodbye,
        );
        let reader = tokio::spawn(remote_read_loop(link.clone(), rd, snapshots.clone()));

        Ok(Self {
            link,
            player_index,
            tick_rate,
            snapshots,
            intents,
            reader,
            writer,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.link.session_id
    }

    pub fn player_index(&self) -> u8 {
        self.player_index
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn send_intent(&self, intent: Intent) {
        if self.link.state() == ConnectionState::Connected {
            self.intents.post(intent);
        }
    }

    /// Every snapshot buffered since the previous call, folded into one
    pub fn take_snapshot(&self) -> Option<Snapshot> {
        self.snapshots.take()
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub async fn close(self) {
        close_link(&self.link, self.writer, self.reader).await;
    }
}

async fn remote_read_loop<S: Stream>(
    link: Arc<Link>,
    mut rd: ReadHalf<S>,
    snapshots: Arc<Mailbox<Snapshot>>,
) {
    let reason = loop {
        match read_frame::<_, HostMsg>(&mut rd).await {
            Ok(Some(HostMsg::Snapshot(snapshot))) => {
                snapshots.post(snapshot);
            }
            Ok(Some(HostMsg::Welcome { .. })) => {
                debug!(session = %link.session_id, "Ignoring repeated welcome");
            }
            Ok(Some(HostMsg::Goodbye)) => break "host said goodbye",
            Ok(None) => break "host closed stream",
            Err(e) => {
                warn!(session = %link.session_id, error = %e, "Read failed");
                break "read failed";
            }
        }
    };
    link.disconnect(reason);
}
