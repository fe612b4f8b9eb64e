//! Replication error taxonomy

use std::io;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Transport setup failed on {addr}: {source}")]
    TransportSetup {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("Stream fault: {0}")]
    StreamFault(#[from] io::Error),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Protocol version mismatch: local {local}, peer {peer}")]
    VersionMismatch { local: u32, peer: u32 },

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),
}

impl From<serde_json::Error> for NetError {
    fn from(e: serde_json::Error) -> Self {
        NetError::MalformedMessage(e.to_string())
    }
}
