//! TCP session setup: one host, one remote

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use super::error::NetError;

/// Listening socket waiting for the single remote participant
pub struct HostListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl HostListener {
    pub async fn bind(addr: &str) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetError::TransportSetup {
                addr: addr.to_string(),
                source,
            })?;
        let addr = listener
            .local_addr()
            .map_err(|source| NetError::TransportSetup {
                addr: addr.to_string(),
                source,
            })?;
        info!(%addr, "Listening for remote player");
        Ok(Self { listener, addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accept exactly one connection; the listener is released afterwards
    pub async fn accept_one(self) -> Result<(TcpStream, SocketAddr), NetError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|source| NetError::TransportSetup {
                addr: self.addr.to_string(),
                source,
            })?;
        configure(&stream);
        info!(%peer, "Remote player connected");
        Ok((stream, peer))
    }
}

/// Connect to a host within `timeout`
pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream, NetError> {
    let attempt = tokio::time::timeout(timeout, TcpStream::connect(addr)).await;
    let stream = match attempt {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(NetError::TransportSetup {
                addr: addr.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(NetError::ConnectTimeout {
                addr: addr.to_string(),
                timeout,
            })
        }
    };
    configure(&stream);
    info!(addr, "Connected to host");
    Ok(stream)
}

fn configure(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(error = %e, "Failed to set TCP_NODELAY");
    }
}
