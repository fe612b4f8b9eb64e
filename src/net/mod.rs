//! Host / remote replication over a single TCP stream

pub mod codec;
pub mod error;
pub mod mailbox;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::NetError;
pub use session::{ConnectionState, HostLink, RemoteLink};
