//! Runtime drivers for each role

pub mod host;
pub mod remote;

pub use host::HostSession;
pub use remote::RemoteSession;
