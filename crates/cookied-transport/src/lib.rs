//! Transport abstraction layer for cookied.
//!
//! Provides the [`Transport`] and [`Connection`] traits the daemon loop is
//! written against, and [`UnixSocketTransport`], the filesystem-path
//! addressed stream socket it actually serves on.
//!
//! The wire protocol has no framing: a request is whatever arrives in one
//! read, a response is written once, then the server closes. That makes
//! the read bound part of the protocol, see [`READ_BUFFER_SIZE`].

#![allow(async_fn_in_trait)]

mod error;
mod unix;

pub use error::TransportError;
pub use unix::{UnixSocketConnection, UnixSocketTransport, request};

use std::fmt;
use std::time::Duration;

/// Size of the buffer a request is read into.
pub const READ_BUFFER_SIZE: usize = 1024;

/// A read this long or longer is treated as an overflow attempt. One byte
/// of the buffer is reserved, so a read that fills it can't be told apart
/// from a truncated longer message.
pub const OVERFLOW_THRESHOLD: usize = READ_BUFFER_SIZE - 1;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Per-connection I/O limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// How long a peer may take to send its request.
    pub read_timeout: Duration,
    /// How long a peer may take to accept the response.
    pub write_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// Uses the same timeout for reads and writes.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            read_timeout: timeout,
            write_timeout: timeout,
        }
    }
}

/// What a single bounded read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The request bytes.
    Request(Vec<u8>),
    /// The peer sent at least [`OVERFLOW_THRESHOLD`] bytes. The data has
    /// been discarded.
    Overflow,
    /// The peer closed without sending anything.
    Closed,
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops accepting connections and releases the listening address.
    async fn shutdown(&mut self) -> Result<(), Self::Error>;
}

/// A single request/response exchange with a peer.
pub trait Connection: Send + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Performs the one bounded read a request gets.
    async fn recv(&mut self) -> Result<Inbound, Self::Error>;

    /// Writes the whole response.
    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Closes the connection.
    async fn close(self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).into_inner(), 7);
    }

    #[test]
    fn test_overflow_threshold_leaves_one_byte_spare() {
        assert_eq!(OVERFLOW_THRESHOLD, 1023);
        assert!(OVERFLOW_THRESHOLD < READ_BUFFER_SIZE);
    }

    #[test]
    fn test_transport_config_with_timeout_sets_both() {
        let config = TransportConfig::with_timeout(Duration::from_millis(250));
        assert_eq!(config.read_timeout, Duration::from_millis(250));
        assert_eq!(config.write_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_bind_error_is_not_per_connection() {
        let err = TransportError::BindFailed {
            path: "/run/cookied.sock".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!err.is_per_connection());
        assert!(TransportError::TimedOut("read").is_per_connection());
    }
}
