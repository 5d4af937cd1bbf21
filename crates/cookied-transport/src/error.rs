use std::path::PathBuf;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The socket path could not be bound.
    #[error("cannot bind {}: {source}", path.display())]
    BindFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connecting to a listening socket failed.
    #[error("cannot connect to {}: {source}", path.display())]
    ConnectFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer did not keep up within the configured timeout.
    #[error("{0} timed out")]
    TimedOut(&'static str),

    /// The socket path could not be removed on shutdown.
    #[error("cannot remove {}: {source}", path.display())]
    ShutdownFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Returns `true` for errors that only affect one connection.
    ///
    /// The accept loop logs these and keeps going; anything else means the
    /// listening socket itself is gone.
    pub fn is_per_connection(&self) -> bool {
        !matches!(
            self,
            Self::BindFailed { .. } | Self::ShutdownFailed { .. } | Self::Shutdown
        )
    }
}
