//! Unix domain socket transport using `tokio::net`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;

use crate::{
    Connection, ConnectionId, Inbound, OVERFLOW_THRESHOLD, READ_BUFFER_SIZE, Transport,
    TransportConfig, TransportError,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Removes a socket file, treating "already gone" as success.
fn remove_socket_file(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// UnixSocketTransport
// ---------------------------------------------------------------------------

/// A [`Transport`] listening on a filesystem path.
///
/// The path is owned by the transport: a stale file left by a previous run
/// is removed at bind time, and the file is removed again on shutdown.
pub struct UnixSocketTransport {
    path: PathBuf,
    listener: Option<UnixListener>,
    config: TransportConfig,
}

impl UnixSocketTransport {
    /// Binds a new listener at `path`.
    ///
    /// # Errors
    /// Returns [`TransportError::BindFailed`] if the stale path can't be
    /// removed or the socket can't be bound.
    pub async fn bind(
        path: impl Into<PathBuf>,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let path = path.into();
        let bind_failed = |source| TransportError::BindFailed {
            path: path.clone(),
            source,
        };

        remove_socket_file(&path).map_err(bind_failed)?;
        let listener = UnixListener::bind(&path).map_err(bind_failed)?;

        tracing::info!(path = %path.display(), "unix socket transport listening");
        Ok(Self {
            path,
            listener: Some(listener),
            config,
        })
    }

    /// The path this transport is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn release(&mut self) -> std::io::Result<()> {
        if self.listener.take().is_some() {
            remove_socket_file(&self.path)?;
            tracing::info!(path = %self.path.display(), "unix socket removed");
        }
        Ok(())
    }
}

impl Transport for UnixSocketTransport {
    type Connection = UnixSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let listener = self.listener.as_ref().ok_or(TransportError::Shutdown)?;
        let (stream, _addr) = listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, "accepted unix socket connection");

        Ok(UnixSocketConnection {
            id,
            stream,
            config: self.config,
        })
    }

    async fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.release().map_err(|source| TransportError::ShutdownFailed {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for UnixSocketTransport {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(path = %self.path.display(), error = %e, "cannot remove unix socket");
        }
    }
}

// ---------------------------------------------------------------------------
// UnixSocketConnection
// ---------------------------------------------------------------------------

/// One accepted client.
pub struct UnixSocketConnection {
    id: ConnectionId,
    stream: UnixStream,
    config: TransportConfig,
}

impl Connection for UnixSocketConnection {
    type Error = TransportError;

    async fn recv(&mut self) -> Result<Inbound, Self::Error> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let n = timeout(self.config.read_timeout, self.stream.read(&mut buf))
            .await
            .map_err(|_| TransportError::TimedOut("read"))?
            .map_err(TransportError::ReceiveFailed)?;

        if n == 0 {
            return Ok(Inbound::Closed);
        }
        if n >= OVERFLOW_THRESHOLD {
            tracing::warn!(id = %self.id, bytes = n, "request overflows read buffer");
            return Ok(Inbound::Overflow);
        }
        buf.truncate(n);
        Ok(Inbound::Request(buf))
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        timeout(self.config.write_timeout, self.stream.write_all(data))
            .await
            .map_err(|_| TransportError::TimedOut("write"))?
            .map_err(TransportError::SendFailed)
    }

    async fn close(mut self) -> Result<(), Self::Error> {
        match self.stream.shutdown().await {
            // The peer hanging up first is not our problem.
            Err(e) if e.kind() != ErrorKind::NotConnected => Err(TransportError::SendFailed(e)),
            _ => Ok(()),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------------

/// Sends one request to the socket at `path` and reads the response until
/// the server closes.
///
/// # Errors
/// - [`TransportError::ConnectFailed`] if nothing is listening
/// - [`TransportError::TimedOut`] if any step exceeds `limit`
/// - [`TransportError::SendFailed`] / [`TransportError::ReceiveFailed`]
pub async fn request(
    path: impl AsRef<Path>,
    body: &[u8],
    limit: Duration,
) -> Result<Vec<u8>, TransportError> {
    let path = path.as_ref();
    let mut stream = timeout(limit, UnixStream::connect(path))
        .await
        .map_err(|_| TransportError::TimedOut("connect"))?
        .map_err(|source| TransportError::ConnectFailed {
            path: path.to_path_buf(),
            source,
        })?;

    timeout(limit, stream.write_all(body))
        .await
        .map_err(|_| TransportError::TimedOut("write"))?
        .map_err(TransportError::SendFailed)?;

    let mut response = Vec::new();
    timeout(limit, stream.read_to_end(&mut response))
        .await
        .map_err(|_| TransportError::TimedOut("read"))?
        .map_err(TransportError::ReceiveFailed)?;

    Ok(response)
}
