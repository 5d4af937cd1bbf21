//! The daemon: accept loop, signal handling, and orderly shutdown.
//!
//! All process-wide state (the listening socket and the store connection)
//! lives in one [`Daemon`] value. It is created at startup, owned by the
//! accept loop, and consumed by shutdown, so teardown happens exactly once.

use std::future::Future;

use cookied_store::{SessionConnectionManager, SqliteConnector, StoreConnector};
use cookied_transport::{Transport, TransportError, UnixSocketTransport};
use tokio::signal::unix::{SignalKind, signal};

use crate::CookiedError;
use crate::config::DaemonSettings;
use crate::handler::handle_connection;

/// A running cookie daemon.
///
/// # Example
///
/// ```rust,ignore
/// let settings = Config::load(path)?.daemon_settings()?;
/// let daemon = Daemon::start(settings).await?;
/// daemon.run().await
/// ```
pub struct Daemon<T: Transport, C: StoreConnector> {
    transport: T,
    store: SessionConnectionManager<C>,
}

impl Daemon<UnixSocketTransport, SqliteConnector> {
    /// Binds the socket, then connects to the store.
    ///
    /// # Errors
    /// Either step failing is fatal: there is no degraded mode to fall back
    /// to.
    pub async fn start(settings: DaemonSettings) -> Result<Self, CookiedError> {
        let transport = UnixSocketTransport::bind(&settings.socket_path, settings.transport).await?;
        let store = SessionConnectionManager::connect(SqliteConnector, settings.store)?;
        Ok(Self::new(transport, store))
    }
}

impl<T, C> Daemon<T, C>
where
    T: Transport<Error = TransportError>,
    C: StoreConnector,
{
    /// Wraps an already bound transport and connected store.
    pub fn new(transport: T, store: SessionConnectionManager<C>) -> Self {
        Self { transport, store }
    }

    /// Serves until SIGHUP, SIGINT, or SIGTERM, then shuts down.
    ///
    /// # Errors
    /// Returns [`CookiedError::Signal`] if the handlers can't be installed,
    /// or any error from shutdown.
    pub async fn run(self) -> Result<(), CookiedError> {
        let signals = shutdown_signal().map_err(CookiedError::Signal)?;
        self.run_until(signals).await
    }

    /// Serves until `shutdown` completes, then shuts down.
    ///
    /// Connections are handled one at a time. A shutdown request that
    /// arrives mid-connection takes effect once that connection is done.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), CookiedError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("cookie daemon running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => break,

                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => handle_connection(conn, &mut self.store).await,
                    Err(e) if e.is_per_connection() => {
                        tracing::error!(error = %e, "accept failed");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "listener gone, stopping");
                        break;
                    }
                },
            }
        }

        self.shutdown().await
    }

    /// Closes the listener, removes its path, and releases the store.
    async fn shutdown(mut self) -> Result<(), CookiedError> {
        tracing::info!("cookie daemon shutting down");
        let result = self.transport.shutdown().await;
        self.store.close();
        result?;
        Ok(())
    }
}

/// Resolves on the first SIGHUP, SIGINT, or SIGTERM.
///
/// The handlers are installed before this returns, so a signal that
/// arrives before the future is first polled is not lost.
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        let name = tokio::select! {
            _ = hangup.recv() => "SIGHUP",
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
        };
        tracing::info!(signal = name, "shutdown signal received");
    })
}
