//! The session connection manager: one store connection, kept alive.
//!
//! The daemon runs for weeks; the store restarts, networks blip, idle
//! connections get reaped. Rather than reconnecting on every request, the
//! manager holds a single connection and checks it with a cheap health
//! probe before each business call. When the probe fails, the old
//! connection is torn down and a fresh one is opened, prepared, and
//! probed, all inside the same request.
//!
//! # Concurrency note
//!
//! Every operation takes `&mut self`. The manager owns the only connection
//! handle and nothing else can reach it, so callers that want to share it
//! across tasks must put the whole manager behind one lock. A single
//! active connection is the invariant.

use cookied_protocol::Token;

use crate::{InsertOutcome, StoreConnection, StoreConnector, StoreCredentials, StoreError};

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Where the manager's connection is in its lifecycle.
///
/// ```text
///   Disconnected ──(ensure_connected)──→ Connecting ──(probe ok)──→ Connected
///        ↑                                    │                        │
///        └──────────(connect/prepare fails)───┘                        │
///        └───────────────(probe or business call fails)────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection handle is held.
    Disconnected,
    /// A fresh connection is being opened and prepared.
    Connecting,
    /// A handle is held and passed its last probe.
    Connected,
}

// ---------------------------------------------------------------------------
// SessionConnectionManager
// ---------------------------------------------------------------------------

/// Owns the connection to the session store.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ ensure_connected() ──→ check_session() / insert_session()
///                  │         ↑
///                  ▼         │
///             probe fails → teardown → reopen → prepare → probe
/// ```
pub struct SessionConnectionManager<C: StoreConnector> {
    connector: C,
    credentials: StoreCredentials,

    /// The live handle. `None` is the "absent" sentinel: teardown always
    /// takes the handle out before closing it, so a second failure can
    /// never close the same handle twice.
    conn: Option<C::Connection>,

    state: ConnectionState,
}

impl<C: StoreConnector> SessionConnectionManager<C> {
    /// Creates the manager and establishes the first connection.
    ///
    /// There is no degraded mode at startup: a process that cannot reach
    /// its store has nothing useful to do, so this fails outright instead
    /// of retrying.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the first connection cannot
    /// be opened, prepared, and probed.
    pub fn connect(connector: C, credentials: StoreCredentials) -> Result<Self, StoreError> {
        let mut manager = Self {
            connector,
            credentials,
            conn: None,
            state: ConnectionState::Disconnected,
        };
        manager.ensure_connected()?;
        Ok(manager)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` if a probed connection is held.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Makes sure a working connection is held.
    ///
    /// If a connection exists and answers the health probe, nothing
    /// changes. Otherwise the old handle (if any) is torn down, a new one
    /// is opened, its statements are prepared, and it is probed once.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the rebuild fails. The
    /// manager is then `Disconnected` and the next call tries again.
    pub fn ensure_connected(&mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.as_mut() {
            match conn.ping() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "store health probe failed, reconnecting");
                }
            }
        }

        self.teardown();
        self.state = ConnectionState::Connecting;

        match self.open() {
            Ok(conn) => {
                self.conn = Some(conn);
                self.state = ConnectionState::Connected;
                tracing::info!(
                    store = %self.credentials.connection_string,
                    "connected to session store"
                );
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                tracing::error!(
                    store = %self.credentials.connection_string,
                    error = %e,
                    "cannot connect to session store"
                );
                Err(StoreError::Unavailable(e.to_string()))
            }
        }
    }

    /// Checks a session and returns its remaining lifetime in seconds.
    ///
    /// Returns `0` when the store rejects the session *and* when the store
    /// cannot be reached; socket clients see one answer for both. Use
    /// [`try_check_session`](Self::try_check_session) to tell them apart.
    pub fn check_session(
        &mut self,
        user_id: &str,
        ip: &str,
        client_id: &str,
        cookie_version: &str,
    ) -> u32 {
        match self.try_check_session(user_id, ip, client_id, cookie_version) {
            Ok(lifetime) => lifetime,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "session check failed, rejecting");
                0
            }
        }
    }

    /// Like [`check_session`](Self::check_session), but reports store
    /// failures as errors instead of folding them into `0`.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if no connection could be
    /// ensured or the call failed mid-flight.
    pub fn try_check_session(
        &mut self,
        user_id: &str,
        ip: &str,
        client_id: &str,
        cookie_version: &str,
    ) -> Result<u32, StoreError> {
        self.ensure_connected()?;
        let result = match self.conn.as_mut() {
            Some(conn) => conn.check_session(user_id, ip, client_id, cookie_version),
            None => Err(StoreError::Unavailable("no connection".into())),
        };
        let lifetime = self.after_call(result)?;
        tracing::debug!(user_id, ip, lifetime, "session checked");
        Ok(lifetime)
    }

    /// Checks the session a parsed token refers to.
    pub fn check_token(&mut self, token: &Token) -> u32 {
        self.check_session(
            token.user_id(),
            token.client_ip(),
            token.client_id(),
            token.cookie_version(),
        )
    }

    /// Opens a new session and returns the values to put in its cookie.
    ///
    /// # Errors
    /// - [`StoreError::Unavailable`] if the store cannot be reached
    /// - [`StoreError::InsertRejected`] if the store refuses the session
    pub fn insert_session(
        &mut self,
        user_id: &str,
        ip: &str,
        hard_lifetime_secs: u32,
        soft_lifetime_secs: u32,
    ) -> Result<InsertOutcome, StoreError> {
        self.ensure_connected()?;
        let result = match self.conn.as_mut() {
            Some(conn) => {
                conn.insert_session(user_id, ip, hard_lifetime_secs, soft_lifetime_secs)
            }
            None => Err(StoreError::Unavailable("no connection".into())),
        };
        let outcome = self.after_call(result)?;

        if outcome.is_rejected() {
            tracing::info!(user_id, ip, "session insert rejected by store");
            return Err(StoreError::InsertRejected(user_id.to_string()));
        }
        tracing::info!(user_id, ip, client_id = %outcome.client_id, "session inserted");
        Ok(outcome)
    }

    /// Releases the connection. Equivalent to dropping the manager, but
    /// logs that it happened.
    pub fn close(mut self) {
        self.teardown();
        tracing::info!("session store connection released");
    }

    // -- Internals --------------------------------------------------------

    /// Opens, prepares, and probes a brand-new connection.
    fn open(&self) -> Result<C::Connection, StoreError> {
        let mut conn = self.connector.connect(&self.credentials)?;
        let ready = conn.prepare().and_then(|()| conn.ping());
        if let Err(e) = ready {
            if let Err(close_err) = conn.close() {
                tracing::debug!(error = %close_err, "ignoring close error on failed connection");
            }
            return Err(e);
        }
        Ok(conn)
    }

    /// A business call that fails means the connection can't be trusted:
    /// drop it so the next request rebuilds from scratch.
    fn after_call<T>(&mut self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        result.map_err(|e| {
            self.teardown();
            match e {
                StoreError::Unavailable(_) => e,
                other => StoreError::Unavailable(other.to_string()),
            }
        })
    }

    /// Closes the current handle, if any, ignoring close errors.
    fn teardown(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close() {
                tracing::debug!(error = %e, "ignoring error while closing store connection");
            }
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl<C: StoreConnector> Drop for SessionConnectionManager<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// =========================================================================
// Tests
// =========================================================================
