//! The session store contract.
//!
//! cookied doesn't implement session policy itself. Whether a user is
//! enabled, how long a session may live, and when it slides forward are
//! all the store's business. The store is reached through two traits:
//!
//! - [`StoreConnector`] opens connections from [`StoreCredentials`].
//! - [`StoreConnection`] is one open connection: it can prepare its
//!   statements, answer a health probe, and run the two business calls.
//!
//! The [`SessionConnectionManager`](crate::SessionConnectionManager) is
//! generic over the connector, so tests swap in fakes and deployments can
//! add backends without touching the daemon.

use std::fmt;
use std::time::Duration;

use crate::StoreError;

// ---------------------------------------------------------------------------
// StoreCredentials
// ---------------------------------------------------------------------------

/// Everything a connector needs to open a connection.
#[derive(Clone)]
pub struct StoreCredentials {
    /// Backend-specific address (a database path for SQLite).
    pub connection_string: String,

    /// Login user, for backends that have one.
    pub user: Option<String>,

    /// Login password, for backends that have one.
    pub password: Option<String>,

    /// Upper bound on a single store round-trip.
    pub timeout: Duration,
}

impl StoreCredentials {
    /// Credentials with no login and the default 5 second timeout.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            user: None,
            password: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Hand-written so the password never reaches a log line.
impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("connection_string", &self.connection_string)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// InsertOutcome
// ---------------------------------------------------------------------------

/// What the store hands back after opening a session.
///
/// These three values go straight into the cookie. An empty `duke_flag`
/// is the store's way of saying "rejected".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsertOutcome {
    pub duke_flag: String,
    pub cookie_version: String,
    pub client_id: String,
}

impl InsertOutcome {
    /// The outcome a store reports when it refuses the insert.
    pub fn rejected() -> Self {
        Self::default()
    }

    /// Returns `true` if the store refused the insert.
    pub fn is_rejected(&self) -> bool {
        self.duke_flag.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Opens connections to a session store.
pub trait StoreConnector {
    /// The connection type this connector produces.
    type Connection: StoreConnection;

    /// Opens a fresh connection. Statements are not prepared yet.
    fn connect(
        &self,
        credentials: &StoreCredentials,
    ) -> Result<Self::Connection, StoreError>;
}

/// One open connection to a session store.
pub trait StoreConnection {
    /// Compiles the business statements so later calls can't fail on
    /// missing schema.
    fn prepare(&mut self) -> Result<(), StoreError>;

    /// A trivial round-trip proving the connection still works.
    fn ping(&mut self) -> Result<(), StoreError>;

    /// Validates a session and returns its remaining lifetime in seconds.
    /// `0` means the store rejects the session.
    fn check_session(
        &mut self,
        user_id: &str,
        ip: &str,
        client_id: &str,
        cookie_version: &str,
    ) -> Result<u32, StoreError>;

    /// Opens a session. A rejected insert is reported as
    /// [`InsertOutcome::rejected`], not as an error.
    fn insert_session(
        &mut self,
        user_id: &str,
        ip: &str,
        hard_lifetime_secs: u32,
        soft_lifetime_secs: u32,
    ) -> Result<InsertOutcome, StoreError>;

    /// Releases the connection.
    fn close(self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_masks_password() {
        let mut creds = StoreCredentials::new("/var/lib/cookied/sessions.db");
        creds.password = Some("hunter2".into());
        let text = format!("{creds:?}");
        assert!(!text.contains("hunter2"));
        assert!(text.contains("****"));
    }

    #[test]
    fn test_insert_outcome_empty_duke_flag_is_rejected() {
        assert!(InsertOutcome::rejected().is_rejected());
        let ok = InsertOutcome {
            duke_flag: "0".into(),
            cookie_version: "1".into(),
            client_id: "ab12".into(),
        };
        assert!(!ok.is_rejected());
    }
}
