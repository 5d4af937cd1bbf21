//! Error types for the store layer.

/// Errors that can occur while talking to the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No usable connection: connecting, preparing, or probing failed, or
    /// a business call failed mid-flight. Transient; the next call will try
    /// to reconnect.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// The store refused to open a session (unknown or disabled user,
    /// inconsistent lifetimes). A business answer, never retried.
    #[error("session insert rejected for user {0}")]
    InsertRejected(String),

    /// A raw error reported by a backend driver.
    #[error("session store backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
