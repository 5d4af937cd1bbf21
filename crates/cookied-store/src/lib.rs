//! Session store access for cookied.
//!
//! The session store is the authority on whether a cookie is still good.
//! This crate keeps one long-lived connection to it and exposes the two
//! operations the cookie tools need:
//!
//! 1. **Check**: is this `(user, IP, client, version)` session valid, and
//!    for how many more seconds ([`SessionConnectionManager::check_session`])
//! 2. **Insert**: open a new session and learn the values to put in the
//!    cookie ([`SessionConnectionManager::insert_session`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Daemon / CLI tools (above)  ← ask for check/insert
//!     ↕
//! Store Layer (this crate)    ← owns the connection, probes and rebuilds it
//!     ↕
//! Backend (below)             ← any StoreConnector, SQLite by default
//! ```

mod error;
mod manager;
pub mod sqlite;
mod store;

pub use error::StoreError;
pub use manager::{ConnectionState, SessionConnectionManager};
pub use sqlite::SqliteConnector;
pub use store::{InsertOutcome, StoreConnection, StoreConnector, StoreCredentials};
