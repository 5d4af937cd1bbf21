//! # cookied
//!
//! Signed session cookies checked against a session store.
//!
//! The pieces, bottom up:
//!
//! ```text
//! cookied-protocol   token and signed-token text, hex
//! cookied-crypto     RSA signatures over token text
//! cookied-store      the one long-lived session store connection
//! cookied-transport  the local socket
//! cookied            config, the daemon loop, the CLI tools (this crate)
//! ```
//!
//! The daemon answers one question per connection: given a token, how
//! many seconds does its session have left? `0` means "not valid".

pub mod cli;
pub mod config;
mod error;
pub mod handler;
pub mod logging;
mod server;
pub mod tools;

pub use config::{Config, ConfigError};
pub use error::{CookiedError, ExitStatus};
pub use server::Daemon;

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use crate::config::{Config, DaemonSettings, SignerSettings, VerifierSettings};
    pub use crate::{CookiedError, Daemon, ExitStatus};
    pub use cookied_protocol::{SignedToken, Token};
    pub use cookied_store::{SessionConnectionManager, SqliteConnector, StoreCredentials};
    pub use cookied_transport::{TransportConfig, UnixSocketTransport};
}
