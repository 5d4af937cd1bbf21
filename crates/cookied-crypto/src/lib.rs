//! Cookie signing and verification for cookied.
//!
//! Signatures are RSASSA-PKCS1-v1_5 over a SHA-1 digest of the token text,
//! the scheme the deployed verifiers already accept. Signatures travel as
//! uppercase hex (see [`cookied_protocol::hex`]).
//!
//! Two layers:
//!
//! 1. **Primitives**: [`sign`] and [`verify`] take an already-parsed key.
//! 2. **File-backed**: [`Signer`] and [`Verifier`] load their key from a
//!    PEM file on every call through a [`KeyFile`], which only re-parses
//!    when the file changes on disk.

mod engine;
mod error;
mod keys;

pub use engine::{Signer, Verifier, sign, verify};
pub use error::CryptoError;
pub use keys::{KeyFile, PemKey};

/// Re-exported so callers can name key types without depending on `rsa`.
pub use rsa::{RsaPrivateKey, RsaPublicKey};
