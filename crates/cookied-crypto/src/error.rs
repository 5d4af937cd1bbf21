//! Error types for the signature engine.

use std::path::PathBuf;

/// Errors from loading keys, signing, or verifying.
///
/// Key problems are kept apart from signature problems so logs can tell
/// "the certificate file is broken" from "someone tampered with a cookie",
/// even though callers reject the cookie either way.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The key or certificate file could not be read or parsed.
    #[error("cannot load key from {}: {reason}", path.display())]
    KeyUnreadable { path: PathBuf, reason: String },

    /// The signing primitive reported a failure.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The signature does not match the message under this public key.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),
}

impl CryptoError {
    /// Returns `true` if the failure came from key material rather than
    /// from the signature itself.
    pub fn is_key_error(&self) -> bool {
        matches!(self, Self::KeyUnreadable { .. })
    }
}
