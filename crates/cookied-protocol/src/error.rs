//! Error types for the protocol layer.
//!
//! Every variant here is a client input error: the daemon answers `"0"`
//! and the CLI tools exit with the "user" status. None of them are
//! retried.

use crate::TokenField;

/// Errors that can occur while building or parsing cookie text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The token text did not split into exactly five `::`-separated fields.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// A field was empty.
    #[error("{0} is empty")]
    EmptyField(TokenField),

    /// A field exceeded its maximum length.
    ///
    /// Carries the offending field, its actual length in bytes, and the
    /// limit it broke.
    #[error("{field} is {len} bytes, limit is {max}")]
    FieldTooLong {
        field: TokenField,
        len: usize,
        max: usize,
    },

    /// The signed token text had no `:::` separator.
    #[error("malformed signed token: missing signature delimiter")]
    MalformedSignedToken,

    /// Hex text had an odd number of digits or a character outside `0-9A-F`.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
