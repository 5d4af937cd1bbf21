//! Wire format for cookied session cookies.
//!
//! This crate defines the text that travels between the cookie tools and
//! the daemon:
//!
//! - **Token** ([`Token`]): the five identity fields joined with `::`.
//! - **Signed token** ([`SignedToken`]): a token, the `:::` delimiter, and
//!   a hex signature.
//! - **Hex codec** ([`hex`]): the byte ↔ text mapping used for signatures.
//! - **Errors** ([`ProtocolError`]): what can go wrong while parsing.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets, keys, or the session
//! store. It only knows how to build and take apart cookie text.
//!
//! ```text
//! Transport (bytes) → Protocol (Token) → Store (lifetime)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod cookie;
mod error;
pub mod hex;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use cookie::{
    FIELD_DELIMITER, MAX_CLIENT_ID_LEN, MAX_CLIENT_IP_LEN,
    MAX_COOKIE_VERSION_LEN, MAX_DUKE_FLAG_LEN, MAX_HEX_SIGNATURE_LEN,
    MAX_SIGNED_TOKEN_LEN, MAX_TOKEN_LEN, MAX_USER_ID_LEN,
    SIGNATURE_DELIMITER, SignedToken, Token, TokenField,
};
pub use error::ProtocolError;
