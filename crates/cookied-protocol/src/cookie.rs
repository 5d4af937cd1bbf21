//! Cookie text: building and parsing tokens and signed tokens.
//!
//! A token is five fields joined with `::`:
//!
//! ```text
//! userID::dukeFlag::clientIP::cookieVersion::clientID
//! ```
//!
//! A signed token appends `:::` and the hex signature of the token text:
//!
//! ```text
//! alice::0::10.0.0.1::1::abcd:::3F09...
//! ```
//!
//! Fields are never empty and never contain `:`. That keeps the two
//! delimiters unambiguous: a token neither contains `:::` nor ends in `:`,
//! so the first `:::` in a signed token always marks where the signature
//! starts.

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Limits and delimiters
// ---------------------------------------------------------------------------

/// Separates the five fields of a token.
pub const FIELD_DELIMITER: &str = "::";

/// Separates a token from its signature.
pub const SIGNATURE_DELIMITER: &str = ":::";

/// Maximum length of the user ID field.
pub const MAX_USER_ID_LEN: usize = 12;
/// Maximum length of the duke flag field.
pub const MAX_DUKE_FLAG_LEN: usize = 1;
/// Maximum length of the client IP field (dotted quad).
pub const MAX_CLIENT_IP_LEN: usize = 15;
/// Maximum length of the cookie version field.
pub const MAX_COOKIE_VERSION_LEN: usize = 1;
/// Maximum length of the client ID field.
pub const MAX_CLIENT_ID_LEN: usize = 4;

/// Upper bound on rendered token text.
///
/// The fields and delimiters add up to 41 bytes; 50 leaves headroom.
pub const MAX_TOKEN_LEN: usize = 50;

/// Upper bound on hex signature text (2048-bit key).
pub const MAX_HEX_SIGNATURE_LEN: usize = 640;

/// Upper bound on a complete signed token.
pub const MAX_SIGNED_TOKEN_LEN: usize =
    MAX_TOKEN_LEN + SIGNATURE_DELIMITER.len() + MAX_HEX_SIGNATURE_LEN;

// ---------------------------------------------------------------------------
// TokenField
// ---------------------------------------------------------------------------

/// Names one of the five token fields, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenField {
    UserId,
    DukeFlag,
    ClientIp,
    CookieVersion,
    ClientId,
}

impl TokenField {
    /// All fields in the order they appear on the wire.
    pub const ALL: [TokenField; 5] = [
        Self::UserId,
        Self::DukeFlag,
        Self::ClientIp,
        Self::CookieVersion,
        Self::ClientId,
    ];

    /// Maximum length of this field in bytes.
    pub fn max_len(self) -> usize {
        match self {
            Self::UserId => MAX_USER_ID_LEN,
            Self::DukeFlag => MAX_DUKE_FLAG_LEN,
            Self::ClientIp => MAX_CLIENT_IP_LEN,
            Self::CookieVersion => MAX_COOKIE_VERSION_LEN,
            Self::ClientId => MAX_CLIENT_ID_LEN,
        }
    }

    /// Checks a candidate value against this field's rules.
    fn validate(self, value: &str) -> Result<(), ProtocolError> {
        if value.is_empty() {
            return Err(ProtocolError::EmptyField(self));
        }
        if value.len() > self.max_len() {
            return Err(ProtocolError::FieldTooLong {
                field: self,
                len: value.len(),
                max: self.max_len(),
            });
        }
        if value.contains(':') {
            return Err(ProtocolError::MalformedToken(format!(
                "{self} contains ':'"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TokenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UserId => "userID",
            Self::DukeFlag => "dukeFlag",
            Self::ClientIp => "clientIP",
            Self::CookieVersion => "cookieVersion",
            Self::ClientId => "clientID",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// The unsigned identity/session fields of a cookie.
///
/// Fields are private and only reachable through [`Token::new`] or
/// [`Token::parse`], both of which enforce the length limits. Any `Token`
/// value therefore renders to at most [`MAX_TOKEN_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    user_id: String,
    duke_flag: String,
    client_ip: String,
    cookie_version: String,
    client_id: String,
}

impl Token {
    /// Builds a token from its five fields.
    ///
    /// # Errors
    /// - [`ProtocolError::EmptyField`] if a field is empty
    /// - [`ProtocolError::FieldTooLong`] if a field exceeds its limit
    /// - [`ProtocolError::MalformedToken`] if a field contains `:`
    pub fn new(
        user_id: impl Into<String>,
        duke_flag: impl Into<String>,
        client_ip: impl Into<String>,
        cookie_version: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let token = Self {
            user_id: user_id.into(),
            duke_flag: duke_flag.into(),
            client_ip: client_ip.into(),
            cookie_version: cookie_version.into(),
            client_id: client_id.into(),
        };
        for (field, value) in TokenField::ALL.into_iter().zip(token.fields()) {
            field.validate(value)?;
        }
        Ok(token)
    }

    /// Parses token text received from a client.
    ///
    /// The text must split into exactly five `::`-separated fields, each
    /// within its length limit. Nothing partial is returned on failure.
    ///
    /// # Errors
    /// - [`ProtocolError::MalformedToken`] on the wrong number of fields
    /// - [`ProtocolError::EmptyField`] if any field is empty
    /// - [`ProtocolError::FieldTooLong`] if any field is oversized
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let parts: Vec<&str> = text.split(FIELD_DELIMITER).collect();
        let [user_id, duke_flag, client_ip, cookie_version, client_id] =
            parts.as_slice()
        else {
            return Err(ProtocolError::MalformedToken(format!(
                "expected 5 fields, found {}",
                parts.len()
            )));
        };
        Self::new(*user_id, *duke_flag, *client_ip, *cookie_version, *client_id)
    }

    /// Renders the token as wire text.
    pub fn build(&self) -> String {
        self.fields().join(FIELD_DELIMITER)
    }

    /// The five field values in wire order.
    pub fn fields(&self) -> [&str; 5] {
        [
            &self.user_id,
            &self.duke_flag,
            &self.client_ip,
            &self.cookie_version,
            &self.client_id,
        ]
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn duke_flag(&self) -> &str {
        &self.duke_flag
    }

    /// Whether the duke flag is set (`"1"`).
    pub fn is_duke(&self) -> bool {
        self.duke_flag == "1"
    }

    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    pub fn cookie_version(&self) -> &str {
        &self.cookie_version
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

// ---------------------------------------------------------------------------
// SignedToken
// ---------------------------------------------------------------------------

/// Token text paired with its hex signature.
///
/// The token part is kept as the exact text that was signed. Verifiers
/// check the signature over these bytes and only parse the fields if they
/// need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    token: String,
    signature: String,
}

impl SignedToken {
    /// Pairs token text with a hex signature.
    pub fn new(token: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            signature: signature.into(),
        }
    }

    /// Splits signed token text at the first `:::`.
    ///
    /// Everything after the delimiter is taken verbatim as the signature,
    /// even if it contains more colons.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedSignedToken`] if there is no `:::`.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let (token, signature) = text
            .split_once(SIGNATURE_DELIMITER)
            .ok_or(ProtocolError::MalformedSignedToken)?;
        Ok(Self::new(token, signature))
    }

    /// Renders `token:::signature`.
    pub fn build(&self) -> String {
        let mut out = String::with_capacity(
            self.token.len() + SIGNATURE_DELIMITER.len() + self.signature.len(),
        );
        out.push_str(&self.token);
        out.push_str(SIGNATURE_DELIMITER);
        out.push_str(&self.signature);
        out
    }

    /// The signed token text.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The hex signature text.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Parses the token part into fields.
    ///
    /// # Errors
    /// Same as [`Token::parse`].
    pub fn parse_token(&self) -> Result<Token, ProtocolError> {
        Token::parse(&self.token)
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

// =========================================================================
// Tests
// =========================================================================
