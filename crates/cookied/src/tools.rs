//! The cookie tools: mint a signed cookie, verify one against the daemon.
//!
//! The binaries in `src/bin` only parse arguments and map errors to exit
//! statuses; the work happens here so it can be tested end to end.

use cookied_crypto::{Signer, Verifier};
use cookied_protocol::{MAX_CLIENT_IP_LEN, MAX_SIGNED_TOKEN_LEN, MAX_USER_ID_LEN, SignedToken, Token};
use cookied_store::{SessionConnectionManager, SqliteConnector, StoreConnector};
use cookied_transport::request;

use crate::CookiedError;
use crate::config::{SignerSettings, VerifierSettings};

// ---------------------------------------------------------------------------
// sign-cookie
// ---------------------------------------------------------------------------

/// What to mint a cookie for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub user_id: String,
    pub ip: String,
    pub soft_lifetime_secs: u32,
    pub hard_lifetime_secs: u32,
}

impl SignRequest {
    /// Checks the arguments before anything touches the store.
    ///
    /// # Errors
    /// [`CookiedError::Usage`] if the user ID or IP is too long, a
    /// lifetime is zero, or the hard lifetime is shorter than the soft one.
    pub fn validate(&self) -> Result<(), CookiedError> {
        if self.user_id.is_empty() || self.user_id.len() > MAX_USER_ID_LEN {
            return Err(CookiedError::Usage(format!(
                "user ID must be 1-{MAX_USER_ID_LEN} characters"
            )));
        }
        if self.ip.is_empty() || self.ip.len() > MAX_CLIENT_IP_LEN {
            return Err(CookiedError::Usage(format!(
                "IP must be 1-{MAX_CLIENT_IP_LEN} characters"
            )));
        }
        if self.soft_lifetime_secs == 0 || self.hard_lifetime_secs == 0 {
            return Err(CookiedError::Usage("lifetimes must be positive".into()));
        }
        if self.hard_lifetime_secs < self.soft_lifetime_secs {
            return Err(CookiedError::Usage(
                "hard lifetime must be at least the soft lifetime".into(),
            ));
        }
        Ok(())
    }
}

/// Opens a session in the SQLite store and signs a cookie for it.
///
/// The request is validated before the store is opened.
///
/// # Errors
/// See [`sign_cookie_with`].
pub fn sign_cookie(
    settings: &SignerSettings,
    req: &SignRequest,
) -> Result<SignedToken, CookiedError> {
    req.validate()?;
    let store = SessionConnectionManager::connect(SqliteConnector, settings.store.clone())?;
    let mut signer = Signer::new(&settings.private_key_path);
    open_and_sign(store, &mut signer, req)
}

/// Opens a session through `store` and signs a cookie for it.
///
/// The store connection is released before signing; a slow key file
/// should not hold a session store connection open.
///
/// # Errors
/// - [`CookiedError::Usage`] for invalid arguments
/// - [`CookiedError::Store`] if the store is down or refuses the session
/// - [`CookiedError::Protocol`] if the store returns values that don't fit
///   in a cookie
/// - [`CookiedError::Crypto`] if signing fails
pub fn sign_cookie_with<C: StoreConnector>(
    store: SessionConnectionManager<C>,
    signer: &mut Signer,
    req: &SignRequest,
) -> Result<SignedToken, CookiedError> {
    req.validate()?;
    open_and_sign(store, signer, req)
}

/// Inserts the session and signs its token. `req` is already validated.
fn open_and_sign<C: StoreConnector>(
    mut store: SessionConnectionManager<C>,
    signer: &mut Signer,
    req: &SignRequest,
) -> Result<SignedToken, CookiedError> {
    let outcome = store.insert_session(
        &req.user_id,
        &req.ip,
        req.hard_lifetime_secs,
        req.soft_lifetime_secs,
    )?;
    store.close();

    let token = Token::new(
        &req.user_id,
        &outcome.duke_flag,
        &req.ip,
        &outcome.cookie_version,
        &outcome.client_id,
    )?;
    let signed = signer.sign_token(&token)?;
    tracing::info!(user_id = %req.user_id, ip = %req.ip, "cookie signed");
    Ok(signed)
}

// ---------------------------------------------------------------------------
// verify-cookie
// ---------------------------------------------------------------------------

/// Verifies a signed cookie and asks the daemon how long it has left.
///
/// Returns the daemon's response text (a decimal lifetime, `"0"` when the
/// session is not valid).
///
/// # Errors
/// - [`CookiedError::Rejected`] if the text is oversized or `expected_ip`
///   doesn't match the cookie
/// - [`CookiedError::Protocol`] if the cookie can't be parsed
/// - [`CookiedError::Unverified`] if its signature doesn't verify or the
///   certificate can't be loaded
/// - [`CookiedError::Transport`] if the daemon can't be reached
pub async fn verify_cookie(
    settings: &VerifierSettings,
    signed_text: &str,
    expected_ip: Option<&str>,
) -> Result<String, CookiedError> {
    if signed_text.len() > MAX_SIGNED_TOKEN_LEN {
        return Err(CookiedError::Rejected(format!(
            "signed cookie is {} characters, limit is {MAX_SIGNED_TOKEN_LEN}",
            signed_text.len()
        )));
    }

    let signed = SignedToken::parse(signed_text)?;
    Verifier::new(&settings.cert_path)
        .verify_signed(&signed)
        .map_err(|e| {
            if e.is_key_error() {
                tracing::error!(error = %e, "certificate unusable, cookie not verified");
            } else {
                tracing::warn!(error = %e, "cookie signature rejected");
            }
            CookiedError::Unverified(e)
        })?;

    if let Some(ip) = expected_ip {
        let token = signed.parse_token()?;
        if token.client_ip() != ip {
            return Err(CookiedError::Rejected(format!(
                "cookie was issued to {}, not {ip}",
                token.client_ip()
            )));
        }
    }

    let response = request(&settings.socket_path, signed.token().as_bytes(), settings.timeout).await?;
    if response.is_empty() {
        return Err(CookiedError::Transport(
            cookied_transport::TransportError::ReceiveFailed(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "daemon closed the connection without answering",
            )),
        ));
    }
    Ok(String::from_utf8_lossy(&response).into_owned())
}
