//! Sign and verify: the primitives and their file-backed wrappers.

use std::path::PathBuf;

use cookied_protocol::{MAX_HEX_SIGNATURE_LEN, SignedToken, Token, hex};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer as _, Verifier as _};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;

use crate::{CryptoError, KeyFile};

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Signs `message` with `key` (PKCS#1 v1.5, SHA-1).
///
/// PKCS#1 v1.5 signing is deterministic: the same key and message always
/// produce the same bytes.
///
/// # Errors
/// Returns [`CryptoError::SigningFailed`] if the RSA operation fails.
pub fn sign(message: &[u8], key: &RsaPrivateKey) -> Result<Vec<u8>, CryptoError> {
    let signing_key = SigningKey::<Sha1>::new(key.clone());
    let signature = signing_key
        .try_sign(message)
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
    Ok(signature.to_vec())
}

/// Checks that `signature` is a valid signature of `message` under `key`.
///
/// # Errors
/// Returns [`CryptoError::VerificationFailed`] if the signature is
/// malformed or does not match.
pub fn verify(
    message: &[u8],
    signature: &[u8],
    key: &RsaPublicKey,
) -> Result<(), CryptoError> {
    let signature = Signature::try_from(signature)
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))?;
    VerifyingKey::<Sha1>::new(key.clone())
        .verify(message, &signature)
        .map_err(|_| CryptoError::VerificationFailed("signature mismatch".into()))
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Signs cookies with a private key read from a PEM file.
#[derive(Debug)]
pub struct Signer {
    key: KeyFile<RsaPrivateKey>,
}

impl Signer {
    /// Creates a signer for the private key at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            key: KeyFile::new(path),
        }
    }

    /// Signs raw message bytes.
    ///
    /// # Errors
    /// - [`CryptoError::KeyUnreadable`] if the key file cannot be loaded
    /// - [`CryptoError::SigningFailed`] if the RSA operation fails
    pub fn sign(&mut self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = self.key.load()?;
        sign(message, key)
    }

    /// Builds a token's text, signs it, and wraps both into a
    /// [`SignedToken`].
    ///
    /// # Errors
    /// Same as [`Signer::sign`].
    pub fn sign_token(&mut self, token: &Token) -> Result<SignedToken, CryptoError> {
        let text = token.build();
        let signature = self.sign(text.as_bytes())?;
        tracing::debug!(user_id = token.user_id(), "signed token");
        Ok(SignedToken::new(text, hex::encode(&signature)))
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifies cookie signatures against a public key or certificate file.
#[derive(Debug)]
pub struct Verifier {
    key: KeyFile<RsaPublicKey>,
}

impl Verifier {
    /// Creates a verifier for the certificate or public key at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            key: KeyFile::new(path),
        }
    }

    /// Verifies raw signature bytes over `message`.
    ///
    /// # Errors
    /// - [`CryptoError::KeyUnreadable`] if the key file cannot be loaded
    /// - [`CryptoError::VerificationFailed`] on a mismatch
    pub fn verify(&mut self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let key = self.key.load()?;
        verify(message, signature, key)
    }

    /// Verifies a signed token's hex signature over its token text.
    ///
    /// # Errors
    /// Same as [`Verifier::verify`]; a signature that is oversized or not
    /// valid hex is reported as [`CryptoError::VerificationFailed`].
    pub fn verify_signed(&mut self, signed: &SignedToken) -> Result<(), CryptoError> {
        let hex_sig = signed.signature();
        if hex_sig.len() > MAX_HEX_SIGNATURE_LEN {
            return Err(CryptoError::VerificationFailed(format!(
                "signature is {} hex chars, limit is {MAX_HEX_SIGNATURE_LEN}",
                hex_sig.len()
            )));
        }
        let signature = hex::decode(hex_sig)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))?;
        let result = self.verify(signed.token().as_bytes(), &signature);
        if let Err(e) = &result {
            tracing::debug!(error = %e, "signed token rejected");
        }
        result
    }
}
