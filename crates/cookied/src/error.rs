//! Unified error type and process exit statuses.

use std::process::ExitCode;

use cookied_crypto::CryptoError;
use cookied_protocol::ProtocolError;
use cookied_store::StoreError;
use cookied_transport::TransportError;

use crate::ConfigError;

/// How a cookied program ends. Scripts that wrap the tools rely on these
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Success.
    Normal = 0,
    /// Infrastructure failure or bad usage: store down, key unreadable,
    /// socket unreachable, missing arguments.
    Fatal = 1,
    /// The input itself was rejected: bad cookie, bad signature, refused
    /// session.
    User = 2,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CookiedError {
    /// Configuration could not be loaded or lacks a required key.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A socket-level error (bind, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Cookie text could not be parsed or built.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Key loading or signing failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A cookie could not be verified, either because its signature does
    /// not match or because the certificate to check it with is unusable.
    #[error("cookie not verified: {0}")]
    Unverified(#[source] CryptoError),

    /// The session store was unreachable or refused the request.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Installing the process signal handlers failed.
    #[error("cannot install signal handler: {0}")]
    Signal(#[source] std::io::Error),

    /// Command line arguments were unusable.
    #[error("{0}")]
    Usage(String),

    /// The input was well-formed but rejected (IP mismatch, oversized
    /// cookie).
    #[error("{0}")]
    Rejected(String),
}

impl CookiedError {
    /// The exit status a CLI tool reports for this error.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Protocol(_) | Self::Rejected(_) | Self::Unverified(_) => ExitStatus::User,
            Self::Crypto(CryptoError::VerificationFailed(_)) => ExitStatus::User,
            Self::Store(StoreError::InsertRejected(_)) => ExitStatus::User,
            Self::Config(_)
            | Self::Transport(_)
            | Self::Crypto(_)
            | Self::Store(_)
            | Self::Signal(_)
            | Self::Usage(_) => ExitStatus::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_codes_match_deployed_values() {
        assert_eq!(ExitStatus::Normal as u8, 0);
        assert_eq!(ExitStatus::Fatal as u8, 1);
        assert_eq!(ExitStatus::User as u8, 2);
    }

    #[test]
    fn test_from_protocol_error_is_user_status() {
        let err: CookiedError = ProtocolError::MalformedSignedToken.into();
        assert!(matches!(err, CookiedError::Protocol(_)));
        assert_eq!(err.exit_status(), ExitStatus::User);
    }

    #[test]
    fn test_verification_failure_is_user_status() {
        let err: CookiedError = CryptoError::VerificationFailed("mismatch".into()).into();
        assert_eq!(err.exit_status(), ExitStatus::User);
    }

    #[test]
    fn test_unverified_with_unreadable_certificate_is_user_status() {
        let err = CookiedError::Unverified(CryptoError::KeyUnreadable {
            path: "/etc/cookied/cert.pem".into(),
            reason: "missing".into(),
        });
        assert_eq!(err.exit_status(), ExitStatus::User);
    }

    #[test]
    fn test_signing_key_unreadable_is_fatal_status() {
        let err: CookiedError = CryptoError::KeyUnreadable {
            path: "/etc/cookied/key.pem".into(),
            reason: "missing".into(),
        }
        .into();
        assert_eq!(err.exit_status(), ExitStatus::Fatal);
    }

    #[test]
    fn test_signing_failure_is_fatal_status() {
        let err: CookiedError = CryptoError::SigningFailed("rsa".into()).into();
        assert_eq!(err.exit_status(), ExitStatus::Fatal);
    }

    #[test]
    fn test_insert_rejected_is_user_status() {
        let err: CookiedError = StoreError::InsertRejected("carol".into()).into();
        assert_eq!(err.exit_status(), ExitStatus::User);
        assert!(err.to_string().contains("carol"));
    }

    #[test]
    fn test_store_unavailable_is_fatal_status() {
        let err: CookiedError = StoreError::Unavailable("down".into()).into();
        assert_eq!(err.exit_status(), ExitStatus::Fatal);
    }

    #[test]
    fn test_missing_config_key_is_fatal_status() {
        let err: CookiedError = ConfigError::MissingKey("SOCKET_PATH").into();
        assert_eq!(err.exit_status(), ExitStatus::Fatal);
        assert!(err.to_string().contains("SOCKET_PATH"));
    }
}
