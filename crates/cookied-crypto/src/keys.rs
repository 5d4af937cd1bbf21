//! Loading keys from PEM files.
//!
//! Keys live on disk and may be rotated while the tools run, so a
//! [`KeyFile`] never trusts a parsed key longer than the file it came from:
//! every [`KeyFile::load`] re-stats the file and re-parses it if the
//! modification time or length changed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use x509_cert::Certificate;
use x509_cert::der::{DecodePem, Encode};

use crate::CryptoError;

const PRE_BOUNDARY: &str = "-----BEGIN ";
const BOUNDARY_END: &str = "-----";
const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Cuts the first PEM block out of `text`, boundaries included, and
/// returns it with its label. Anything before or after the block is
/// ignored, as OpenSSL does.
fn pem_block(text: &str) -> Result<(&str, &str), String> {
    let start = text
        .find(PRE_BOUNDARY)
        .ok_or_else(|| "no PEM block found".to_string())?;
    let block = &text[start..];
    let label_start = PRE_BOUNDARY.len();
    let label_len = block[label_start..]
        .find(BOUNDARY_END)
        .ok_or_else(|| "unterminated PEM header".to_string())?;
    let label = &block[label_start..label_start + label_len];

    let post = format!("-----END {label}-----");
    let end = block
        .find(&post)
        .ok_or_else(|| format!("missing end of {label} block"))?;
    Ok((label, &block[..end + post.len()]))
}

// ---------------------------------------------------------------------------
// PemKey
// ---------------------------------------------------------------------------

/// A key type that can be parsed from PEM text.
pub trait PemKey: Sized {
    /// Parses the key from the first PEM block in `text`, returning a
    /// human-readable reason on failure.
    fn from_pem(text: &str) -> Result<Self, String>;
}

/// Accepts PKCS#8 (`PRIVATE KEY`) and PKCS#1 (`RSA PRIVATE KEY`).
impl PemKey for RsaPrivateKey {
    fn from_pem(text: &str) -> Result<Self, String> {
        let (_, pem) = pem_block(text)?;
        RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| format!("not an RSA private key: {e}"))
    }
}

/// Accepts an X.509 certificate, a SubjectPublicKeyInfo (`PUBLIC KEY`), or
/// a PKCS#1 `RSA PUBLIC KEY`.
impl PemKey for RsaPublicKey {
    fn from_pem(text: &str) -> Result<Self, String> {
        let (label, pem) = pem_block(text)?;
        if label == CERTIFICATE_LABEL {
            let cert = Certificate::from_pem(pem.as_bytes())
                .map_err(|e| format!("bad certificate: {e}"))?;
            let spki = cert
                .tbs_certificate
                .subject_public_key_info
                .to_der()
                .map_err(|e| format!("bad certificate key info: {e}"))?;
            return RsaPublicKey::from_public_key_der(&spki)
                .map_err(|e| format!("certificate key is not RSA: {e}"));
        }

        RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map_err(|e| format!("not an RSA public key: {e}"))
    }
}

// ---------------------------------------------------------------------------
// KeyFile
// ---------------------------------------------------------------------------

/// File identity used to decide whether a cached key is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

/// A PEM key on disk with a parsed copy cached in memory.
#[derive(Debug)]
pub struct KeyFile<K> {
    path: PathBuf,
    cached: Option<(Fingerprint, K)>,
}

impl<K: PemKey> KeyFile<K> {
    /// Creates a handle for the key at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    /// The file this handle reads from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the key, reading the file only if it changed since the
    /// last successful load.
    ///
    /// # Errors
    /// Returns [`CryptoError::KeyUnreadable`] if the file is missing,
    /// unreadable, or does not hold a key of type `K`. A failed load also
    /// drops any previously cached key.
    pub fn load(&mut self) -> Result<&K, CryptoError> {
        let fingerprint = match self.fingerprint() {
            Ok(fp) => fp,
            Err(e) => {
                self.cached = None;
                return Err(e);
            }
        };

        let fresh = matches!(&self.cached, Some((fp, _)) if *fp == fingerprint);
        if !fresh {
            self.cached = None;
            let pem = fs::read_to_string(&self.path)
                .map_err(|e| self.unreadable(e.to_string()))?;
            let key = K::from_pem(&pem).map_err(|reason| self.unreadable(reason))?;
            tracing::debug!(path = %self.path.display(), "loaded key file");
            self.cached = Some((fingerprint, key));
        }

        match &self.cached {
            Some((_, key)) => Ok(key),
            None => Err(self.unreadable("key cache empty after load".into())),
        }
    }

    fn fingerprint(&self) -> Result<Fingerprint, CryptoError> {
        let meta = fs::metadata(&self.path)
            .map_err(|e| self.unreadable(e.to_string()))?;
        Ok(Fingerprint {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }

    fn unreadable(&self, reason: String) -> CryptoError {
        CryptoError::KeyUnreadable {
            path: self.path.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

    fn fixture(name: &str) -> PathBuf {
        Path::new(FIXTURES).join(name)
    }

    #[test]
    fn test_private_key_pkcs1_pem_parses() {
        let mut file = KeyFile::<RsaPrivateKey>::new(fixture("signer_key.pem"));
        assert!(file.load().is_ok());
    }

    #[test]
    fn test_private_key_pkcs8_pem_parses() {
        let mut file = KeyFile::<RsaPrivateKey>::new(fixture("other_key.pem"));
        assert!(file.load().is_ok());
    }

    #[test]
    fn test_public_key_from_certificate_parses() {
        let mut file = KeyFile::<RsaPublicKey>::new(fixture("signer_cert.pem"));
        assert!(file.load().is_ok());
    }

    #[test]
    fn test_certificate_key_matches_private_key() {
        let mut private = KeyFile::<RsaPrivateKey>::new(fixture("signer_key.pem"));
        let mut public = KeyFile::<RsaPublicKey>::new(fixture("signer_cert.pem"));
        let derived = private.load().unwrap().to_public_key();
        assert_eq!(&derived, public.load().unwrap());
    }

    #[test]
    fn test_pem_block_ignores_surrounding_text() {
        let text = "# signer\n\n-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n\n\n";
        let (label, block) = pem_block(text).unwrap();
        assert_eq!(label, "CERTIFICATE");
        assert_eq!(block, "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----");
    }

    #[test]
    fn test_pem_block_without_end_fails() {
        assert!(pem_block("-----BEGIN CERTIFICATE-----\nAAAA\n").is_err());
        assert!(pem_block("no pem here").is_err());
    }

    #[test]
    fn test_load_keys_with_extra_blank_lines_parse() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["signer_cert.pem", "signer_key.pem", "other_key.pem"] {
            let pem = fs::read_to_string(fixture(name)).unwrap();
            let path = dir.path().join(name);
            fs::write(&path, format!("\n{pem}\n\n")).unwrap();

            if name.contains("cert") {
                assert!(KeyFile::<RsaPublicKey>::new(&path).load().is_ok(), "{name}");
            } else {
                assert!(KeyFile::<RsaPrivateKey>::new(&path).load().is_ok(), "{name}");
            }
        }
    }

    #[test]
    fn test_load_spki_public_key_with_trailing_newline_parses() {
        use rsa::pkcs8::{EncodePublicKey, LineEnding};

        let mut private = KeyFile::<RsaPrivateKey>::new(fixture("signer_key.pem"));
        let public = private.load().unwrap().to_public_key();
        let pem = public.to_public_key_pem(LineEnding::LF).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signer.pub");
        fs::write(&path, format!("{pem}\n")).unwrap();

        let mut file = KeyFile::<RsaPublicKey>::new(&path);
        assert_eq!(file.load().unwrap(), &public);
    }

    #[test]
    fn test_load_missing_file_returns_key_unreadable() {
        let mut file = KeyFile::<RsaPrivateKey>::new("/nonexistent/key.pem");
        let err = file.load().unwrap_err();
        assert!(err.is_key_error());
    }

    #[test]
    fn test_load_certificate_as_private_key_returns_key_unreadable() {
        let mut file = KeyFile::<RsaPrivateKey>::new(fixture("signer_cert.pem"));
        assert!(matches!(
            file.load(),
            Err(CryptoError::KeyUnreadable { .. })
        ));
    }

    #[test]
    fn test_load_rereads_file_after_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pem");
        fs::copy(fixture("signer_cert.pem"), &path).unwrap();

        let mut file = KeyFile::<RsaPublicKey>::new(&path);
        let first = file.load().unwrap().clone();

        // Swap in a different certificate; the length differs or the
        // mtime moves, either of which invalidates the cache.
        let other = fs::read_to_string(fixture("other_cert.pem")).unwrap();
        fs::write(&path, format!("{other}\n")).unwrap();

        let second = file.load().unwrap().clone();
        assert_ne!(first, second, "stale key served after file changed");
    }

    #[test]
    fn test_load_after_file_removed_drops_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cert.pem");
        fs::copy(fixture("signer_cert.pem"), &path).unwrap();

        let mut file = KeyFile::<RsaPublicKey>::new(&path);
        assert!(file.load().is_ok());

        fs::remove_file(&path).unwrap();
        assert!(file.load().is_err());
    }
}
