//! Integration tests for the signature engine against fixed key files.
//!
//! The fixtures are throwaway RSA-2048 key pairs with self-signed
//! certificates. `alice_signature.hex` was produced by the OpenSSL command
//! line tool:
//!
//! ```text
//! printf 'alice::0::10.0.0.1::1::abcd' \
//!     | openssl dgst -sha1 -sign signer_key.pem | xxd -p -u
//! ```
//!
//! so matching it byte for byte proves the signer stays compatible with
//! cookies minted by the existing tooling.

use std::path::PathBuf;

use cookied_crypto::{CryptoError, Signer, Verifier};
use cookied_protocol::{SignedToken, Token, hex};
use proptest::prelude::*;

const ALICE: &str = "alice::0::10.0.0.1::1::abcd";

// =========================================================================
// Helpers
// =========================================================================

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn openssl_signature() -> String {
    std::fs::read_to_string(fixture("alice_signature.hex"))
        .expect("fixture readable")
        .trim()
        .to_string()
}

fn alice() -> Token {
    Token::new("alice", "0", "10.0.0.1", "1", "abcd").unwrap()
}

// =========================================================================
// Compatibility with existing signers
// =========================================================================

#[test]
fn test_sign_matches_openssl_output() {
    let mut signer = Signer::new(fixture("signer_key.pem"));
    let signed = signer.sign_token(&alice()).expect("should sign");
    assert_eq!(signed.token(), ALICE);
    assert_eq!(signed.signature(), openssl_signature());
}

#[test]
fn test_verify_accepts_openssl_signature() {
    let mut verifier = Verifier::new(fixture("signer_cert.pem"));
    let signed = SignedToken::new(ALICE, openssl_signature());
    verifier.verify_signed(&signed).expect("should verify");
}

#[test]
fn test_hex_signature_fits_transport_bound() {
    let sig = openssl_signature();
    assert_eq!(sig.len(), 512);
    assert!(sig.len() <= cookied_protocol::MAX_HEX_SIGNATURE_LEN);
}

// =========================================================================
// Scenario: sign then verify against matching and foreign keys
// =========================================================================

#[test]
fn test_signed_cookie_verifies_with_matching_certificate() {
    let mut signer = Signer::new(fixture("signer_key.pem"));
    let mut verifier = Verifier::new(fixture("signer_cert.pem"));

    let text = signer.sign_token(&alice()).unwrap().build();
    let parsed = SignedToken::parse(&text).unwrap();

    assert!(verifier.verify_signed(&parsed).is_ok());
    assert_eq!(parsed.parse_token().unwrap(), alice());
}

#[test]
fn test_signed_cookie_fails_with_other_certificate() {
    let mut signer = Signer::new(fixture("signer_key.pem"));
    let mut verifier = Verifier::new(fixture("other_cert.pem"));

    let signed = signer.sign_token(&alice()).unwrap();
    let result = verifier.verify_signed(&signed);

    assert!(matches!(result, Err(CryptoError::VerificationFailed(_))));
}

#[test]
fn test_pkcs8_key_signs_for_its_certificate() {
    let mut signer = Signer::new(fixture("other_key.pem"));
    let mut verifier = Verifier::new(fixture("other_cert.pem"));

    let signed = signer.sign_token(&alice()).unwrap();
    assert!(verifier.verify_signed(&signed).is_ok());
}

#[test]
fn test_missing_certificate_is_a_key_error() {
    let mut verifier = Verifier::new(fixture("missing_cert.pem"));
    let signed = SignedToken::new(ALICE, openssl_signature());
    let err = verifier.verify_signed(&signed).unwrap_err();
    assert!(err.is_key_error(), "expected key error, got {err}");
}

// =========================================================================
// No false accepts
// =========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_single_bit_flip_is_rejected(bit in 0usize..2048) {
        let mut verifier = Verifier::new(fixture("signer_cert.pem"));
        let mut sig = hex::decode(&openssl_signature()).unwrap();
        sig[bit / 8] ^= 1 << (bit % 8);

        let result = verifier.verify(ALICE.as_bytes(), &sig);
        prop_assert!(matches!(result, Err(CryptoError::VerificationFailed(_))));
    }

    #[test]
    fn prop_sign_then_verify(message in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut signer = Signer::new(fixture("signer_key.pem"));
        let mut verifier = Verifier::new(fixture("signer_cert.pem"));
        let sig = signer.sign(&message).unwrap();
        prop_assert!(verifier.verify(&message, &sig).is_ok());
    }
}
