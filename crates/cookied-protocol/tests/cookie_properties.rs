//! Property tests for the cookie text format and hex codec.
//!
//! These check the round-trip laws over generated inputs instead of a
//! handful of hand-picked examples.

use cookied_protocol::{SignedToken, Token, hex};
use proptest::prelude::*;

// =========================================================================
// Strategies
// =========================================================================

/// Non-empty field text without colons, bounded by `max` bytes.
fn field(max: usize) -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("[A-Za-z0-9._-]{{1,{max}}}"))
        .expect("valid regex")
}

fn token() -> impl Strategy<Value = Token> {
    (field(12), field(1), field(15), field(1), field(4)).prop_map(
        |(user, duke, ip, version, client)| {
            Token::new(user, duke, ip, version, client)
                .expect("generated fields are within limits")
        },
    )
}

// =========================================================================
// Properties
// =========================================================================

proptest! {
    #[test]
    fn prop_hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let text = hex::encode(&bytes);
        prop_assert_eq!(hex::decode(&text).unwrap(), bytes);
    }

    #[test]
    fn prop_hex_output_is_even_uppercase(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let text = hex::encode(&bytes);
        prop_assert_eq!(text.len(), bytes.len() * 2);
        prop_assert!(text.bytes().all(|c| c.is_ascii_digit() || (b'A'..=b'F').contains(&c)));
    }

    #[test]
    fn prop_token_round_trip(token in token()) {
        let text = token.build();
        prop_assert!(text.len() <= cookied_protocol::MAX_TOKEN_LEN);
        prop_assert_eq!(Token::parse(&text).unwrap(), token);
    }

    #[test]
    fn prop_signed_token_round_trip(
        token in token(),
        sig in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        let signed = SignedToken::new(token.build(), hex::encode(&sig));
        let parsed = SignedToken::parse(&signed.build()).unwrap();
        prop_assert_eq!(parsed.parse_token().unwrap(), token);
        prop_assert_eq!(hex::decode(parsed.signature()).unwrap(), sig);
    }

    #[test]
    fn prop_parse_never_panics(text in ".{0,80}") {
        let _ = Token::parse(&text);
        let _ = SignedToken::parse(&text);
    }
}
