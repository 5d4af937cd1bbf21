//! Hex transport encoding for signatures.
//!
//! Every byte becomes two uppercase characters. The mapping is computed
//! arithmetically (`'0' + n` for 0–9, `'A' + n - 10` for 10–15) rather
//! than through a lookup table so the output stays byte-for-byte identical
//! to what deployed verifiers already accept.
//!
//! ```rust
//! use cookied_protocol::hex;
//!
//! let text = hex::encode(&[0x00, 0x9F, 0xFF]);
//! assert_eq!(text, "009FFF");
//! assert_eq!(hex::decode(&text).unwrap(), vec![0x00, 0x9F, 0xFF]);
//! ```

use crate::ProtocolError;

/// Maps a nibble (0–15) to its hex digit.
fn nibble_to_digit(n: u8) -> char {
    if n < 10 {
        char::from(b'0' + n)
    } else {
        char::from(b'A' - 10 + n)
    }
}

/// Maps a hex digit back to its nibble, or `None` outside `0-9A-F`.
fn digit_to_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Encodes bytes as uppercase hex text.
///
/// The result always has even length and only contains `0-9A-F`.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(nibble_to_digit(b / 16));
        out.push(nibble_to_digit(b % 16));
    }
    out
}

/// Decodes uppercase hex text back into bytes.
///
/// # Errors
/// Returns [`ProtocolError::InvalidHex`] if the text has an odd number of
/// digits or contains anything other than `0-9A-F`. Lowercase digits are
/// rejected: [`encode`] never produces them.
pub fn decode(text: &str) -> Result<Vec<u8>, ProtocolError> {
    let raw = text.as_bytes();
    if raw.len() % 2 != 0 {
        return Err(ProtocolError::InvalidHex(format!(
            "odd number of digits ({})",
            raw.len()
        )));
    }

    raw.chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let hi = digit_to_nibble(pair[0]);
            let lo = digit_to_nibble(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok(16 * hi + lo),
                _ => Err(ProtocolError::InvalidHex(format!(
                    "non-hex digit near offset {}",
                    i * 2
                ))),
            }
        })
        .collect()
}
