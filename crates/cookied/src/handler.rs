//! Per-connection handler: one request, one response.
//!
//! Each accepted connection runs to completion before the next one is
//! accepted. The flow is:
//!   1. Read once, bounded → overflow, hang-up, or timeout closes silently
//!   2. Parse the bytes as a token → failure answers `"0"`
//!   3. Ask the session store for the remaining lifetime
//!   4. Write the lifetime as decimal text, then close
//!
//! Nothing here returns an error: a single bad client must never take the
//! daemon down, so every failure ends in a log line and a closed socket.

use cookied_protocol::{ProtocolError, Token};
use cookied_store::{SessionConnectionManager, StoreConnector};
use cookied_transport::{Connection, Inbound};

/// The answer for anything that isn't a live session.
pub const REJECT: &str = "0";

/// Handles a single connection from accept to close.
pub async fn handle_connection<T, C>(mut conn: T, store: &mut SessionConnectionManager<C>)
where
    T: Connection,
    C: StoreConnector,
{
    let conn_id = conn.id();

    let request = match conn.recv().await {
        Ok(Inbound::Request(bytes)) => bytes,
        Ok(Inbound::Overflow) => {
            tracing::warn!(%conn_id, "oversized request, closing without response");
            close(conn).await;
            return;
        }
        Ok(Inbound::Closed) => {
            tracing::debug!(%conn_id, "peer closed before sending a request");
            return;
        }
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "read failed");
            close(conn).await;
            return;
        }
    };

    let response = respond(&request, store);

    if let Err(e) = conn.send(response.as_bytes()).await {
        tracing::warn!(%conn_id, error = %e, "failed to write response");
    }
    close(conn).await;
}

/// Turns raw request bytes into the response text.
pub fn respond<C: StoreConnector>(request: &[u8], store: &mut SessionConnectionManager<C>) -> String {
    match parse_request(request) {
        Ok(token) => store.check_token(&token).to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "unparsable request");
            REJECT.to_string()
        }
    }
}

/// Parses request bytes as a token.
///
/// Clients written against C string APIs often send a trailing newline or
/// NUL along with the token; those are stripped first.
pub fn parse_request(request: &[u8]) -> Result<Token, ProtocolError> {
    let text = std::str::from_utf8(request)
        .map_err(|_| ProtocolError::MalformedToken("request is not UTF-8".into()))?;
    Token::parse(text.trim_end_matches(['\0', '\r', '\n']))
}

async fn close<T: Connection>(conn: T) {
    let conn_id = conn.id();
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "error while closing connection");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_plain_token() {
        let token = parse_request(b"bob::1::10.0.0.2::1::zzzz").unwrap();
        assert_eq!(token.user_id(), "bob");
        assert_eq!(token.client_id(), "zzzz");
    }

    #[test]
    fn test_parse_request_strips_trailing_newline_and_nul() {
        assert!(parse_request(b"bob::1::10.0.0.2::1::zzzz\n").is_ok());
        assert!(parse_request(b"bob::1::10.0.0.2::1::zzzz\r\n").is_ok());
        assert!(parse_request(b"bob::1::10.0.0.2::1::zzzz\0").is_ok());
    }

    #[test]
    fn test_parse_request_no_delimiter_fails() {
        assert!(matches!(
            parse_request(b"garbage"),
            Err(ProtocolError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_parse_request_invalid_utf8_fails() {
        assert!(matches!(
            parse_request(&[0xff, 0xfe, b':', b':']),
            Err(ProtocolError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_parse_request_overlong_field_fails() {
        assert!(matches!(
            parse_request(b"bob::1::10.0.0.2::1::zzzzz"),
            Err(ProtocolError::FieldTooLong { .. })
        ));
    }
}
