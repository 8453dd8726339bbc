//! Shared HTTP client construction

use std::time::Duration;

use pageforge_core::prelude::*;

/// Default per-request timeout for probes and unary calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn user_agent() -> String {
    format!("pageforge/{}", env!("CARGO_PKG_VERSION"))
}

/// Client for request/response calls, bounded by `timeout` end to end.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))
}

/// Client for long-lived streaming responses.
///
/// Only the connect phase is bounded; a total timeout would cut off a
/// generation or a server log stream that is still producing data.
pub fn build_streaming_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))
}

/// Map a reqwest failure onto the transport error variant.
pub fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::transport(format!("request timed out: {}", err))
    } else if err.is_connect() {
        Error::transport(format!("connection failed: {}", err))
    } else {
        Error::transport(err.to_string())
    }
}

/// Pull `error.message` out of a JSON error body, falling back to the raw text.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str().map(str::to_string))
        });

    match from_json {
        Some(message) => format!("HTTP {}: {}", status.as_u16(), message),
        None if body.trim().is_empty() => format!("HTTP {}", status.as_u16()),
        None => format!("HTTP {}: {}", status.as_u16(), truncate(body.trim(), 200)),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_error_message_prefers_nested_json_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "HTTP 400: API key not valid. Please pass a valid API key."
        );
    }

    #[test]
    fn test_error_message_accepts_flat_error_string() {
        let body = r#"{"success":false,"error":"Unauthorized: Invalid token"}"#;
        assert_eq!(
            error_message(StatusCode::UNAUTHORIZED, body),
            "HTTP 401: Unauthorized: Invalid token"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_text() {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "HTTP 502: upstream down"
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé…");
        assert_eq!(truncate("hi", 5), "hi");
    }
}
