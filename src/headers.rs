//! Header redaction for persisted trace records.

use http::HeaderMap;
use std::collections::HashMap;

/// Header names whose values must never be persisted verbatim.
///
/// `http::HeaderName` is always lowercase, so membership here is a
/// case-insensitive match against whatever the client sent.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "api-key",
    "cookie",
    "set-cookie",
    "x-request-id",
    "x-github-token",
    "x-copilot-token",
];

const REDACTION_MARKER: &str = "[REDACTED]";

/// Produce a redacted, single-valued view of `headers`.
///
/// Multi-valued headers are joined with `", "` before classification.
/// Sensitive values longer than 12 characters keep a 4-character prefix and
/// suffix; shorter ones are replaced entirely. Values that are not valid
/// UTF-8 are rendered lossily.
pub fn redact_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut result = HashMap::new();

    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");

        let value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
            redact_value(&joined)
        } else {
            joined
        };
        result.insert(name.as_str().to_string(), value);
    }

    result
}

fn redact_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 12 {
        return REDACTION_MARKER.to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderName, HeaderValue};

    fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).expect("header name"),
                HeaderValue::from_str(value).expect("header value"),
            );
        }
        headers
    }

    #[test]
    fn test_short_sensitive_value_fully_redacted() {
        let headers = header_map(&[("authorization", "abc123")]);
        let redacted = redact_headers(&headers);
        assert_eq!(redacted["authorization"], "[REDACTED]");
    }

    #[test]
    fn test_boundary_length_fully_redacted() {
        // Exactly 12 characters still gets the full marker
        let headers = header_map(&[("x-api-key", "123456789012")]);
        let redacted = redact_headers(&headers);
        assert_eq!(redacted["x-api-key"], "[REDACTED]");
    }

    #[test]
    fn test_long_sensitive_value_keeps_prefix_and_suffix() {
        let headers = header_map(&[("authorization", "Bearer sk-abcdef123456")]);
        let redacted = redact_headers(&headers);
        assert_eq!(redacted["authorization"], "Bear...3456");
    }

    #[test]
    fn test_sensitive_match_is_case_insensitive() {
        let headers = header_map(&[("Authorization", "Bearer sk-abcdef123456")]);
        let redacted = redact_headers(&headers);
        assert_eq!(redacted["authorization"], "Bear...3456");
    }

    #[test]
    fn test_non_sensitive_passes_through() {
        let headers = header_map(&[
            ("content-type", "application/json"),
            ("user-agent", "copilot-cli/1.0.0 (very long value here)"),
        ]);
        let redacted = redact_headers(&headers);
        assert_eq!(redacted["content-type"], "application/json");
        assert_eq!(
            redacted["user-agent"],
            "copilot-cli/1.0.0 (very long value here)"
        );
    }

    #[test]
    fn test_multi_valued_headers_joined() {
        let headers = header_map(&[("accept", "text/html"), ("accept", "application/json")]);
        let redacted = redact_headers(&headers);
        assert_eq!(redacted["accept"], "text/html, application/json");
    }

    #[test]
    fn test_multi_valued_sensitive_joined_then_redacted() {
        let headers = header_map(&[
            ("set-cookie", "session=abcdef0123456789"),
            ("set-cookie", "csrf=9876543210fedcba"),
        ]);
        let redacted = redact_headers(&headers);
        // Joined value is long, so prefix/suffix masking applies to the whole
        assert_eq!(redacted["set-cookie"], "sess...dcba");
    }

    #[test]
    fn test_provider_token_headers_redacted() {
        let headers = header_map(&[
            ("x-github-token", "ghu_0123456789abcdef"),
            ("x-copilot-token", "tid=xyz;exp=123"),
            ("x-request-id", "req-42"),
        ]);
        let redacted = redact_headers(&headers);
        assert_eq!(redacted["x-github-token"], "ghu_...cdef");
        assert_eq!(redacted["x-copilot-token"], "tid=...=123");
        assert_eq!(redacted["x-request-id"], "[REDACTED]");
    }
}
