use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error body returned by the search backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub error: String,
}

/// Failures surfaced by [`RequestGateway`](super::gateway::RequestGateway).
///
/// Only [`RequestError::Transport`] is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No response was received (connect, DNS, timeout, truncated body).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("API error (HTTP {status}{}): {message}", code_suffix(.code))]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("failed to encode request body: {0}")]
    Encode(String),

    /// Successful status, unusable body.
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|c| format!(", code {c}")).unwrap_or_default()
}

impl RequestError {
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Builds an [`RequestError::Api`] from a non-success response body.
    ///
    /// The HTTP status alone does not carry the reason, so the structured body
    /// wins whenever it parses; otherwise the raw text is kept.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorResponse>(body) {
            Ok(parsed) if !parsed.error.is_empty() => Self::Api {
                status,
                code: Some(parsed.code),
                message: parsed.error,
            },
            _ => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                Self::Api {
                    status,
                    code: None,
                    message: if text.is_empty() {
                        format!("request failed with HTTP {status}")
                    } else {
                        text
                    },
                }
            }
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(format!("{err:#}"))
    }
}

impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_body_is_preferred() {
        let err = RequestError::from_response(
            401,
            br#"{"status":"error","code":1,"error":"unauthorized"}"#,
        );
        assert_eq!(
            err,
            RequestError::Api {
                status: 401,
                code: Some(1),
                message: "unauthorized".to_string()
            }
        );
        assert_eq!(err.to_string(), "API error (HTTP 401, code 1): unauthorized");
    }

    #[test]
    fn unstructured_body_falls_back_to_text() {
        let err = RequestError::from_response(502, b"Bad Gateway\n");
        assert_eq!(err.to_string(), "API error (HTTP 502): Bad Gateway");

        let err = RequestError::from_response(500, b"");
        assert_eq!(
            err.to_string(),
            "API error (HTTP 500): request failed with HTTP 500"
        );
        assert!(!err.is_transport());
    }
}
