//! Error types for the AliceBlue session and REST client.

use thiserror::Error;

/// Failures of the authenticated-session acquisition procedure.
///
/// Grouped so callers can tell "fix your config" from "retry later":
/// - local precondition violations ([`MissingCredential`](Self::MissingCredential),
///   [`InvalidTotpSecret`](Self::InvalidTotpSecret)),
/// - explicit remote rejections ([`AuthenticationRejected`](Self::AuthenticationRejected)),
/// - transient transport problems ([`Transport`](Self::Transport)).
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Missing credential: {field}")]
    MissingCredential { field: &'static str },

    #[error("TOTP secret is not valid base32 material: {0}")]
    InvalidTotpSecret(String),

    #[error("Login rejected by broker: {message}")]
    AuthenticationRejected {
        message: String,
        /// The service's own diagnostic payload, attached verbatim.
        payload: serde_json::Value,
    },

    #[error("Transport failure: {0}")]
    Transport(String),
}

impl SessionError {
    /// Whether the caller may retry on a timer without changing anything.
    ///
    /// A retry after any failure must regenerate the one-time code; the old
    /// code is time-windowed and single-use.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors from post-login API calls made through a [`BrokerClient`].
///
/// [`BrokerClient`]: crate::api::client::BrokerClient
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {status_code} - {message}")]
    Http {
        status_code: u16,
        error_code: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl ApiError {
    /// Parse error from an API response body.
    pub fn from_response(status_code: u16, body: &str) -> Self {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
            let code = json
                .get("stat")
                .and_then(|v| v.as_str())
                .unwrap_or("UNKNOWN")
                .to_string();
            let message = json
                .get("emsg")
                .or_else(|| json.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or(body)
                .to_string();

            return Self::Http {
                status_code,
                error_code: code,
                message,
            };
        }

        Self::Http {
            status_code,
            error_code: "UNKNOWN".to_string(),
            message: body.to_string(),
        }
    }

    /// Whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::Http {
                    status_code: 500..=599,
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_is_retryable() {
        assert!(SessionError::Transport("connection reset".into()).is_retryable());
    }

    #[test]
    fn test_rejection_is_not_retryable() {
        let err = SessionError::AuthenticationRejected {
            message: "Invalid App Key".into(),
            payload: json!({"stat": "Not_Ok", "emsg": "Invalid App Key"}),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_credential_is_not_retryable() {
        let err = SessionError::MissingCredential { field: "password" };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_api_error_from_structured_body() {
        let err = ApiError::from_response(400, r#"{"stat":"Not_Ok","emsg":"Session Expired"}"#);
        match err {
            ApiError::Http {
                status_code,
                error_code,
                message,
            } => {
                assert_eq!(status_code, 400);
                assert_eq!(error_code, "Not_Ok");
                assert_eq!(message, "Session Expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_from_unstructured_body() {
        let err = ApiError::from_response(502, "Bad Gateway");
        assert!(err.is_retryable());
    }
}
