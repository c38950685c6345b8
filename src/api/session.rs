//! Authenticated-session acquisition against the broker's login endpoint.
//!
//! The whole exchange is a fixed three-step protocol:
//! 1. derive the current one-time code from the TOTP shared secret,
//! 2. POST it plus the four static credential values to the login endpoint,
//! 3. wrap the returned session token in a [`BrokerClient`].
//!
//! No retry lives in here — a caller retrying on a timer gets a fresh
//! one-time code on every call because step 1 runs unconditionally.

use serde_json::json;
use tracing::{debug, info};

use crate::api::client::BrokerClient;
use crate::api::errors::SessionError;
use crate::auth::{Credentials, TotpGenerator};

/// Login endpoint path, relative to the configured base URL.
pub const LOGIN_PATH: &str = "/customer/login";

/// Success sentinel carried in the response's `stat` field.
pub const STAT_OK: &str = "Ok";

/// Response fields that may carry the session token, checked in priority
/// order. The broker's deployments have disagreed on the name over time.
pub const TOKEN_ALIASES: [&str; 3] = ["susertoken", "sessionID", "userToken"];

/// Turns a credential bundle into an authenticated client handle.
#[derive(Debug, Clone)]
pub struct SessionAcquirer {
    http: reqwest::Client,
    base_url: String,
}

impl SessionAcquirer {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Acquire a session: fresh one-time code, one login round-trip, handle.
    ///
    /// Fails with [`SessionError::MissingCredential`] before any network
    /// call when a bundle field is empty. Each invocation creates an
    /// independent session on the broker side (the service overwrites
    /// earlier sessions; repeated calls are safe).
    pub async fn acquire_session(
        &self,
        credentials: &Credentials,
    ) -> Result<BrokerClient, SessionError> {
        credentials.validate()?;

        let totp = TotpGenerator::new(&credentials.totp_secret)?;
        // Computed at the moment of the call so the code lands inside the
        // validity window the broker checks. Never reused across attempts.
        let one_time_code = totp.current_code();

        let body = json!({
            "userId": credentials.user_id,
            "password": credentials.password,
            "twoFA": one_time_code,
            "appId": credentials.app_id,
            "apiSecret": credentials.api_secret,
        });

        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        debug!(user_id = %credentials.user_id, app_id = %credentials.app_id, "Submitting login request");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let token = classify_login_response(status, &text)?;

        info!(user_id = %credentials.user_id, "Login succeeded, session established");

        Ok(BrokerClient::new(
            self.http.clone(),
            &self.base_url,
            &credentials.user_id,
            &token,
        ))
    }
}

/// Classify a login response into a session token or a [`SessionError`].
///
/// A structured rejection (JSON body with `stat != "Ok"`) means the broker
/// explicitly denied the login, at whatever HTTP status it arrived — that is
/// an authentication failure, not a transport one. Everything malformed or
/// unexpected is a transport failure.
fn classify_login_response(status: u16, body: &str) -> Result<String, SessionError> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        SessionError::Transport(format!("malformed response body (HTTP {status}): {e}"))
    })?;

    if let Some(stat) = json.get("stat").and_then(|v| v.as_str()) {
        if stat != STAT_OK {
            let message = json
                .get("emsg")
                .or_else(|| json.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or(stat)
                .to_string();
            return Err(SessionError::AuthenticationRejected {
                message,
                payload: json,
            });
        }
    }

    if !(200..300).contains(&status) {
        return Err(SessionError::Transport(format!(
            "unexpected HTTP status {status}: {body}"
        )));
    }

    for alias in TOKEN_ALIASES {
        if let Some(token) = json.get(alias).and_then(|v| v.as_str()) {
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
    }

    Err(SessionError::Transport(format!(
        "success response carried no session token under {TOKEN_ALIASES:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response_yields_token() {
        let token = classify_login_response(200, r#"{"stat":"Ok","susertoken":"TOK123"}"#);
        assert_eq!(token.unwrap(), "TOK123");
    }

    #[test]
    fn test_token_aliases_checked_in_order() {
        for body in [
            r#"{"stat":"Ok","susertoken":"T1"}"#,
            r#"{"stat":"Ok","sessionID":"T1"}"#,
            r#"{"stat":"Ok","userToken":"T1"}"#,
        ] {
            assert_eq!(classify_login_response(200, body).unwrap(), "T1");
        }
        // First alias wins when several are present.
        let both = r#"{"stat":"Ok","sessionID":"SECOND","susertoken":"FIRST"}"#;
        assert_eq!(classify_login_response(200, both).unwrap(), "FIRST");
    }

    #[test]
    fn test_stat_not_ok_is_rejection_with_payload() {
        let err = classify_login_response(
            200,
            r#"{"stat":"Not_Ok","emsg":"Invalid TOTP"}"#,
        )
        .unwrap_err();
        match err {
            SessionError::AuthenticationRejected { message, payload } => {
                assert_eq!(message, "Invalid TOTP");
                assert_eq!(payload["stat"], "Not_Ok");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejection_wins_over_http_status() {
        // A 401 carrying a structured rejection is still an auth failure.
        let err = classify_login_response(
            401,
            r#"{"stat":"Not_Ok","emsg":"Invalid App Key"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::AuthenticationRejected { .. }));
    }

    #[test]
    fn test_unexpected_status_without_rejection_is_transport() {
        let err = classify_login_response(503, r#"{"detail":"overloaded"}"#).unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn test_malformed_body_is_transport() {
        let err = classify_login_response(200, "<html>gateway error</html>").unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn test_missing_token_is_transport() {
        let err = classify_login_response(200, r#"{"stat":"Ok"}"#).unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }

    #[test]
    fn test_empty_token_is_transport() {
        let err = classify_login_response(200, r#"{"stat":"Ok","susertoken":""}"#).unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
    }
}
