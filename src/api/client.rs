//! Authenticated REST client bound to one broker session.
//!
//! A [`BrokerClient`] is the handle produced by a successful login: the
//! session token plus the user id it was issued for. Every request carries
//! `Authorization: Bearer {user_id} {session_token}`.
//!
//! Post-login calls are rate limited client-side and retried with
//! exponential backoff on server/network errors. The login exchange itself
//! never goes through this path.

use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::data::models::{Profile, Quote};

use super::errors::ApiError;

const DEFAULT_RATE_LIMIT_PER_SEC: u32 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Client handle bound to a session token.
///
/// Cheap to clone; the underlying connection pool and rate limiter are
/// shared. Holds no expiry logic — a dead session surfaces as an API error
/// and the caller re-acquires.
#[derive(Clone)]
pub struct BrokerClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    session_token: String,
    rate_limiter: Arc<DirectRateLimiter>,
    max_retries: u32,
}

impl BrokerClient {
    pub fn new(http: reqwest::Client, base_url: &str, user_id: &str, session_token: &str) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(DEFAULT_RATE_LIMIT_PER_SEC).unwrap_or(NonZeroU32::MIN),
        );

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
            session_token: session_token.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    fn authorization_value(&self) -> String {
        format!("Bearer {} {}", self.user_id, self.session_token)
    }

    // =========================================================================
    // Core request method
    // =========================================================================

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..self.max_retries {
            self.rate_limiter.until_ready().await;

            debug!(method = %method, path = %path, attempt = attempt + 1, "API request");

            let mut req = self
                .http
                .request(method.clone(), &url)
                .header(reqwest::header::AUTHORIZATION, self.authorization_value());

            if let Some(body) = body {
                req = req.json(body);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let text = response
                            .text()
                            .await
                            .map_err(|e| ApiError::Network(e.to_string()))?;
                        let json: serde_json::Value = serde_json::from_str(&text)
                            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
                        return Ok(json);
                    }

                    // Server errors — retry with backoff.
                    if status.as_u16() >= 500 {
                        let delay_ms = 500 * 2u64.pow(attempt);
                        warn!(
                            status_code = status.as_u16(),
                            delay_ms,
                            attempt = attempt + 1,
                            "Server error, retrying"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        last_error = Some(ApiError::Http {
                            status_code: status.as_u16(),
                            error_code: "SERVER_ERROR".to_string(),
                            message: status.to_string(),
                        });
                        continue;
                    }

                    // Client errors — don't retry.
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(ApiError::from_response(status.as_u16(), &body_text));
                }
                Err(e) => {
                    let delay_ms = 500 * 2u64.pow(attempt);
                    warn!(error = %e, delay_ms, attempt = attempt + 1, "Network error, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                    if e.is_timeout() {
                        last_error = Some(ApiError::Timeout(e.to_string()));
                    } else {
                        last_error = Some(ApiError::Network(e.to_string()));
                    }
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::MaxRetriesExceeded {
            attempts: self.max_retries,
            last_error: "Unknown error".to_string(),
        }))
    }

    // =========================================================================
    // Account endpoints
    // =========================================================================

    /// Fetch the account profile for the logged-in user.
    pub async fn get_profile(&self) -> Result<Profile, ApiError> {
        let data = self
            .request(reqwest::Method::GET, "/customer/profile", None)
            .await?;
        serde_json::from_value(data).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    // =========================================================================
    // Market data endpoints
    // =========================================================================

    /// Fetch a quote for one instrument.
    pub async fn get_quote(&self, exchange: &str, instrument_token: &str) -> Result<Quote, ApiError> {
        let body = serde_json::json!({
            "exch": exchange,
            "token": instrument_token,
        });

        let data = self
            .request(reqwest::Method::POST, "/marketdata/quote", Some(&body))
            .await?;

        // Some deployments nest the quote under "data".
        let quote_val = data.get("data").filter(|v| v.is_object()).unwrap_or(&data);
        serde_json::from_value(quote_val.clone())
            .map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

impl std::fmt::Debug for BrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerClient")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .field("session_token", &"<redacted>")
            .finish()
    }
}
