//! Chat alerts via the Telegram Bot API.
//!
//! A plain HTTPS POST to `sendMessage` — no bot framework. Alert pacing is
//! an explicit [`AlertGate`] owned by the caller, not a module-level
//! timestamp.

use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Telegram API error: {0}")]
    Api(String),
}

/// Sends messages to one Telegram chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self::with_api_base(TELEGRAM_API_BASE, bot_token, chat_id)
    }

    /// Point at a non-default API host (used by tests).
    pub fn with_api_base(api_base: &str, bot_token: &str, chat_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    /// Send one message. Errors are returned, never swallowed; the caller
    /// decides whether an alert failure matters.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if status.is_success() && json.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            debug!(chat_id = %self.chat_id, "Alert sent");
            Ok(())
        } else {
            let description = json
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            Err(NotifyError::Api(description))
        }
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

/// Cooldown gate for alert pacing.
///
/// At most one alert per cooldown window; everything in between is dropped.
#[derive(Debug)]
pub struct AlertGate {
    cooldown: Duration,
    last_sent: Option<Instant>,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sent: None,
        }
    }

    /// Whether an alert may go out now. Records the send when it may.
    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&mut self, now: Instant) -> bool {
        match self.last_sent {
            Some(last) if now.duration_since(last) < self.cooldown => false,
            _ => {
                self.last_sent = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_gate_allows_first_alert() {
        let mut gate = AlertGate::new(Duration::from_secs(60));
        assert!(gate.allow());
    }

    #[test]
    fn test_gate_blocks_within_cooldown() {
        let mut gate = AlertGate::new(Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(gate.allow_at(t0));
        assert!(!gate.allow_at(t0 + Duration::from_secs(10)));
        assert!(!gate.allow_at(t0 + Duration::from_secs(59)));
    }

    #[test]
    fn test_gate_reopens_after_cooldown() {
        let mut gate = AlertGate::new(Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(gate.allow_at(t0));
        assert!(gate.allow_at(t0 + Duration::from_secs(61)));
        // Blocked send must not reset the window.
        assert!(!gate.allow_at(t0 + Duration::from_secs(62)));
    }

    #[tokio::test]
    async fn test_send_message_posts_to_bot_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/botTOKEN/sendMessage")
                .json_body_partial(r#"{"chat_id": "42", "text": "hello"}"#);
            then.status(200).json_body(serde_json::json!({"ok": true}));
        });

        let notifier = TelegramNotifier::with_api_base(&server.base_url(), "TOKEN", "42");
        notifier.send_message("hello").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_send_message_surfaces_api_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/botTOKEN/sendMessage");
            then.status(400).json_body(
                serde_json::json!({"ok": false, "description": "Bad Request: chat not found"}),
            );
        });

        let notifier = TelegramNotifier::with_api_base(&server.base_url(), "TOKEN", "42");
        let err = notifier.send_message("hello").await.unwrap_err();
        match err {
            NotifyError::Api(description) => assert!(description.contains("chat not found")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
