//! Configuration management.
//!
//! Loads settings from environment variables and .env file. The credential
//! bundle is read once at startup and stays immutable for the process
//! lifetime.

use crate::auth::Credentials;
use crate::data::models::Instrument;

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Settings {
    // Broker credentials
    pub alice_user_id: String,
    pub alice_password: String,
    pub alice_app_id: String,
    pub alice_api_secret: String,
    pub alice_totp_secret: String,

    // Broker API
    pub base_url: String,
    pub login_timeout_secs: u64,

    // Quote polling
    pub instruments: Vec<String>,
    pub poll_interval_secs: f64,
    pub feed_concurrency: usize,

    // Alerts
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub alert_cooldown_secs: f64,

    // Logging
    pub log_level: String,
    pub log_json: bool,
}

impl Settings {
    /// Load settings from environment variables (and .env file).
    pub fn from_env() -> Self {
        // Try to load .env file (ignore if not found).
        let _ = dotenvy::dotenv();

        Self {
            alice_user_id: env_str("ALICE_USER_ID", ""),
            alice_password: env_str("ALICE_PASSWORD", ""),
            alice_app_id: env_str("ALICE_APP_ID", ""),
            alice_api_secret: env_str("ALICE_API_SECRET", ""),
            alice_totp_secret: env_str("ALICE_TWO_FA", ""),

            base_url: env_str("ALICE_BASE_URL", "https://ant.aliceblueonline.com/api"),
            login_timeout_secs: env_u64("LOGIN_TIMEOUT_SECS", 30),

            instruments: env_csv_default("INSTRUMENTS", "NSE:26000"),
            poll_interval_secs: env_f64("POLL_INTERVAL_SECONDS", 60.0),
            feed_concurrency: env_usize("FEED_CONCURRENCY", 4),

            telegram_bot_token: env_str("TELEGRAM_BOT_TOKEN", ""),
            telegram_chat_id: env_str("TELEGRAM_CHAT_ID", ""),
            alert_cooldown_secs: env_f64("ALERT_COOLDOWN_SECONDS", 300.0),

            log_level: env_str("LOG_LEVEL", "info"),
            log_json: env_bool("LOG_JSON", false),
        }
    }

    /// The credential bundle handed to the session acquirer.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            user_id: self.alice_user_id.clone(),
            password: self.alice_password.clone(),
            app_id: self.alice_app_id.clone(),
            api_secret: self.alice_api_secret.clone(),
            totp_secret: self.alice_totp_secret.clone(),
        }
    }

    /// Parse the configured instrument list.
    pub fn parsed_instruments(&self) -> Result<Vec<Instrument>, String> {
        self.instruments.iter().map(|s| s.parse()).collect()
    }

    /// Whether alerting is configured at all.
    pub fn alerts_enabled(&self) -> bool {
        !self.telegram_bot_token.is_empty() && !self.telegram_chat_id.is_empty()
    }

    /// Validate configuration for critical requirements.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("ALICE_USER_ID", &self.alice_user_id),
            ("ALICE_PASSWORD", &self.alice_password),
            ("ALICE_APP_ID", &self.alice_app_id),
            ("ALICE_API_SECRET", &self.alice_api_secret),
            ("ALICE_TWO_FA", &self.alice_totp_secret),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{name} is required"));
            }
        }

        if self.poll_interval_secs <= 0.0 {
            errors.push("POLL_INTERVAL_SECONDS must be positive".to_string());
        }

        if let Err(e) = self.parsed_instruments() {
            errors.push(e);
        }

        if self.telegram_bot_token.is_empty() != self.telegram_chat_id.is_empty() {
            errors.push(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// =============================================================================
// Environment helpers
// =============================================================================

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_csv_default(key: &str, default: &str) -> Vec<String> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
