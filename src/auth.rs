//! Credential handling and TOTP code generation for AliceBlue login.
//!
//! The broker's two-factor login wants five values on every attempt:
//! user id, password, application id, API secret, and a fresh 6-digit
//! one-time code derived from the TOTP shared secret (RFC 6238,
//! HMAC-SHA1, 30-second step).
//!
//! The one-time code is time-windowed and single-use, so it is computed
//! immediately before each network call and never cached.

use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::api::errors::SessionError;

/// Static identity and secret material for one broker account.
///
/// Loaded once from the environment at startup; immutable afterwards.
#[derive(Clone)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
    pub app_id: String,
    pub api_secret: String,
    pub totp_secret: String,
}

impl Credentials {
    /// Check that all five fields are present and non-empty.
    ///
    /// Runs before any network call; the first empty field is reported.
    pub fn validate(&self) -> Result<(), SessionError> {
        for (field, value) in [
            ("user_id", &self.user_id),
            ("password", &self.password),
            ("app_id", &self.app_id),
            ("api_secret", &self.api_secret),
            ("totp_secret", &self.totp_secret),
        ] {
            if value.trim().is_empty() {
                return Err(SessionError::MissingCredential { field });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("app_id", &self.app_id)
            .field("password", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("totp_secret", &"<redacted>")
            .finish()
    }
}

/// One-time code generator bound to a base32-encoded TOTP shared secret.
#[derive(Clone)]
pub struct TotpGenerator {
    totp: TOTP,
}

impl TotpGenerator {
    /// Build a generator from a base32 shared secret.
    ///
    /// 6 digits, 30-second step, HMAC-SHA1 — the parameters the broker's
    /// authenticator enrollment uses.
    pub fn new(totp_secret: &str) -> Result<Self, SessionError> {
        let secret_bytes = Secret::Encoded(totp_secret.trim().to_string())
            .to_bytes()
            .map_err(|e| SessionError::InvalidTotpSecret(format!("{e:?}")))?;

        let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, secret_bytes)
            .map_err(|e| SessionError::InvalidTotpSecret(format!("{e:?}")))?;

        Ok(Self { totp })
    }

    /// Code for the window containing "now".
    ///
    /// Must be called at the moment of each login attempt so the code lands
    /// inside the validity window the broker checks.
    pub fn current_code(&self) -> String {
        self.code_at(Self::unix_now())
    }

    /// Code for the window containing the given Unix timestamp.
    pub fn code_at(&self, unix_secs: u64) -> String {
        self.totp.generate(unix_secs)
    }

    fn unix_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("SystemTime before UNIX EPOCH")
            .as_secs()
    }
}

impl std::fmt::Debug for TotpGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpGenerator")
            .field("algorithm", &"SHA1")
            .field("digits", &6)
            .field("step_secs", &30)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B secret ("12345678901234567890") in base32.
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn creds() -> Credentials {
        Credentials {
            user_id: "U1".to_string(),
            password: "p".to_string(),
            app_id: "A1".to_string(),
            api_secret: "s1".to_string(),
            totp_secret: RFC_SECRET.to_string(),
        }
    }

    #[test]
    fn test_rfc6238_vectors() {
        // Appendix B values truncated to 6 digits.
        let gen = TotpGenerator::new(RFC_SECRET).unwrap();
        assert_eq!(gen.code_at(59), "287082");
        assert_eq!(gen.code_at(1_111_111_109), "081804");
        assert_eq!(gen.code_at(1_234_567_890), "005924");
    }

    #[test]
    fn test_code_changes_across_adjacent_windows() {
        // 1111111109 and 1111111111 sit in successive 30s windows.
        let gen = TotpGenerator::new(RFC_SECRET).unwrap();
        assert_ne!(gen.code_at(1_111_111_109), gen.code_at(1_111_111_111));
    }

    #[test]
    fn test_code_stable_within_window() {
        let gen = TotpGenerator::new(RFC_SECRET).unwrap();
        assert_eq!(gen.code_at(60), gen.code_at(89));
    }

    #[test]
    fn test_invalid_base32_secret_rejected() {
        let err = TotpGenerator::new("not-base32!!").unwrap_err();
        assert!(matches!(err, SessionError::InvalidTotpSecret(_)));
    }

    #[test]
    fn test_validate_accepts_full_bundle() {
        assert!(creds().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_empty_field() {
        let mut c = creds();
        c.password = String::new();
        match c.validate().unwrap_err() {
            SessionError::MissingCredential { field } => assert_eq!(field, "password"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_treats_whitespace_as_missing() {
        let mut c = creds();
        c.api_secret = "   ".to_string();
        assert!(matches!(
            c.validate(),
            Err(SessionError::MissingCredential { field: "api_secret" })
        ));
    }

    #[test]
    fn test_debug_redacts_secret_material() {
        let rendered = format!("{:?}", creds());
        assert!(rendered.contains("U1"));
        assert!(!rendered.contains(RFC_SECRET));
        assert!(!rendered.contains("s1"));
    }
}
