//! Data models for broker API responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One tradeable instrument, addressed by exchange segment and token.
///
/// Configured as `EXCHANGE:TOKEN` strings, e.g. `NSE:26000` for NIFTY 50.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub exchange: String,
    pub token: String,
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((exchange, token)) if !exchange.is_empty() && !token.is_empty() => Ok(Self {
                exchange: exchange.trim().to_string(),
                token: token.trim().to_string(),
            }),
            _ => Err(format!("Invalid instrument '{s}', expected EXCHANGE:TOKEN")),
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.exchange, self.token)
    }
}

/// A single-instrument quote snapshot.
///
/// Field aliases cover the broker's short wire names (`exch`, `tsym`, `lp`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    #[serde(alias = "exch")]
    pub exchange: String,
    pub token: String,
    #[serde(alias = "tsym", default)]
    pub trading_symbol: String,
    #[serde(alias = "lp", alias = "ltp")]
    pub last_price: Decimal,
    #[serde(alias = "o", default)]
    pub open: Option<Decimal>,
    #[serde(alias = "h", default)]
    pub high: Option<Decimal>,
    #[serde(alias = "l", default)]
    pub low: Option<Decimal>,
    #[serde(alias = "c", default)]
    pub close: Option<Decimal>,
    #[serde(alias = "v", default)]
    pub volume: Option<i64>,
}

/// Account profile for the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(alias = "actid", alias = "accountId")]
    pub account_id: String,
    #[serde(alias = "uname", default)]
    pub user_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(alias = "exarr", default)]
    pub exchanges: Vec<String>,
}

/// A quote event emitted by the feed.
#[derive(Debug, Clone)]
pub struct QuoteUpdate {
    pub quote: Quote,
    pub received_at: DateTime<Utc>,
}
