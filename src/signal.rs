//! Placeholder signal generation.
//!
//! Buy a call on even minutes, a put on odd minutes. This is the original
//! program's stand-in logic, kept only to drive the alert path; it is not
//! a strategy framework.

use chrono::{DateTime, Timelike, Utc};

/// Direction hint produced once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    BuyCall,
    BuyPut,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyCall => "BUY_CE",
            Self::BuyPut => "BUY_PE",
        }
    }
}

/// Generate the signal for the given wall-clock time.
pub fn generate_signal(now: DateTime<Utc>) -> Signal {
    if now.minute() % 2 == 0 {
        Signal::BuyCall
    } else {
        Signal::BuyPut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_even_minute_buys_call() {
        let t = Utc.with_ymd_and_hms(2024, 6, 3, 10, 14, 5).unwrap();
        assert_eq!(generate_signal(t), Signal::BuyCall);
    }

    #[test]
    fn test_odd_minute_buys_put() {
        let t = Utc.with_ymd_and_hms(2024, 6, 3, 10, 15, 5).unwrap();
        assert_eq!(generate_signal(t), Signal::BuyPut);
    }

    #[test]
    fn test_signal_labels() {
        assert_eq!(Signal::BuyCall.as_str(), "BUY_CE");
        assert_eq!(Signal::BuyPut.as_str(), "BUY_PE");
    }
}
