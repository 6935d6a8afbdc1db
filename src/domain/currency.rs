//! Currency codes
//!
//! The wallet supports a fixed, closed set of currencies. Anything outside
//! this set is rejected at the validation boundary, never stored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ars,
    Usd,
    Eur,
    Btc,
    Eth,
    Usdt,
}

impl Currency {
    /// Every supported currency, in balance-record column order.
    pub const ALL: [Currency; 6] = [
        Currency::Ars,
        Currency::Usd,
        Currency::Eur,
        Currency::Btc,
        Currency::Eth,
        Currency::Usdt,
    ];

    /// The canonical uppercase code, as stored and exposed over the API.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ars => "ARS",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
            Currency::Usdt => "USDT",
        }
    }

    /// Parse a code, case-insensitively. Returns `None` for anything outside
    /// the supported set.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "ARS" => Some(Currency::Ars),
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            "BTC" => Some(Currency::Btc),
            "ETH" => Some(Currency::Eth),
            "USDT" => Some(Currency::Usdt),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = super::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::from_code(s).ok_or_else(|| super::DomainError::InvalidCurrency(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn test_all_codes_round_trip() {
        for currency in Currency::ALL {
            assert_eq!(Currency::from_code(currency.code()), Some(currency));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("usdt".parse::<Currency>().unwrap(), Currency::Usdt);
        assert_eq!("Btc".parse::<Currency>().unwrap(), Currency::Btc);
    }

    #[test]
    fn test_unknown_code_rejected() {
        let err = "DOGE".parse::<Currency>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidCurrency(_)));
    }

    #[test]
    fn test_serde_uses_uppercase_codes() {
        let json = serde_json::to_string(&Currency::Ars).unwrap();
        assert_eq!(json, "\"ARS\"");

        let parsed: Currency = serde_json::from_str("\"ETH\"").unwrap();
        assert_eq!(parsed, Currency::Eth);
    }
}
