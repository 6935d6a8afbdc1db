//! Exchange rate provider
//!
//! Boundary with the external quote source. A quote is fetched fresh for
//! every conversion, validated positive, and then used consistently for
//! both the sufficiency check and the apply step. The fetch always happens
//! BEFORE the ledger engine takes any row lock.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::Currency;

/// A quoted conversion rate: `amount_out = amount_in * rate`.
///
/// Ephemeral; never persisted as such (the transaction log records the rate
/// actually applied).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExchangeQuote {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
}

/// Errors from the quote source.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("Quote request failed: {0}")]
    Request(String),

    #[error("Quote source returned no usable rate for {0}/{1}")]
    MissingRate(Currency, Currency),

    #[error("Quote source returned a non-positive rate: {0}")]
    NonPositive(Decimal),
}

/// The configured quote source.
///
/// Enum dispatch keeps the call sites monomorphic while letting tests swap
/// in deterministic rates.
#[derive(Debug, Clone)]
pub enum RateProvider {
    Http(HttpRateProvider),
    Fixed(FixedRateProvider),
}

impl RateProvider {
    /// Fetch a fresh quote for the pair.
    pub async fn quote(&self, from: Currency, to: Currency) -> Result<ExchangeQuote, RateError> {
        let quote = match self {
            RateProvider::Http(provider) => provider.quote(from, to).await?,
            RateProvider::Fixed(provider) => provider.quote(from, to)?,
        };

        if quote.rate <= Decimal::ZERO {
            return Err(RateError::NonPositive(quote.rate));
        }

        Ok(quote)
    }
}

/// HTTP quote source.
///
/// Expects `GET {base_url}/rates/{FROM}/{TO}` to answer with a JSON object
/// carrying a `rate` field (string or number).
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRateProvider {
    pub fn new(base_url: String, timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn quote(&self, from: Currency, to: Currency) -> Result<ExchangeQuote, RateError> {
        let url = format!("{}/rates/{}/{}", self.base_url, from.code(), to.code());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RateError::Request(format!(
                "quote source answered {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RateError::Request(e.to_string()))?;

        // Rate may arrive as "0.9" or 0.9 depending on the upstream
        let rate = body
            .get("rate")
            .and_then(|v| {
                v.as_str()
                    .and_then(|s| s.parse::<Decimal>().ok())
                    .or_else(|| v.as_f64().and_then(Decimal::from_f64_retain))
            })
            .ok_or(RateError::MissingRate(from, to))?;

        Ok(ExchangeQuote { from, to, rate })
    }
}

/// Deterministic quote source for tests and offline development.
#[derive(Debug, Clone, Default)]
pub struct FixedRateProvider {
    rates: Vec<(Currency, Currency, Decimal)>,
}

impl FixedRateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rate for a pair. Later entries win.
    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.rates.push((from, to, rate));
        self
    }

    fn quote(&self, from: Currency, to: Currency) -> Result<ExchangeQuote, RateError> {
        self.rates
            .iter()
            .rev()
            .find(|(f, t, _)| *f == from && *t == to)
            .map(|(_, _, rate)| ExchangeQuote {
                from,
                to,
                rate: *rate,
            })
            .ok_or(RateError::MissingRate(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_fixed_provider_returns_registered_rate() {
        let provider = RateProvider::Fixed(
            FixedRateProvider::new().with_rate(Currency::Usd, Currency::Eur, dec!(0.9)),
        );

        let quote = provider.quote(Currency::Usd, Currency::Eur).await.unwrap();
        assert_eq!(quote.rate, dec!(0.9));
        assert_eq!(quote.from, Currency::Usd);
        assert_eq!(quote.to, Currency::Eur);
    }

    #[tokio::test]
    async fn test_fixed_provider_missing_pair() {
        let provider = RateProvider::Fixed(FixedRateProvider::new());

        let err = provider
            .quote(Currency::Btc, Currency::Ars)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RateError::MissingRate(Currency::Btc, Currency::Ars)
        ));
    }

    #[tokio::test]
    async fn test_non_positive_rate_rejected() {
        let provider = RateProvider::Fixed(
            FixedRateProvider::new().with_rate(Currency::Usd, Currency::Eur, dec!(0)),
        );

        let err = provider
            .quote(Currency::Usd, Currency::Eur)
            .await
            .unwrap_err();
        assert!(matches!(err, RateError::NonPositive(_)));
    }

    #[tokio::test]
    async fn test_later_registration_wins() {
        let provider = RateProvider::Fixed(
            FixedRateProvider::new()
                .with_rate(Currency::Usd, Currency::Eur, dec!(0.9))
                .with_rate(Currency::Usd, Currency::Eur, dec!(0.95)),
        );

        let quote = provider.quote(Currency::Usd, Currency::Eur).await.unwrap();
        assert_eq!(quote.rate, dec!(0.95));
    }
}
