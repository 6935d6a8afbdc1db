//! Balance record
//!
//! The per-account balance collection is a fixed-shape record with one
//! field per supported currency. Every currency is always present; there
//! is no notion of a "missing" balance. Values are non-negative at every
//! point observable outside a transaction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Amount, Currency, DomainError};

/// Scale used when normalizing balances for presentation.
const BALANCE_SCALE: u32 = 8;

/// The full set of balances held by one account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceSet {
    #[serde(rename = "ARS")]
    pub ars: Decimal,
    #[serde(rename = "USD")]
    pub usd: Decimal,
    #[serde(rename = "EUR")]
    pub eur: Decimal,
    #[serde(rename = "BTC")]
    pub btc: Decimal,
    #[serde(rename = "ETH")]
    pub eth: Decimal,
    #[serde(rename = "USDT")]
    pub usdt: Decimal,
}

impl BalanceSet {
    /// A freshly opened account: every currency present, every balance zero.
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Read the balance for one currency.
    pub fn get(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::Ars => self.ars,
            Currency::Usd => self.usd,
            Currency::Eur => self.eur,
            Currency::Btc => self.btc,
            Currency::Eth => self.eth,
            Currency::Usdt => self.usdt,
        }
    }

    fn slot_mut(&mut self, currency: Currency) -> &mut Decimal {
        match currency {
            Currency::Ars => &mut self.ars,
            Currency::Usd => &mut self.usd,
            Currency::Eur => &mut self.eur,
            Currency::Btc => &mut self.btc,
            Currency::Eth => &mut self.eth,
            Currency::Usdt => &mut self.usdt,
        }
    }

    /// Whether `currency` holds at least `amount`.
    pub fn is_sufficient(&self, currency: Currency, amount: &Amount) -> bool {
        self.get(currency) >= amount.value()
    }

    /// Add `value` to one currency. `value` must already be validated
    /// positive by the caller (it comes from an `Amount` or a quoted
    /// conversion result).
    pub fn credit(&mut self, currency: Currency, value: Decimal) -> Result<(), DomainError> {
        let slot = self.slot_mut(currency);
        let new_value = *slot + value;
        if new_value > Amount::max_value() {
            return Err(DomainError::BalanceLimitExceeded { currency });
        }
        *slot = new_value;
        Ok(())
    }

    /// Subtract `amount` from one currency, rejecting overdraft.
    pub fn debit(&mut self, currency: Currency, amount: &Amount) -> Result<(), DomainError> {
        let slot = self.slot_mut(currency);
        if *slot < amount.value() {
            return Err(DomainError::InsufficientFunds {
                currency,
                required: amount.value(),
                available: *slot,
            });
        }
        *slot -= amount.value();
        Ok(())
    }

    /// Rescale every field to 8 decimal places so serialized balances read
    /// the same whether they came from the database or from in-memory
    /// arithmetic.
    pub fn normalized(mut self) -> Self {
        for currency in Currency::ALL {
            let slot = self.slot_mut(currency);
            slot.rescale(BALANCE_SCALE);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_zeroed_has_every_currency_at_zero() {
        let set = BalanceSet::zeroed();
        for currency in Currency::ALL {
            assert_eq!(set.get(currency), Decimal::ZERO);
        }
    }

    #[test]
    fn test_credit_then_debit() {
        let mut set = BalanceSet::zeroed();
        set.credit(Currency::Ars, dec!(100)).unwrap();
        assert_eq!(set.get(Currency::Ars), dec!(100));

        set.debit(Currency::Ars, &amount("30")).unwrap();
        assert_eq!(set.get(Currency::Ars), dec!(70));
    }

    #[test]
    fn test_debit_rejects_overdraft() {
        let mut set = BalanceSet::zeroed();
        set.credit(Currency::Usd, dec!(50)).unwrap();

        let err = set.debit(Currency::Usd, &amount("100")).unwrap_err();
        match err {
            DomainError::InsufficientFunds {
                currency,
                required,
                available,
            } => {
                assert_eq!(currency, Currency::Usd);
                assert_eq!(required, dec!(100));
                assert_eq!(available, dec!(50));
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other),
        }
        // Failed debit leaves the balance untouched
        assert_eq!(set.get(Currency::Usd), dec!(50));
    }

    #[test]
    fn test_debit_exact_balance_is_allowed() {
        let mut set = BalanceSet::zeroed();
        set.credit(Currency::Btc, dec!(0.5)).unwrap();
        set.debit(Currency::Btc, &amount("0.5")).unwrap();
        assert_eq!(set.get(Currency::Btc), Decimal::ZERO);
    }

    #[test]
    fn test_currencies_are_independent() {
        let mut set = BalanceSet::zeroed();
        set.credit(Currency::Eur, dec!(10)).unwrap();
        set.credit(Currency::Eth, dec!(2)).unwrap();

        assert_eq!(set.get(Currency::Eur), dec!(10));
        assert_eq!(set.get(Currency::Eth), dec!(2));
        assert_eq!(set.get(Currency::Usd), Decimal::ZERO);
    }

    #[test]
    fn test_credit_respects_cap() {
        let mut set = BalanceSet::zeroed();
        set.credit(Currency::Usdt, Amount::max_value()).unwrap();

        let err = set.credit(Currency::Usdt, dec!(1)).unwrap_err();
        assert!(matches!(
            err,
            DomainError::BalanceLimitExceeded {
                currency: Currency::Usdt
            }
        ));
    }

    #[test]
    fn test_normalized_pads_scale() {
        let mut set = BalanceSet::zeroed();
        set.credit(Currency::Ars, dec!(100)).unwrap();

        let normalized = set.normalized();
        assert_eq!(normalized.ars.to_string(), "100.00000000");
        // Value equality is unaffected by rescaling
        assert_eq!(normalized.ars, dec!(100));
    }

    #[test]
    fn test_serializes_with_uppercase_keys() {
        let set = BalanceSet::zeroed();
        let json = serde_json::to_value(&set).unwrap();
        for currency in Currency::ALL {
            assert!(json.get(currency.code()).is_some(), "missing {}", currency);
        }
    }
}
