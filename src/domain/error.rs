//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

use super::Currency;

/// Business rule violations and domain invariant failures.
///
/// These are independent of the web/infrastructure layer; `AppError` maps
/// them onto HTTP statuses.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// The source balance cannot cover the requested debit.
    #[error("Insufficient funds: required {required} {currency}, available {available}")]
    InsufficientFunds {
        currency: Currency,
        required: Decimal,
        available: Decimal,
    },

    /// Amount failed validation (zero, negative, malformed, too precise).
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code outside the supported set.
    #[error("Unsupported currency: {0}")]
    InvalidCurrency(String),

    /// Transfer whose resolved target is the sender's own account. No
    /// economic effect, rejected by policy.
    #[error("Cannot transfer to your own account")]
    SelfTransferRejected,

    /// Conversion between identical currencies. Rejected rather than
    /// silently treated as identity so callers detect the no-op.
    #[error("Cannot convert a currency to itself")]
    SameCurrencyRejected,

    /// Account not found (by id or by account number).
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// A credit would push a balance past the system-wide cap.
    #[error("Balance limit exceeded for {currency}")]
    BalanceLimitExceeded { currency: Currency },
}

impl DomainError {
    /// Validation errors: caller-input problems detected before any lock
    /// is touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_)
                | Self::InvalidCurrency(_)
                | Self::SelfTransferRejected
                | Self::SameCurrencyRejected
        )
    }

    /// State errors: detected inside the atomic unit against current truth.
    pub fn is_state(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::AccountNotFound(_)
                | Self::BalanceLimitExceeded { .. }
        )
    }
}

impl From<super::AmountError> for DomainError {
    fn from(err: super::AmountError) -> Self {
        DomainError::InvalidAmount(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_funds_message() {
        let err = DomainError::InsufficientFunds {
            currency: Currency::Ars,
            required: dec!(100),
            available: dec!(50),
        };

        assert!(err.is_state());
        assert!(!err.is_validation());
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("50"));
        assert!(err.to_string().contains("ARS"));
    }

    #[test]
    fn test_self_transfer_is_validation() {
        assert!(DomainError::SelfTransferRejected.is_validation());
        assert!(DomainError::SameCurrencyRejected.is_validation());
    }

    #[test]
    fn test_amount_error_converts() {
        let err: DomainError = crate::domain::AmountError::Overflow.into();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }
}
