//! Command definitions
//!
//! Commands represent intentions to change the system state. Amounts and
//! currency codes arrive as strings and are validated by the handlers
//! before anything touches the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{BalanceSet, Currency};

// =========================================================================
// RegisterCommand
// =========================================================================

/// Command to register a user and open their wallet account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
}

impl RegisterCommand {
    pub fn new(email: String, password: String) -> Self {
        Self { email, password }
    }
}

// =========================================================================
// CreditCommand
// =========================================================================

/// Command to credit the acting account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCommand {
    /// Currency code (must belong to the supported set)
    pub currency: String,
    /// Amount to credit (as string for precise decimal)
    pub amount: String,
}

impl CreditCommand {
    pub fn new(currency: String, amount: String) -> Self {
        Self { currency, amount }
    }
}

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to transfer funds to another account, targeted by its public
/// account number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    /// Target account routing number
    pub to_account_number: String,
    /// Currency code
    pub currency: String,
    /// Amount to transfer (as string for precise decimal)
    pub amount: String,
}

impl TransferCommand {
    pub fn new(to_account_number: String, currency: String, amount: String) -> Self {
        Self {
            to_account_number,
            currency,
            amount,
        }
    }
}

// =========================================================================
// ConvertCommand
// =========================================================================

/// Command to exchange between two of the acting account's balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertCommand {
    pub from_currency: String,
    pub to_currency: String,
    /// Amount to convert, denominated in `from_currency`
    pub amount: String,
}

impl ConvertCommand {
    pub fn new(from_currency: String, to_currency: String, amount: String) -> Self {
        Self {
            from_currency,
            to_currency,
            amount,
        }
    }
}

// =========================================================================
// Results
// =========================================================================

/// Result of a successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResult {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub account_number: String,
}

/// Result of a successful credit.
#[derive(Debug, Clone, Serialize)]
pub struct CreditResult {
    pub transaction_id: i64,
    pub currency: Currency,
    pub amount: Decimal,
    pub balances: BalanceSet,
}

/// Result of a successful transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub transaction_id: i64,
    pub to_account_number: String,
    pub currency: Currency,
    pub amount: Decimal,
    pub balances: BalanceSet,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertResult {
    pub transaction_id: i64,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub rate: Decimal,
    pub debited: Decimal,
    pub credited: Decimal,
    pub balances: BalanceSet,
}
