//! Convert Handler
//!
//! Currency conversion on the acting account. The quote is fetched here,
//! before the engine takes any lock, and that single quote is used for
//! both the sufficiency check and the apply step.

use crate::auth::AuthenticatedAccount;
use crate::domain::{Amount, Currency, DomainError, OperationContext};
use crate::error::AppError;
use crate::ledger::LedgerEngine;
use crate::rates::RateProvider;

use super::{ConvertCommand, ConvertResult};

/// Handler for conversions.
pub struct ConvertHandler {
    engine: LedgerEngine,
    rates: RateProvider,
}

impl ConvertHandler {
    pub fn new(engine: LedgerEngine, rates: RateProvider) -> Self {
        Self { engine, rates }
    }

    /// Execute the convert command
    pub async fn execute(
        &self,
        actor: &AuthenticatedAccount,
        command: ConvertCommand,
        context: &OperationContext,
    ) -> Result<ConvertResult, AppError> {
        // Validation before any lock
        let from: Currency = command.from_currency.parse()?;
        let to: Currency = command.to_currency.parse()?;
        let amount: Amount = command.amount.parse()?;

        if from == to {
            return Err(DomainError::SameCurrencyRejected.into());
        }

        // One fresh quote per conversion, fetched while no lock is held
        let quote = self
            .rates
            .quote(from, to)
            .await
            .map_err(|e| AppError::RateUnavailable(e.to_string()))?;

        let receipt = self.engine.convert(actor.account_id, &quote, amount).await?;

        tracing::debug!(
            account_id = %actor.account_id,
            transaction_id = receipt.transaction_id,
            rate = %receipt.rate,
            correlation_id = ?context.correlation_id,
            "Conversion committed"
        );

        Ok(ConvertResult {
            transaction_id: receipt.transaction_id,
            from_currency: from,
            to_currency: to,
            rate: receipt.rate,
            debited: amount.value(),
            credited: receipt.credited,
            balances: receipt.balances,
        })
    }
}
