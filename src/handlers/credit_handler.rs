//! Credit Handler
//!
//! Credits the acting account and fires the (best-effort) notification
//! after the mutation has committed.

use crate::auth::AuthenticatedAccount;
use crate::domain::{Amount, Currency, OperationContext};
use crate::error::AppError;
use crate::ledger::LedgerEngine;
use crate::notifier::{spawn_notify, Notifier};

use super::{CreditCommand, CreditResult};

/// Handler for credits.
pub struct CreditHandler {
    engine: LedgerEngine,
    notifier: Notifier,
}

impl CreditHandler {
    pub fn new(engine: LedgerEngine, notifier: Notifier) -> Self {
        Self { engine, notifier }
    }

    /// Execute the credit command
    pub async fn execute(
        &self,
        actor: &AuthenticatedAccount,
        command: CreditCommand,
        context: &OperationContext,
    ) -> Result<CreditResult, AppError> {
        // Validation before any lock
        let currency: Currency = command.currency.parse()?;
        let amount: Amount = command.amount.parse()?;

        let receipt = self.engine.credit(actor.account_id, currency, amount).await?;

        tracing::debug!(
            account_id = %actor.account_id,
            transaction_id = receipt.transaction_id,
            correlation_id = ?context.correlation_id,
            "Credit committed"
        );

        // Notification failure must never roll back the committed credit
        spawn_notify(
            self.notifier.clone(),
            actor.email.clone(),
            "Funds credited".to_string(),
            format!(
                "Your account {} was credited {} {}.",
                actor.account_number, amount, currency
            ),
        );

        Ok(CreditResult {
            transaction_id: receipt.transaction_id,
            currency,
            amount: amount.value(),
            balances: receipt.balances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_command() {
        let cmd = CreditCommand::new("USD".to_string(), "250.00".to_string());
        assert_eq!(cmd.currency, "USD");
        assert_eq!(cmd.amount, "250.00");
    }
}
