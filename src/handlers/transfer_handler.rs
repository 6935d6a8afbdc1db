//! Transfer Handler
//!
//! Peer-to-peer transfers targeted by public account number, with full
//! validation before the engine's atomic unit runs.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthenticatedAccount;
use crate::domain::{AccountNumber, Amount, Currency, DomainError, OperationContext};
use crate::error::AppError;
use crate::ledger::LedgerEngine;
use crate::notifier::{spawn_notify, Notifier};

use super::{TransferCommand, TransferResult};

/// Handler for transfers.
pub struct TransferHandler {
    pool: PgPool,
    engine: LedgerEngine,
    notifier: Notifier,
}

impl TransferHandler {
    pub fn new(pool: PgPool, engine: LedgerEngine, notifier: Notifier) -> Self {
        Self {
            pool,
            engine,
            notifier,
        }
    }

    /// Execute the transfer command
    pub async fn execute(
        &self,
        actor: &AuthenticatedAccount,
        command: TransferCommand,
        context: &OperationContext,
    ) -> Result<TransferResult, AppError> {
        // Validation before any lock
        let currency: Currency = command.currency.parse()?;
        let amount: Amount = command.amount.parse()?;
        let to_number = AccountNumber::parse(&command.to_account_number)?;

        // The engine re-checks after resolving the target; this catches the
        // obvious case without a round trip
        if to_number.as_str() == actor.account_number {
            return Err(DomainError::SelfTransferRejected.into());
        }

        let receipt = self
            .engine
            .transfer(actor.account_id, &to_number, currency, amount)
            .await?;

        tracing::debug!(
            from = %actor.account_id,
            to = %receipt.to_account.id,
            transaction_id = receipt.transaction_id,
            correlation_id = ?context.correlation_id,
            "Transfer committed"
        );

        // Best-effort: tell the recipient, after commit, off the hot path
        if let Some(email) = self.recipient_email(receipt.to_account.user_id).await {
            spawn_notify(
                self.notifier.clone(),
                email,
                "Funds received".to_string(),
                format!(
                    "Your account {} received {} {}.",
                    receipt.to_account.account_number, amount, currency
                ),
            );
        }

        Ok(TransferResult {
            transaction_id: receipt.transaction_id,
            to_account_number: receipt.to_account.account_number,
            currency,
            amount: amount.value(),
            balances: receipt.balances,
        })
    }

    /// Look up the recipient's email. Failures only cost the notification.
    async fn recipient_email(&self, user_id: Uuid) -> Option<String> {
        match sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Recipient email lookup failed");
                None
            }
        }
    }
}
