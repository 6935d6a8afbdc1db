//! Ledger engine
//!
//! The single owner of balance mutation. Exposes three operations
//! (credit, transfer, convert), each a one-shot atomic transition: either
//! the balances and the transaction log are updated together, or nothing
//! observable changes.
//!
//! Locking discipline: balance rows are taken `FOR UPDATE` in ascending
//! account-id order, sufficiency is evaluated against the locked row (never
//! a stale read), and no network I/O happens while a lock is held:
//! exchange quotes are fetched by the caller before entering the engine,
//! notifications go out after commit.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::amount::MAX_SCALE;
use crate::domain::{AccountNumber, Amount, BalanceSet, Currency, DomainError};
use crate::error::AppError;
use crate::rates::ExchangeQuote;

use super::store::{AccountRow, EntryKind, LedgerStore, NewEntry};

/// Outcome of a credit or conversion: the log id and the acting account's
/// resulting balances, so the caller can reconcile without a follow-up
/// read.
#[derive(Debug, Clone)]
pub struct LedgerReceipt {
    pub transaction_id: i64,
    pub balances: BalanceSet,
}

/// Outcome of a transfer. Carries the resolved target so the calling layer
/// can notify the recipient.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub transaction_id: i64,
    pub balances: BalanceSet,
    pub to_account: AccountRow,
}

/// Outcome of a conversion, including the rate actually applied and the
/// credited amount it produced.
#[derive(Debug, Clone)]
pub struct ConvertReceipt {
    pub transaction_id: i64,
    pub balances: BalanceSet,
    pub rate: Decimal,
    pub credited: Decimal,
}

/// The balance mutation engine.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    store: LedgerStore,
}

impl LedgerEngine {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            store: LedgerStore::new(pool, lock_timeout_ms),
        }
    }

    /// Credit an account: `balances[currency] += amount`.
    ///
    /// Input validation (currency, amount) happens before this is called;
    /// here the account's existence and the cap are checked against the
    /// locked row.
    pub async fn credit(
        &self,
        account_id: Uuid,
        currency: Currency,
        amount: Amount,
    ) -> Result<LedgerReceipt, AppError> {
        let mut tx = self.store.begin().await?;

        let mut balances = self
            .store
            .lock_balances(&mut tx, &[account_id])
            .await?
            .remove(&account_id)
            .ok_or_else(|| DomainError::AccountNotFound(account_id.to_string()))?;

        balances.credit(currency, amount.value())?;
        self.store.save_balances(&mut tx, account_id, &balances).await?;

        let transaction_id = self
            .store
            .append_entry(
                &mut tx,
                &NewEntry {
                    from_account_id: account_id,
                    to_account_id: account_id,
                    kind: EntryKind::Credit,
                    currency,
                    amount: amount.value(),
                    counter_currency: None,
                    counter_amount: None,
                    rate: None,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            account_id = %account_id,
            currency = %currency,
            amount = %amount,
            transaction_id,
            "Credit applied"
        );

        Ok(LedgerReceipt {
            transaction_id,
            balances: balances.normalized(),
        })
    }

    /// Move funds to another account, resolved by its public number.
    ///
    /// The target resolution, the self-transfer check, the sufficiency
    /// check and all three writes (debit, credit, log row) share one
    /// transaction. The conservation law holds on success; any failure
    /// leaves both accounts and the log untouched.
    pub async fn transfer(
        &self,
        from_account_id: Uuid,
        to_account_number: &AccountNumber,
        currency: Currency,
        amount: Amount,
    ) -> Result<TransferReceipt, AppError> {
        let mut tx = self.store.begin().await?;

        let target = self
            .store
            .account_by_number(&mut tx, to_account_number.as_str())
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(to_account_number.to_string()))?;

        // Self-transfer has no economic effect; rejected before any lock
        if target.id == from_account_id {
            return Err(DomainError::SelfTransferRejected.into());
        }

        let mut locked = self
            .store
            .lock_balances(&mut tx, &[from_account_id, target.id])
            .await?;

        let mut source = locked
            .remove(&from_account_id)
            .ok_or_else(|| DomainError::AccountNotFound(from_account_id.to_string()))?;
        let mut destination = locked
            .remove(&target.id)
            .ok_or_else(|| DomainError::AccountNotFound(target.id.to_string()))?;

        // Sufficiency is evaluated here, against the row we hold locked
        source.debit(currency, &amount)?;
        destination.credit(currency, amount.value())?;

        self.store
            .save_balances(&mut tx, from_account_id, &source)
            .await?;
        self.store
            .save_balances(&mut tx, target.id, &destination)
            .await?;

        let transaction_id = self
            .store
            .append_entry(
                &mut tx,
                &NewEntry {
                    from_account_id,
                    to_account_id: target.id,
                    kind: EntryKind::Transfer,
                    currency,
                    amount: amount.value(),
                    counter_currency: None,
                    counter_amount: None,
                    rate: None,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            from = %from_account_id,
            to = %target.id,
            currency = %currency,
            amount = %amount,
            transaction_id,
            "Transfer applied"
        );

        Ok(TransferReceipt {
            transaction_id,
            balances: source.normalized(),
            to_account: target,
        })
    }

    /// Exchange between two of the account's own balances at the quoted
    /// rate: `balances[from] -= amount; balances[to] += amount * rate`.
    ///
    /// The quote was fetched by the caller before any lock exists, and the
    /// same rate is used for the sufficiency check and the apply step;
    /// there is no re-fetch inside the lock window.
    pub async fn convert(
        &self,
        account_id: Uuid,
        quote: &ExchangeQuote,
        amount: Amount,
    ) -> Result<ConvertReceipt, AppError> {
        if quote.from == quote.to {
            return Err(DomainError::SameCurrencyRejected.into());
        }

        let credited = (amount.value() * quote.rate).round_dp(MAX_SCALE);
        if credited <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(
                "conversion result rounds to zero".to_string(),
            )
            .into());
        }

        let mut tx = self.store.begin().await?;

        let mut balances = self
            .store
            .lock_balances(&mut tx, &[account_id])
            .await?
            .remove(&account_id)
            .ok_or_else(|| DomainError::AccountNotFound(account_id.to_string()))?;

        balances.debit(quote.from, &amount)?;
        balances.credit(quote.to, credited)?;

        self.store.save_balances(&mut tx, account_id, &balances).await?;

        let transaction_id = self
            .store
            .append_entry(
                &mut tx,
                &NewEntry {
                    from_account_id: account_id,
                    to_account_id: account_id,
                    kind: EntryKind::Convert,
                    currency: quote.from,
                    amount: amount.value(),
                    counter_currency: Some(quote.to),
                    counter_amount: Some(credited),
                    rate: Some(quote.rate),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            account_id = %account_id,
            from = %quote.from,
            to = %quote.to,
            rate = %quote.rate,
            amount = %amount,
            credited = %credited,
            transaction_id,
            "Conversion applied"
        );

        Ok(ConvertReceipt {
            transaction_id,
            balances: balances.normalized(),
            rate: quote.rate,
            credited,
        })
    }
}
