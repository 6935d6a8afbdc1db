//! Ledger persistence
//!
//! Row-level storage operations for the ledger engine, all composable into
//! one atomic unit. Every mutating operation runs inside a single Postgres
//! transaction with a bounded `lock_timeout`; balance rows are taken with
//! `SELECT ... FOR UPDATE` in ascending account-id order so two operations
//! touching the same pair of accounts can never deadlock.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{BalanceSet, Currency};
use crate::error::AppError;

/// Postgres SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// An account row (no balances).
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_number: String,
}

/// What a transaction-log row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Credit,
    Transfer,
    Convert,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Credit => "credit",
            EntryKind::Transfer => "transfer",
            EntryKind::Convert => "convert",
        }
    }
}

/// A transaction-log row to append. Credits and conversions use the
/// self-reference sentinel (`from_account_id == to_account_id`).
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub kind: EntryKind,
    pub currency: Currency,
    pub amount: Decimal,
    pub counter_currency: Option<Currency>,
    pub counter_amount: Option<Decimal>,
    pub rate: Option<Decimal>,
}

/// Storage operations for the ledger engine.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl LedgerStore {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }

    /// Open the atomic unit: a transaction whose lock waits are bounded.
    /// A wait that exceeds the bound surfaces as `AppError::Busy` with no
    /// mutation applied.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        let mut tx = self.pool.begin().await?;

        // SET LOCAL scopes the timeout to this transaction only
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout_ms
        ))
        .execute(&mut *tx)
        .await?;

        Ok(tx)
    }

    /// Resolve a public account number to its account (no lock).
    pub async fn account_by_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_number: &str,
    ) -> Result<Option<AccountRow>, AppError> {
        let row: Option<(Uuid, Uuid, String)> = sqlx::query_as(
            r#"
            SELECT id, user_id, account_number
            FROM accounts
            WHERE account_number = $1
            "#,
        )
        .bind(account_number)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(|(id, user_id, account_number)| AccountRow {
            id,
            user_id,
            account_number,
        }))
    }

    /// Lock and read the balance rows for the given accounts.
    ///
    /// Rows are locked one at a time in ascending account-id order, the
    /// fixed global ordering that prevents deadlock between two transfers
    /// targeting each other's accounts in opposite directions. The values
    /// returned are the current truth as of the lock, which holds until
    /// commit or rollback.
    ///
    /// Accounts without a balance row are simply absent from the result;
    /// the engine turns that into `AccountNotFound`.
    pub async fn lock_balances(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, BalanceSet>, AppError> {
        let mut ordered: Vec<Uuid> = account_ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut result = HashMap::with_capacity(ordered.len());

        for account_id in ordered {
            let row: Option<(Decimal, Decimal, Decimal, Decimal, Decimal, Decimal)> =
                sqlx::query_as(
                    r#"
                    SELECT ars, usd, eur, btc, eth, usdt
                    FROM balances
                    WHERE account_id = $1
                    FOR UPDATE
                    "#,
                )
                .bind(account_id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_lock_error)?;

            if let Some((ars, usd, eur, btc, eth, usdt)) = row {
                result.insert(
                    account_id,
                    BalanceSet {
                        ars,
                        usd,
                        eur,
                        btc,
                        eth,
                        usdt,
                    },
                );
            }
        }

        Ok(result)
    }

    /// Persist a mutated balance record. The row is already locked by this
    /// transaction.
    pub async fn save_balances(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        balances: &BalanceSet,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE balances
            SET ars = $2, usd = $3, eur = $4, btc = $5, eth = $6, usdt = $7,
                updated_at = NOW()
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .bind(balances.ars)
        .bind(balances.usd)
        .bind(balances.eur)
        .bind(balances.btc)
        .bind(balances.eth)
        .bind(balances.usdt)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Append one transaction-log row. Ids come from a BIGSERIAL, so they
    /// are monotonic and unique. The row commits or rolls back together
    /// with the balance writes it records.
    pub async fn append_entry(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entry: &NewEntry,
    ) -> Result<i64, AppError> {
        let transaction_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (
                from_account_id, to_account_id, kind, currency, amount,
                counter_currency, counter_amount, rate
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(entry.from_account_id)
        .bind(entry.to_account_id)
        .bind(entry.kind.as_str())
        .bind(entry.currency.code())
        .bind(entry.amount)
        .bind(entry.counter_currency.map(|c| c.code()))
        .bind(entry.counter_amount)
        .bind(entry.rate)
        .fetch_one(&mut **tx)
        .await?;

        Ok(transaction_id)
    }
}

/// Map a `lock_timeout` expiry (SQLSTATE 55P03) to `Busy`; everything else
/// passes through as a database error.
pub fn map_lock_error(e: sqlx::Error) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            return AppError::Busy;
        }
    }
    AppError::Database(e)
}

/// Whether this error is a unique constraint violation, optionally on a
/// specific constraint. Used by registration to detect account-number
/// collisions.
pub fn is_unique_violation(e: &sqlx::Error, constraint: Option<&str>) -> bool {
    match e.as_database_error() {
        Some(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => match constraint {
            Some(name) => db_err.constraint() == Some(name),
            None => true,
        },
        _ => false,
    }
}
