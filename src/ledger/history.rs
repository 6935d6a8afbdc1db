//! Transaction log, read side
//!
//! Reporting queries over the append-only `transactions` table. The write
//! side lives in the engine; nothing here takes locks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// One log row, shaped for the account that asked.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub kind: String,
    /// "in", "out", or "self" (credits and conversions)
    pub direction: String,
    pub amount: Decimal,
    pub currency: String,
    /// The other party's account number, absent for self-referencing rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Read access to the transaction log.
#[derive(Debug, Clone)]
pub struct LedgerHistory {
    pool: PgPool,
}

impl LedgerHistory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The most recent entries touching an account, newest first.
    pub async fn for_account(
        &self,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<HistoryEntry>, AppError> {
        type Row = (
            i64,
            String,
            String,
            Decimal,
            Option<String>,
            Option<Decimal>,
            Option<Decimal>,
            Uuid,
            Uuid,
            String,
            String,
            DateTime<Utc>,
        );

        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT t.id, t.kind, t.currency, t.amount,
                   t.counter_currency, t.counter_amount, t.rate,
                   t.from_account_id, t.to_account_id,
                   fa.account_number, ta.account_number,
                   t.created_at
            FROM transactions t
            JOIN accounts fa ON fa.id = t.from_account_id
            JOIN accounts ta ON ta.id = t.to_account_id
            WHERE t.from_account_id = $1 OR t.to_account_id = $1
            ORDER BY t.id DESC
            LIMIT $2
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(
                |(
                    id,
                    kind,
                    currency,
                    amount,
                    counter_currency,
                    counter_amount,
                    rate,
                    from_account_id,
                    to_account_id,
                    from_number,
                    to_number,
                    created_at,
                )| {
                    let (direction, counterparty) = if from_account_id == to_account_id {
                        ("self".to_string(), None)
                    } else if from_account_id == account_id {
                        ("out".to_string(), Some(to_number))
                    } else {
                        ("in".to_string(), Some(from_number))
                    };

                    HistoryEntry {
                        id,
                        kind,
                        direction,
                        amount,
                        currency,
                        counterparty,
                        counter_currency,
                        counter_amount,
                        rate,
                        created_at,
                    }
                },
            )
            .collect();

        Ok(entries)
    }
}
