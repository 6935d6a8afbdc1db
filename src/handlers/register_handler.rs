//! Registration Handler
//!
//! Creates a user together with their wallet account and zeroed balance
//! row, all in one transaction. The account number comes from the
//! generator: random candidates are inserted until the unique index
//! accepts one; a bounded number of storage-level collisions fails the
//! registration with `ExhaustedRetries`.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth;
use crate::domain::identifier::MAX_GENERATION_ATTEMPTS;
use crate::domain::{AccountNumber, OperationContext};
use crate::error::AppError;
use crate::ledger::is_unique_violation;

use super::{RegisterCommand, RegisterResult};

const MIN_PASSWORD_LEN: usize = 8;

/// Handler for user registration.
pub struct RegisterHandler {
    pool: PgPool,
}

impl RegisterHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Execute the register command
    pub async fn execute(
        &self,
        command: RegisterCommand,
        context: &OperationContext,
    ) -> Result<RegisterResult, AppError> {
        let email = command.email.trim().to_string();
        if email.is_empty() || !email.contains('@') || email.len() > 254 {
            return Err(AppError::InvalidRequest("Invalid email address".to_string()));
        }
        if command.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        // Friendly pre-check; the unique index on users(email) remains the
        // authority under races
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(&email)
                .fetch_one(&self.pool)
                .await?;
        if taken {
            return Err(AppError::InvalidRequest(
                "Email is already registered".to_string(),
            ));
        }

        let password_hash = auth::hash_secret(&command.password);
        let user_id = Uuid::new_v4();
        let account_id = Uuid::new_v4();

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            // ThreadRng is not Send; scope it so it never lives across an await
            let candidate = {
                let mut rng = rand::thread_rng();
                AccountNumber::random(&mut rng)
            };

            match self
                .try_insert(user_id, account_id, &email, &password_hash, &candidate)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        user_id = %user_id,
                        account_id = %account_id,
                        account_number = %candidate,
                        correlation_id = ?context.correlation_id,
                        "User registered"
                    );
                    return Ok(RegisterResult {
                        user_id,
                        account_id,
                        account_number: candidate.to_string(),
                    });
                }
                Err(AppError::Database(e))
                    if is_unique_violation(&e, Some("accounts_account_number_key")) =>
                {
                    tracing::warn!(
                        attempt,
                        account_number = %candidate,
                        "Account number collision, drawing a new candidate"
                    );
                    continue;
                }
                Err(AppError::Database(e)) if is_unique_violation(&e, Some("users_email_key")) => {
                    return Err(AppError::InvalidRequest(
                        "Email is already registered".to_string(),
                    ));
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::ExhaustedRetries)
    }

    /// One attempt: user + account + zeroed balance row, atomically.
    async fn try_insert(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        email: &str,
        password_hash: &str,
        account_number: &AccountNumber,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, user_id, account_number)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .bind(account_number.as_str())
        .execute(&mut *tx)
        .await?;

        // Every currency present from the start; column defaults are zero
        sqlx::query("INSERT INTO balances (account_id) VALUES ($1)")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_command() {
        let cmd = RegisterCommand::new("alice@example.com".to_string(), "s3cret-pass".to_string());
        assert_eq!(cmd.email, "alice@example.com");
    }

    #[test]
    fn test_min_password_length_constant() {
        assert!(MIN_PASSWORD_LEN >= 8);
    }
}
