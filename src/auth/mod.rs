//! Authenticator boundary
//!
//! Credential handling for the wallet: password verification, bearer-token
//! sessions, and resolution of a token to the acting account. The ledger
//! engine trusts the identity produced here; it never inspects credentials
//! itself.
//!
//! Secrets are stored as sha256 hex digests, never in the clear.

use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// The acting identity resolved from a request credential.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub account_number: String,
    pub email: String,
}

/// sha256 hex digest of a secret (passwords, session tokens).
pub fn hash_secret(secret: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Draw a fresh opaque session token (64 hex chars).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Verify an email/password pair. Returns the user id on success,
/// `Unauthenticated` otherwise. Deactivated users cannot log in.
pub async fn verify_password(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<Uuid, AppError> {
    let row: Option<(Uuid, String)> = sqlx::query_as(
        r#"
        SELECT id, password_hash
        FROM users
        WHERE LOWER(email) = LOWER($1) AND is_active
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((user_id, stored_hash)) if stored_hash == hash_secret(password) => Ok(user_id),
        _ => Err(AppError::Unauthenticated),
    }
}

/// Issue a session for a user. Returns the raw token; only its hash is
/// persisted.
pub async fn issue_session(
    pool: &PgPool,
    user_id: Uuid,
    ttl_hours: i64,
) -> Result<(String, chrono::DateTime<Utc>), AppError> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    sqlx::query(
        r#"
        INSERT INTO sessions (token_hash, user_id, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(hash_secret(&token))
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok((token, expires_at))
}

/// Resolve a bearer token to the acting account, or fail with
/// `Unauthenticated` (unknown token, expired session, deactivated user).
pub async fn authenticate(pool: &PgPool, token: &str) -> Result<AuthenticatedAccount, AppError> {
    let row: Option<(Uuid, String, Uuid, String)> = sqlx::query_as(
        r#"
        SELECT u.id, u.email, a.id, a.account_number
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        JOIN accounts a ON a.user_id = u.id
        WHERE s.token_hash = $1 AND s.expires_at > NOW() AND u.is_active
        "#,
    )
    .bind(hash_secret(token))
    .fetch_optional(pool)
    .await?;

    let (user_id, email, account_id, account_number) =
        row.ok_or(AppError::Unauthenticated)?;

    Ok(AuthenticatedAccount {
        user_id,
        account_id,
        account_number,
        email,
    })
}
