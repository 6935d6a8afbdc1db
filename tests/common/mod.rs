//! Common test utilities
//!
//! Tests share one database and run in parallel, so every test works with
//! its own freshly seeded accounts and scopes its assertions to them.

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use cambio::auth;
use cambio::domain::{AccountNumber, BalanceSet};

/// Password used for every seeded test user.
pub const TEST_PASSWORD: &str = "password-123";

/// Connect to the test database.
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB")
}

/// An email no other test (or test run) will collide with.
pub fn unique_email(tag: &str) -> String {
    format!("{}-{}@example.com", tag, Uuid::new_v4())
}

/// A seeded user with their wallet account.
#[derive(Debug, Clone)]
pub struct TestAccount {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub account_number: String,
    pub email: String,
}

/// Seed a user + account + zeroed balance row directly, bypassing the API.
pub async fn seed_account(pool: &PgPool, tag: &str) -> TestAccount {
    let user_id = Uuid::new_v4();
    let account_id = Uuid::new_v4();
    let email = unique_email(tag);
    let account_number = {
        let mut rng = rand::thread_rng();
        AccountNumber::random(&mut rng)
    };

    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(&email)
        .bind(auth::hash_secret(TEST_PASSWORD))
        .execute(pool)
        .await
        .expect("Failed to seed user");

    sqlx::query("INSERT INTO accounts (id, user_id, account_number) VALUES ($1, $2, $3)")
        .bind(account_id)
        .bind(user_id)
        .bind(account_number.as_str())
        .execute(pool)
        .await
        .expect("Failed to seed account");

    sqlx::query("INSERT INTO balances (account_id) VALUES ($1)")
        .bind(account_id)
        .execute(pool)
        .await
        .expect("Failed to seed balance row");

    TestAccount {
        user_id,
        account_id,
        account_number: account_number.to_string(),
        email,
    }
}

/// Read an account's full balance record.
pub async fn balances(pool: &PgPool, account_id: Uuid) -> BalanceSet {
    let (ars, usd, eur, btc, eth, usdt): (Decimal, Decimal, Decimal, Decimal, Decimal, Decimal) =
        sqlx::query_as("SELECT ars, usd, eur, btc, eth, usdt FROM balances WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(pool)
            .await
            .expect("Failed to read balances");

    BalanceSet {
        ars,
        usd,
        eur,
        btc,
        eth,
        usdt,
    }
}

/// Number of transaction-log rows touching an account.
pub async fn account_log_count(pool: &PgPool, account_id: Uuid) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE from_account_id = $1 OR to_account_id = $1",
    )
    .bind(account_id)
    .fetch_one(pool)
    .await
    .expect("Failed to count transactions")
}
