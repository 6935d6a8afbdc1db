//! Ledger Soak Tool
//!
//! Hammers the ledger engine with concurrent transfers between two seeded
//! accounts and checks the conservation law at the end. Useful for
//! demonstrating the locking discipline against a real database.
//!
//! Run with: cargo run --bin soak --release -- --transfers 1000

use std::time::Instant;

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use cambio::domain::{AccountNumber, Amount, Currency};
use cambio::ledger::LedgerEngine;

async fn seed_account(pool: &PgPool, tag: &str) -> anyhow::Result<(Uuid, AccountNumber)> {
    let user_id = Uuid::new_v4();
    let account_id = Uuid::new_v4();
    let number = {
        let mut rng = rand::thread_rng();
        AccountNumber::random(&mut rng)
    };

    sqlx::query("INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(format!("soak-{}-{}@cambio.local", tag, user_id))
        .bind("0".repeat(64))
        .execute(pool)
        .await?;

    sqlx::query("INSERT INTO accounts (id, user_id, account_number) VALUES ($1, $2, $3)")
        .bind(account_id)
        .bind(user_id)
        .bind(number.as_str())
        .execute(pool)
        .await?;

    sqlx::query("INSERT INTO balances (account_id) VALUES ($1)")
        .bind(account_id)
        .execute(pool)
        .await?;

    Ok((account_id, number))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let transfer_count: u64 = args
        .iter()
        .position(|a| a == "--transfers")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Ledger soak - {} concurrent transfers", transfer_count);
    println!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    let (alice_id, alice_number) = seed_account(&pool, "alice").await?;
    let (bob_id, bob_number) = seed_account(&pool, "bob").await?;

    let engine = LedgerEngine::new(pool.clone(), 5000);

    // Give both sides something to move around
    let stake = Amount::new(Decimal::from(10_000))?;
    engine.credit(alice_id, Currency::Ars, stake).await?;
    engine.credit(bob_id, Currency::Ars, stake).await?;

    let start = Instant::now();
    let mut handles = Vec::with_capacity(transfer_count as usize);

    for i in 0..transfer_count {
        // Half the transfers go each way so the two accounts contend
        let (from, to) = if i % 2 == 0 {
            (alice_id, bob_number.clone())
        } else {
            (bob_id, alice_number.clone())
        };
        let engine = engine.clone();

        handles.push(tokio::spawn(async move {
            let amount = Amount::new(Decimal::ONE).expect("static amount");
            engine.transfer(from, &to, Currency::Ars, amount).await
        }));
    }

    let mut success = 0u64;
    let mut busy = 0u64;
    let mut failed = 0u64;
    for handle in handles {
        match handle.await? {
            Ok(_) => success += 1,
            Err(cambio::AppError::Busy) => busy += 1,
            Err(_) => failed += 1,
        }
    }

    let elapsed = start.elapsed();

    // Conservation: the two accounts started with 20k ARS between them and
    // only moved it back and forth
    let total: Decimal = sqlx::query_scalar(
        "SELECT SUM(ars) FROM balances WHERE account_id = $1 OR account_id = $2",
    )
    .bind(alice_id)
    .bind(bob_id)
    .fetch_one(&pool)
    .await?;

    println!(
        "Done in {:.2}s: {} ok, {} busy, {} failed ({:.0} tx/s)",
        elapsed.as_secs_f64(),
        success,
        busy,
        failed,
        success as f64 / elapsed.as_secs_f64()
    );
    println!("Combined ARS balance: {} (expected 20000)", total);

    if total != Decimal::from(20_000) {
        anyhow::bail!("conservation violated: {}", total);
    }

    Ok(())
}
