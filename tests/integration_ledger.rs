//! Ledger engine integration tests
//!
//! Exercise the balance mutation core against a real database: the
//! conservation law, overdraft protection under concurrency, atomicity on
//! failure paths, and account-number uniqueness under concurrent
//! registration.

use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use cambio::domain::{AccountNumber, Amount, Currency, DomainError, OperationContext};
use cambio::handlers::{RegisterCommand, RegisterHandler};
use cambio::ledger::LedgerEngine;
use cambio::rates::ExchangeQuote;
use cambio::AppError;

mod common;

const LOCK_TIMEOUT_MS: u64 = 5000;

fn amount(s: &str) -> Amount {
    s.parse().expect("test amount")
}

// =========================================================================
// Scenario A: a full-balance transfer moves the funds and logs one row
// =========================================================================

#[tokio::test]
async fn test_transfer_moves_funds_and_logs_once() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let x = common::seed_account(&pool, "x").await;
    let y = common::seed_account(&pool, "y").await;

    engine
        .credit(x.account_id, Currency::Ars, amount("100"))
        .await
        .unwrap();

    let to = AccountNumber::parse(&y.account_number).unwrap();
    let receipt = engine
        .transfer(x.account_id, &to, Currency::Ars, amount("100"))
        .await
        .unwrap();

    assert_eq!(receipt.balances.ars, Decimal::ZERO);

    let x_balances = common::balances(&pool, x.account_id).await;
    let y_balances = common::balances(&pool, y.account_id).await;
    assert_eq!(x_balances.ars, Decimal::ZERO);
    assert_eq!(y_balances.ars, dec!(100));

    let transfer_rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE kind = 'transfer' AND from_account_id = $1",
    )
    .bind(x.account_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(transfer_rows, 1);
}

// =========================================================================
// Scenario B: insufficient funds rejects and changes nothing
// =========================================================================

#[tokio::test]
async fn test_insufficient_funds_leaves_no_trace() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let x = common::seed_account(&pool, "x").await;
    let y = common::seed_account(&pool, "y").await;

    engine
        .credit(x.account_id, Currency::Ars, amount("50"))
        .await
        .unwrap();
    let log_before = common::account_log_count(&pool, x.account_id).await;

    let to = AccountNumber::parse(&y.account_number).unwrap();
    let err = engine
        .transfer(x.account_id, &to, Currency::Ars, amount("100"))
        .await
        .unwrap_err();

    match err {
        AppError::Domain(DomainError::InsufficientFunds {
            currency,
            required,
            available,
        }) => {
            assert_eq!(currency, Currency::Ars);
            assert_eq!(required, dec!(100));
            assert_eq!(available, dec!(50));
        }
        other => panic!("Expected InsufficientFunds, got {:?}", other),
    }

    // No balance change, no orphan log row
    assert_eq!(common::balances(&pool, x.account_id).await.ars, dec!(50));
    assert_eq!(
        common::balances(&pool, y.account_id).await.ars,
        Decimal::ZERO
    );
    assert_eq!(
        common::account_log_count(&pool, x.account_id).await,
        log_before
    );
}

// =========================================================================
// Scenario C: conversion applies the quoted rate to both sides
// =========================================================================

#[tokio::test]
async fn test_convert_applies_quoted_rate() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let x = common::seed_account(&pool, "x").await;
    engine
        .credit(x.account_id, Currency::Usd, amount("10"))
        .await
        .unwrap();

    let quote = ExchangeQuote {
        from: Currency::Usd,
        to: Currency::Eur,
        rate: dec!(0.9),
    };
    let receipt = engine
        .convert(x.account_id, &quote, amount("10"))
        .await
        .unwrap();

    assert_eq!(receipt.credited, dec!(9));

    let balances = common::balances(&pool, x.account_id).await;
    assert_eq!(balances.usd, Decimal::ZERO);
    assert_eq!(balances.eur, dec!(9));

    // The log row records the rate actually applied
    let (kind, rate): (String, Option<Decimal>) = sqlx::query_as(
        "SELECT kind, rate FROM transactions WHERE from_account_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(x.account_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(kind, "convert");
    assert_eq!(rate, Some(dec!(0.9)));
}

// =========================================================================
// Scenario D: self-transfer is rejected with no state change
// =========================================================================

#[tokio::test]
async fn test_self_transfer_rejected() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let x = common::seed_account(&pool, "x").await;
    engine
        .credit(x.account_id, Currency::Ars, amount("10"))
        .await
        .unwrap();
    let log_before = common::account_log_count(&pool, x.account_id).await;

    let own_number = AccountNumber::parse(&x.account_number).unwrap();
    let err = engine
        .transfer(x.account_id, &own_number, Currency::Ars, amount("10"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Domain(DomainError::SelfTransferRejected)
    ));
    assert_eq!(common::balances(&pool, x.account_id).await.ars, dec!(10));
    assert_eq!(
        common::account_log_count(&pool, x.account_id).await,
        log_before
    );
}

// =========================================================================
// Conservation: transfers never create or destroy money
// =========================================================================

#[tokio::test]
async fn test_conservation_across_transfer_sequence() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let a = common::seed_account(&pool, "a").await;
    let b = common::seed_account(&pool, "b").await;
    let c = common::seed_account(&pool, "c").await;
    let ids: Vec<Uuid> = vec![a.account_id, b.account_id, c.account_id];

    engine
        .credit(a.account_id, Currency::Usdt, amount("300"))
        .await
        .unwrap();
    engine
        .credit(b.account_id, Currency::Usdt, amount("200"))
        .await
        .unwrap();

    let total_before: Decimal =
        sqlx::query_scalar("SELECT SUM(usdt) FROM balances WHERE account_id = ANY($1)")
            .bind(&ids)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(total_before, dec!(500));

    let b_number = AccountNumber::parse(&b.account_number).unwrap();
    let c_number = AccountNumber::parse(&c.account_number).unwrap();
    let a_number = AccountNumber::parse(&a.account_number).unwrap();

    engine
        .transfer(a.account_id, &b_number, Currency::Usdt, amount("120.5"))
        .await
        .unwrap();
    engine
        .transfer(b.account_id, &c_number, Currency::Usdt, amount("57.25"))
        .await
        .unwrap();
    engine
        .transfer(c.account_id, &a_number, Currency::Usdt, amount("0.00000001"))
        .await
        .unwrap();

    let total_after: Decimal =
        sqlx::query_scalar("SELECT SUM(usdt) FROM balances WHERE account_id = ANY($1)")
            .bind(&ids)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(total_after, dec!(500));
}

// =========================================================================
// Concurrency: two full-balance debits cannot both succeed
// =========================================================================

#[tokio::test]
async fn test_concurrent_overdraft_race() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let x = common::seed_account(&pool, "x").await;
    let y = common::seed_account(&pool, "y").await;
    let z = common::seed_account(&pool, "z").await;

    engine
        .credit(x.account_id, Currency::Ars, amount("100"))
        .await
        .unwrap();

    let y_number = AccountNumber::parse(&y.account_number).unwrap();
    let z_number = AccountNumber::parse(&z.account_number).unwrap();

    let engine_a = engine.clone();
    let engine_b = engine.clone();
    let x_id = x.account_id;

    let task_a = tokio::spawn(async move {
        engine_a
            .transfer(x_id, &y_number, Currency::Ars, amount("100"))
            .await
    });
    let task_b = tokio::spawn(async move {
        engine_b
            .transfer(x_id, &z_number, Currency::Ars, amount("100"))
            .await
    });

    let (result_a, result_b) = (task_a.await.unwrap(), task_b.await.unwrap());

    let successes = [&result_a, &result_b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one transfer may win the race");

    let loser = if result_a.is_err() { result_a } else { result_b };
    assert!(matches!(
        loser.unwrap_err(),
        AppError::Domain(DomainError::InsufficientFunds { .. })
    ));

    // The 100 ARS ended up in exactly one destination
    let x_ars = common::balances(&pool, x.account_id).await.ars;
    let y_ars = common::balances(&pool, y.account_id).await.ars;
    let z_ars = common::balances(&pool, z.account_id).await.ars;
    assert_eq!(x_ars, Decimal::ZERO);
    assert_eq!(y_ars + z_ars, dec!(100));
}

// =========================================================================
// Opposing transfers on the same pair do not deadlock
// =========================================================================

#[tokio::test]
async fn test_opposing_transfers_complete() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let a = common::seed_account(&pool, "a").await;
    let b = common::seed_account(&pool, "b").await;

    engine
        .credit(a.account_id, Currency::Eth, amount("50"))
        .await
        .unwrap();
    engine
        .credit(b.account_id, Currency::Eth, amount("50"))
        .await
        .unwrap();

    let a_number = AccountNumber::parse(&a.account_number).unwrap();
    let b_number = AccountNumber::parse(&b.account_number).unwrap();

    // Many rounds in both directions at once; ordered locking means none
    // of these can deadlock and every one must terminate
    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine_ab = engine.clone();
        let engine_ba = engine.clone();
        let (a_id, b_id) = (a.account_id, b.account_id);
        let b_num = b_number.clone();
        let a_num = a_number.clone();

        handles.push(tokio::spawn(async move {
            engine_ab
                .transfer(a_id, &b_num, Currency::Eth, amount("1"))
                .await
        }));
        handles.push(tokio::spawn(async move {
            engine_ba
                .transfer(b_id, &a_num, Currency::Eth, amount("1"))
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Equal traffic both ways: back where we started, nothing lost
    assert_eq!(common::balances(&pool, a.account_id).await.eth, dec!(50));
    assert_eq!(common::balances(&pool, b.account_id).await.eth, dec!(50));
}

// =========================================================================
// Busy: a bounded lock wait fails cleanly instead of hanging
// =========================================================================

#[tokio::test]
async fn test_contended_lock_times_out_as_busy() {
    let pool = common::setup_test_db().await;

    let x = common::seed_account(&pool, "x").await;

    let patient = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);
    patient
        .credit(x.account_id, Currency::Usd, amount("10"))
        .await
        .unwrap();

    // Park a foreign transaction on X's balance row
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT account_id FROM balances WHERE account_id = $1 FOR UPDATE")
        .bind(x.account_id)
        .fetch_one(&mut *blocker)
        .await
        .unwrap();

    // An engine with a 100ms lock budget must give up with Busy
    let impatient = LedgerEngine::new(pool.clone(), 100);
    let err = impatient
        .credit(x.account_id, Currency::Usd, amount("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Busy));

    blocker.rollback().await.unwrap();

    // Nothing was applied by the timed-out attempt
    assert_eq!(common::balances(&pool, x.account_id).await.usd, dec!(10));
}

// =========================================================================
// Conversion edge cases
// =========================================================================

#[tokio::test]
async fn test_convert_same_currency_rejected() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let x = common::seed_account(&pool, "x").await;
    engine
        .credit(x.account_id, Currency::Usd, amount("10"))
        .await
        .unwrap();

    let quote = ExchangeQuote {
        from: Currency::Usd,
        to: Currency::Usd,
        rate: dec!(1),
    };
    let err = engine
        .convert(x.account_id, &quote, amount("10"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::SameCurrencyRejected)
    ));
}

#[tokio::test]
async fn test_convert_insufficient_funds_changes_nothing() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let x = common::seed_account(&pool, "x").await;
    engine
        .credit(x.account_id, Currency::Usd, amount("5"))
        .await
        .unwrap();
    let log_before = common::account_log_count(&pool, x.account_id).await;

    let quote = ExchangeQuote {
        from: Currency::Usd,
        to: Currency::Eur,
        rate: dec!(0.9),
    };
    let err = engine
        .convert(x.account_id, &quote, amount("10"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InsufficientFunds { .. })
    ));

    let balances = common::balances(&pool, x.account_id).await;
    assert_eq!(balances.usd, dec!(5));
    assert_eq!(balances.eur, Decimal::ZERO);
    assert_eq!(
        common::account_log_count(&pool, x.account_id).await,
        log_before
    );
}

// =========================================================================
// Credit edge cases
// =========================================================================

#[tokio::test]
async fn test_credit_unknown_account() {
    let pool = common::setup_test_db().await;
    let engine = LedgerEngine::new(pool.clone(), LOCK_TIMEOUT_MS);

    let err = engine
        .credit(Uuid::new_v4(), Currency::Ars, amount("10"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::AccountNotFound(_))
    ));
}

// =========================================================================
// Account-number uniqueness under concurrent registration
// =========================================================================

#[tokio::test]
async fn test_concurrent_registrations_yield_distinct_numbers() {
    let pool = common::setup_test_db().await;

    let mut handles = Vec::new();
    for i in 0..20 {
        let pool = pool.clone();
        let email = common::unique_email(&format!("user{}", i));
        handles.push(tokio::spawn(async move {
            let handler = RegisterHandler::new(pool);
            let command = RegisterCommand::new(email, "password-123".to_string());
            handler.execute(command, &OperationContext::new()).await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let result = handle.await.unwrap().expect("registration failed");
        numbers.insert(result.account_number);
    }

    assert_eq!(numbers.len(), 20, "all account numbers pairwise distinct");

    // And each round-trips to exactly one account
    for number in &numbers {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE account_number = $1")
                .bind(number)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }
}
