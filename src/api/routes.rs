//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{self, AuthenticatedAccount};
use crate::domain::{BalanceSet, Currency, OperationContext};
use crate::error::AppError;
use crate::handlers::{
    ConvertCommand, ConvertHandler, CreditCommand, CreditHandler, RegisterCommand,
    RegisterHandler, TransferCommand, TransferHandler,
};
use crate::ledger::{HistoryEntry, LedgerHistory};

use super::AppState;

/// Cap on history pages.
const HISTORY_LIMIT: i64 = 100;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub account_number: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account_id: Uuid,
    pub account_number: String,
    pub email: String,
    pub balances: BalanceSet,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub account_number: String,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    pub currency: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct CreditResponse {
    pub transaction_id: i64,
    pub currency: Currency,
    pub amount: Decimal,
    pub balances: BalanceSet,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to_account_number: String,
    pub currency: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transaction_id: i64,
    pub to_account_number: String,
    pub currency: Currency,
    pub amount: Decimal,
    pub balances: BalanceSet,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub transaction_id: i64,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub rate: Decimal,
    pub debited: Decimal,
    pub credited: Decimal,
    pub balances: BalanceSet,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
}

// =========================================================================
// Routers
// =========================================================================

/// Routes reachable without a session.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes behind the Authenticator.
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/accounts/me", get(get_account))
        .route("/accounts/me/history", get(get_history))
        .route("/ledger/credit", post(credit))
        .route("/ledger/transfer", post(transfer))
        .route("/ledger/convert", post(convert))
        .route("/rates/:from/:to", get(get_rate))
}

// =========================================================================
// POST /register
// =========================================================================

/// Register a user and open their wallet account
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let handler = RegisterHandler::new(state.pool.clone());

    let command = RegisterCommand::new(request.email, request.password);
    let result = handler.execute(command, &OperationContext::new()).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: result.user_id,
            account_id: result.account_id,
            account_number: result.account_number,
        }),
    ))
}

// =========================================================================
// POST /login
// =========================================================================

/// Exchange email + password for a bearer token
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user_id = auth::verify_password(&state.pool, &request.email, &request.password).await?;
    let (token, expires_at) =
        auth::issue_session(&state.pool, user_id, state.session_ttl_hours).await?;

    Ok(Json(LoginResponse { token, expires_at }))
}

// =========================================================================
// GET /accounts/me
// =========================================================================

/// The acting account with all six balances
async fn get_account(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedAccount>,
) -> Result<Json<AccountResponse>, AppError> {
    let row: Option<(Decimal, Decimal, Decimal, Decimal, Decimal, Decimal)> = sqlx::query_as(
        r#"
        SELECT ars, usd, eur, btc, eth, usdt
        FROM balances
        WHERE account_id = $1
        "#,
    )
    .bind(actor.account_id)
    .fetch_optional(&state.pool)
    .await?;

    let (ars, usd, eur, btc, eth, usdt) = row.ok_or_else(|| {
        AppError::Internal(format!("Missing balance row for account {}", actor.account_id))
    })?;

    Ok(Json(AccountResponse {
        account_id: actor.account_id,
        account_number: actor.account_number,
        email: actor.email,
        balances: BalanceSet {
            ars,
            usd,
            eur,
            btc,
            eth,
            usdt,
        },
    }))
}

// =========================================================================
// GET /accounts/me/history
// =========================================================================

/// The acting account's slice of the transaction log, newest first
async fn get_history(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedAccount>,
) -> Result<Json<HistoryResponse>, AppError> {
    let history = LedgerHistory::new(state.pool.clone());
    let entries = history.for_account(actor.account_id, HISTORY_LIMIT).await?;

    Ok(Json(HistoryResponse {
        account_number: actor.account_number,
        entries,
    }))
}

// =========================================================================
// POST /ledger/credit
// =========================================================================

/// Credit the acting account
async fn credit(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedAccount>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreditRequest>,
) -> Result<(StatusCode, Json<CreditResponse>), AppError> {
    let handler = CreditHandler::new(state.engine(), state.notifier.clone());

    let command = CreditCommand::new(request.currency, request.amount);
    let result = handler.execute(&actor, command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreditResponse {
            transaction_id: result.transaction_id,
            currency: result.currency,
            amount: result.amount,
            balances: result.balances,
        }),
    ))
}

// =========================================================================
// POST /ledger/transfer
// =========================================================================

/// Transfer funds to another account by its public number
async fn transfer(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedAccount>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>), AppError> {
    let handler = TransferHandler::new(
        state.pool.clone(),
        state.engine(),
        state.notifier.clone(),
    );

    let command = TransferCommand::new(request.to_account_number, request.currency, request.amount);
    let result = handler.execute(&actor, command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(TransferResponse {
            transaction_id: result.transaction_id,
            to_account_number: result.to_account_number,
            currency: result.currency,
            amount: result.amount,
            balances: result.balances,
        }),
    ))
}

// =========================================================================
// POST /ledger/convert
// =========================================================================

/// Convert between two of the acting account's balances
async fn convert(
    State(state): State<AppState>,
    Extension(actor): Extension<AuthenticatedAccount>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<ConvertRequest>,
) -> Result<(StatusCode, Json<ConvertResponse>), AppError> {
    let handler = ConvertHandler::new(state.engine(), state.rates.clone());

    let command = ConvertCommand::new(request.from_currency, request.to_currency, request.amount);
    let result = handler.execute(&actor, command, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(ConvertResponse {
            transaction_id: result.transaction_id,
            from_currency: result.from_currency,
            to_currency: result.to_currency,
            rate: result.rate,
            debited: result.debited,
            credited: result.credited,
            balances: result.balances,
        }),
    ))
}

// =========================================================================
// GET /rates/:from/:to
// =========================================================================

/// Pass-through quote lookup, so clients can preview a conversion
async fn get_rate(
    State(state): State<AppState>,
    Path((from, to)): Path<(String, String)>,
) -> Result<Json<RateResponse>, AppError> {
    let from: Currency = from.parse()?;
    let to: Currency = to.parse()?;

    let quote = state
        .rates
        .quote(from, to)
        .await
        .map_err(|e| AppError::RateUnavailable(e.to_string()))?;

    Ok(Json(RateResponse {
        from: quote.from,
        to: quote.to,
        rate: quote.rate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_deserialize() {
        let json = r#"{
            "email": "alice@example.com",
            "password": "s3cret-pass"
        }"#;

        let request: RegisterRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.email, "alice@example.com");
    }

    #[test]
    fn test_transfer_request_deserialize() {
        let json = r#"{
            "to_account_number": "0000021234567890123456",
            "currency": "ARS",
            "amount": "100.50"
        }"#;

        let request: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.currency, "ARS");
        assert_eq!(request.amount, "100.50");
    }

    #[test]
    fn test_convert_request_deserialize() {
        let json = r#"{
            "from_currency": "USD",
            "to_currency": "EUR",
            "amount": "10"
        }"#;

        let request: ConvertRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.from_currency, "USD");
        assert_eq!(request.to_currency, "EUR");
    }
}
