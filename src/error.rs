//! Error handling module
//!
//! Centralized error types and HTTP response conversion. Domain errors keep
//! their own taxonomy (`DomainError`); this layer adds infrastructure and
//! dependency failures and maps everything onto statuses + `error_code`
//! strings the caller can branch on.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] crate::domain::DomainError),

    // Dependency errors (transient, safe to retry, nothing mutated)
    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Operation timed out waiting for a contended account; retry")]
    Busy,

    // Generation errors
    #[error("Could not allocate an unused account number")]
    ExhaustedRetries,

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<crate::domain::AmountError> for AppError {
    fn from(err: crate::domain::AmountError) -> Self {
        AppError::Domain(err.into())
    }
}

impl From<crate::domain::AccountNumberError> for AppError {
    fn from(err: crate::domain::AccountNumberError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated", None),

            // 429 Too Many Requests
            AppError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded", None)
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(ref domain_err) => {
                use crate::domain::DomainError;
                match domain_err {
                    DomainError::InsufficientFunds { .. } => (
                        StatusCode::BAD_REQUEST,
                        "insufficient_funds",
                        Some(domain_err.to_string()),
                    ),
                    DomainError::InvalidAmount(msg) => {
                        (StatusCode::BAD_REQUEST, "invalid_amount", Some(msg.clone()))
                    }
                    DomainError::InvalidCurrency(code) => (
                        StatusCode::BAD_REQUEST,
                        "invalid_currency",
                        Some(code.clone()),
                    ),
                    DomainError::SelfTransferRejected => {
                        (StatusCode::BAD_REQUEST, "self_transfer_rejected", None)
                    }
                    DomainError::SameCurrencyRejected => {
                        (StatusCode::BAD_REQUEST, "same_currency_rejected", None)
                    }
                    DomainError::AccountNotFound(id) => {
                        (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
                    }
                    DomainError::BalanceLimitExceeded { .. } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "balance_limit_exceeded",
                        Some(domain_err.to_string()),
                    ),
                }
            }

            // 502 Bad Gateway - upstream quote source failed
            AppError::RateUnavailable(msg) => {
                (StatusCode::BAD_GATEWAY, "rate_unavailable", Some(msg.clone()))
            }

            // 503 Service Unavailable - retryable, nothing was mutated
            AppError::Busy => (StatusCode::SERVICE_UNAVAILABLE, "busy", None),
            AppError::ExhaustedRetries => (
                StatusCode::SERVICE_UNAVAILABLE,
                "account_number_exhausted",
                None,
            ),

            // 500 Internal Server Error
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Currency, DomainError};
    use rust_decimal_macros::dec;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_validation_errors_are_bad_request() {
        assert_eq!(
            status_of(AppError::Domain(DomainError::SelfTransferRejected)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Domain(DomainError::SameCurrencyRejected)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Domain(DomainError::InvalidCurrency(
                "DOGE".into()
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_insufficient_funds_is_bad_request() {
        let err = AppError::Domain(DomainError::InsufficientFunds {
            currency: Currency::Ars,
            required: dec!(100),
            available: dec!(50),
        });
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_dependency_errors_are_retryable_statuses() {
        assert_eq!(status_of(AppError::Busy), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(AppError::ExhaustedRetries),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(AppError::RateUnavailable("upstream down".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_account_not_found_is_404() {
        let err = AppError::Domain(DomainError::AccountNotFound("x".into()));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }
}
