//! cambio Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod auth;
pub mod domain;
pub mod handlers;
pub mod jobs;
pub mod ledger;
pub mod notifier;
pub mod rates;

// Private modules (used only by the cambio binary)
pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{AccountNumber, Amount, AmountError, BalanceSet, Currency, DomainError};
pub use domain::OperationContext;
pub use error::{AppError, AppResult};
