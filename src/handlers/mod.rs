//! Command Handlers module
//!
//! Handlers orchestrate one operation each: validate caller input, run the
//! ledger engine's atomic unit, and deal with post-commit side effects
//! (notifications). No balance is ever written outside the engine.

mod commands;
mod convert_handler;
mod credit_handler;
mod register_handler;
mod transfer_handler;

pub use commands::*;
pub use convert_handler::ConvertHandler;
pub use credit_handler::CreditHandler;
pub use register_handler::RegisterHandler;
pub use transfer_handler::TransferHandler;
