//! Ledger module
//!
//! The balance mutation core: transactional storage operations, the engine
//! owning credit/transfer/convert, and the read side of the transaction
//! log. Balances are mutated exclusively through `LedgerEngine`; no other
//! code path writes them.

pub mod engine;
pub mod history;
pub mod store;

pub use engine::{ConvertReceipt, LedgerEngine, LedgerReceipt, TransferReceipt};
pub use history::{HistoryEntry, LedgerHistory};
pub use store::{is_unique_violation, AccountRow, EntryKind, LedgerStore, NewEntry};
