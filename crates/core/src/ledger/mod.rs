//! Monetary ledger.
//!
//! This module implements the core posting functionality:
//! - Balance holders and immutable ledger entries
//! - Posting validation and tariff fee fan-out
//! - Reversals
//! - Balance derivation (point-in-time, statements, wallets, periods)
//! - Deferred transactions

pub mod balance;
pub mod entry;
pub mod error;
pub mod holder;
pub mod pending;
pub mod period;
pub mod reversal;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use balance::{
    AccountBalance, AsOf, HolderBalance, PeriodSummary, RunningBalance, StatementLine,
    WalletBalance,
};
pub use entry::{EntryType, LedgerEntry, Posting};
pub use error::LedgerError;
pub use holder::{BalanceHolder, HolderKind, NewHolder};
pub use pending::{PendingStatus, PendingTransaction, ReplaySummary};
pub use period::AccountingPeriod;
pub use reversal::ReversalService;
pub use service::LedgerService;
pub use types::{
    BatchTotals, CREDIT_LEG_SUFFIX, CREDIT_METHOD, MovementType, PostingBatch, PostingReceipt,
    PostingRequest,
};
