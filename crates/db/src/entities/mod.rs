//! `SeaORM` entity definitions.
//!
//! One module per table created by the ledger migration.

pub mod audit_log;
pub mod balance_holders;
pub mod charge_splits;
pub mod charges;
pub mod credit_obligations;
pub mod job_line_items;
pub mod ledger_entries;
pub mod pending_transactions;
pub mod stock_entries;
pub mod tariffs;
