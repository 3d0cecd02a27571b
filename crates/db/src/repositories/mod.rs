//! Storage implementations for data access.
//!
//! The engine in `autoledger-core` talks to storage only through its
//! unit-of-work ports; this module provides the `PostgreSQL` side of them,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod ledger_store;
mod mapping;

pub use ledger_store::{PgLedgerStore, PgUnitOfWork, pending_backlog};
