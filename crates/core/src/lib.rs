//! Core business logic for Autoledger.
//!
//! This crate contains the ledger semantics with ZERO web or database dependencies.
//! Storage is reached through the ports in [`store`]; everything else is pure.
//!
//! # Modules
//!
//! - `ledger` - Monetary postings, validation, reversal and balance derivation
//! - `tariff` - Tariffs, tiered charges and fee fan-out
//! - `credit` - Credit obligations and settlement tracking
//! - `inventory` - Stock postings and job labour
//! - `audit` - Audit trail records
//! - `store` - Unit-of-work ports and the in-memory store
//! - `engine` - The `Ledger` entry point tying it all together

pub mod audit;
pub mod credit;
pub mod engine;
pub mod inventory;
pub mod ledger;
pub mod store;
pub mod tariff;

pub use engine::{Ledger, Settlement};
pub use ledger::error::LedgerError;
