//! Stock ledger.
//!
//! Quantities move between holders exactly as money does in [`crate::ledger`],
//! with `sale`/`purchase` categories instead of movement types.

pub mod job;
pub mod service;
pub mod types;

pub use job::{JobCompletion, JobLineItem, LABOUR_SUFFIX};
pub use service::StockService;
pub use types::{StockBatch, StockCategory, StockEntry, StockRequest};
