//! Credit obligations and their settlement.

pub mod tracker;
pub mod types;

pub use tracker::{CreditTracker, SETTLEMENT_SEPARATOR, SettlementPlan, settlement_reference};
pub use types::{
    CreditObligation, CreditState, CreditStatus, NewObligation, ObligationKind, Outstanding,
    PaymentLine,
};
