//! Tariffs, tiered charges and fee fan-out.
//!
//! A tariff is keyed by (movement type, payment method, scope). Its charges
//! are mutually exclusive `[min, max)` tiers; its splits distribute the
//! resolved fee across destination holders.

pub mod engine;
pub mod types;

pub use engine::{FeeLeg, TariffEngine};
pub use types::{Charge, ChargeSplit, ChargeType, NewCharge, NewSplit, NewTariff, Tariff, TariffSchedule};
