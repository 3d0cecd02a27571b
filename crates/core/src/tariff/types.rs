//! Tariff domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use autoledger_shared::types::{ChargeId, ChargeSplitId, HolderId, TariffId};

use crate::ledger::types::MovementType;

/// How a charge tier computes its fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeType {
    /// Fixed fee.
    Flat,
    /// Percentage of the posted amount.
    Percentage,
}

impl ChargeType {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Percentage => "percentage",
        }
    }

    /// Parses a charge type.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flat" => Some(Self::Flat),
            "percentage" => Some(Self::Percentage),
            _ => None,
        }
    }
}

/// Fee schedule header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    /// Unique identifier.
    pub id: TariffId,
    /// Human-readable code, used as the narration of fee legs.
    pub code: String,
    /// Movement type the tariff applies to.
    pub movement_type: MovementType,
    /// Payment method the tariff applies to.
    pub payment_method: String,
    /// Entity scope, or the wildcard scope.
    pub scope: String,
    /// When the tariff was created.
    pub created_at: DateTime<Utc>,
}

/// One fee tier of a tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    /// Unique identifier.
    pub id: ChargeId,
    /// Owning tariff.
    pub tariff_id: TariffId,
    /// Inclusive lower bound on the posted amount.
    pub min_value: Decimal,
    /// Exclusive upper bound on the posted amount.
    pub max_value: Decimal,
    /// Flat or percentage.
    pub charge_type: ChargeType,
    /// Flat fee, or percentage (0-100) of the posted amount.
    pub amount: Decimal,
}

impl Charge {
    /// Returns true if `amount` falls in `[min_value, max_value)`.
    #[must_use]
    pub fn covers(&self, amount: Decimal) -> bool {
        self.min_value <= amount && amount < self.max_value
    }

    /// Returns true if this tier shares any amount with `[min, max)`.
    #[must_use]
    pub fn overlaps(&self, min: Decimal, max: Decimal) -> bool {
        self.min_value < max && min < self.max_value
    }
}

/// One fee destination of a tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSplit {
    /// Unique identifier.
    pub id: ChargeSplitId,
    /// Owning tariff.
    pub tariff_id: TariffId,
    /// 1-based position in split order.
    pub position: i32,
    /// Share of the fee, 0-100.
    pub percentage: Decimal,
    /// Holder credited with this share.
    pub destination: HolderId,
}

/// A tariff with its tiers and splits, as used by the fee engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffSchedule {
    /// Header.
    pub tariff: Tariff,
    /// Tiers, mutually exclusive.
    pub charges: Vec<Charge>,
    /// Splits ordered by position.
    pub splits: Vec<ChargeSplit>,
}

/// Input for creating a tariff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTariff {
    /// Human-readable code.
    pub code: String,
    /// Movement type name.
    pub movement_type: String,
    /// Payment method.
    pub payment_method: String,
    /// Entity scope; empty means the wildcard scope.
    pub scope: String,
}

/// Input for adding a tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCharge {
    /// Inclusive lower bound.
    pub min_value: Decimal,
    /// Exclusive upper bound.
    pub max_value: Decimal,
    /// Flat or percentage.
    pub charge_type: ChargeType,
    /// Flat fee or percentage.
    pub amount: Decimal,
}

/// Input for adding a split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSplit {
    /// Share of the fee, 0-100.
    pub percentage: Decimal,
    /// Owner reference of the destination holder.
    pub destination_owner: String,
}
