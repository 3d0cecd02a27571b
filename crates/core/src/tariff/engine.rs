//! Fee resolution and split fan-out.

use rust_decimal::{Decimal, RoundingStrategy};
use autoledger_shared::types::HolderId;

use super::types::{Charge, ChargeType, NewCharge, TariffSchedule};
use crate::ledger::error::LedgerError;

/// Decimal places fee amounts are rounded to.
pub const FEE_SCALE: u32 = 2;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// A derived fee posting, before it becomes a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeLeg {
    /// `charge-N`, N being the 1-based split position.
    pub label: String,
    /// Holder credited with the share.
    pub destination: HolderId,
    /// Share of the fee.
    pub amount: Decimal,
}

/// Stateless fee engine.
pub struct TariffEngine;

impl TariffEngine {
    /// Finds the tier covering `amount`.
    #[must_use]
    pub fn tier_for(schedule: &TariffSchedule, amount: Decimal) -> Option<&Charge> {
        schedule.charges.iter().find(|c| c.covers(amount))
    }

    /// Computes the fee for `amount`, or `None` when no tier covers it.
    ///
    /// Percentage fees use banker's rounding to two places.
    #[must_use]
    pub fn fee_for(schedule: &TariffSchedule, amount: Decimal) -> Option<Decimal> {
        let charge = Self::tier_for(schedule, amount)?;
        let fee = match charge.charge_type {
            ChargeType::Flat => charge.amount,
            ChargeType::Percentage => round_fee(amount * charge.amount / HUNDRED),
        };
        Some(fee)
    }

    /// Splits `fee` across the schedule's destinations in split order.
    ///
    /// Zero-amount shares are dropped. Shares are not forced to add up to the
    /// fee; anything unallocated stays with the debited holder.
    #[must_use]
    pub fn fan_out(schedule: &TariffSchedule, fee: Decimal) -> Vec<FeeLeg> {
        let mut splits: Vec<_> = schedule.splits.iter().collect();
        splits.sort_by_key(|s| s.position);

        splits
            .into_iter()
            .enumerate()
            .filter_map(|(index, split)| {
                let amount = round_fee(split.percentage * fee / HUNDRED);
                (amount > Decimal::ZERO).then(|| FeeLeg {
                    label: format!("charge-{}", index + 1),
                    destination: split.destination,
                    amount,
                })
            })
            .collect()
    }

    /// Resolves the fee for `amount` and fans it out.
    #[must_use]
    pub fn fee_legs(schedule: &TariffSchedule, amount: Decimal) -> Vec<FeeLeg> {
        match Self::fee_for(schedule, amount) {
            Some(fee) if fee > Decimal::ZERO => Self::fan_out(schedule, fee),
            _ => Vec::new(),
        }
    }

    /// Validates a new tier against the tariff's existing tiers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChargeRange` for an empty or negative range,
    /// `OverlappingChargeTier` when it intersects an existing tier, and
    /// `InvalidAmount`/`InvalidPercentage` for a bad fee.
    pub fn validate_charge(existing: &[Charge], new: &NewCharge) -> Result<(), LedgerError> {
        if new.min_value < Decimal::ZERO || new.min_value >= new.max_value {
            return Err(LedgerError::InvalidChargeRange {
                min: new.min_value,
                max: new.max_value,
            });
        }
        match new.charge_type {
            ChargeType::Flat if new.amount <= Decimal::ZERO => {
                return Err(LedgerError::InvalidAmount(new.amount));
            }
            ChargeType::Percentage => Self::validate_percentage(new.amount)?,
            ChargeType::Flat => {}
        }
        if existing
            .iter()
            .any(|c| c.overlaps(new.min_value, new.max_value))
        {
            return Err(LedgerError::OverlappingChargeTier {
                min: new.min_value,
                max: new.max_value,
            });
        }
        Ok(())
    }

    /// Validates a split or percentage-fee share.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPercentage` unless `0 < percentage <= 100`.
    pub fn validate_percentage(percentage: Decimal) -> Result<(), LedgerError> {
        if percentage <= Decimal::ZERO || percentage > HUNDRED {
            return Err(LedgerError::InvalidPercentage(percentage));
        }
        Ok(())
    }
}

fn round_fee(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(FEE_SCALE, RoundingStrategy::MidpointNearestEven)
}
