//! Reversal of posted movements.
//!
//! A reversal never edits history. It appends a mirror of the original posting
//! with debit and credit swapped, so the original's effect nets to zero.

use chrono::{DateTime, Utc};
use autoledger_shared::types::{LedgerEntryId, StockEntryId};

use super::entry::LedgerEntry;
use super::period::AccountingPeriod;
use super::types::MovementType;
use crate::inventory::{StockCategory, StockEntry};

/// Stateless service for building reversing postings.
pub struct ReversalService;

impl ReversalService {
    /// Mirrors a monetary posting.
    ///
    /// Holders are swapped; amount, scope, payment method, correlation and
    /// dimension are carried over.
    #[must_use]
    pub fn mirror_entry(original: &LedgerEntry, reference: &str, now: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            sequence: 0,
            reference: reference.to_string(),
            label: None,
            amount: original.amount,
            debit_holder: original.credit_holder,
            credit_holder: original.debit_holder,
            movement_type: MovementType::Reversal,
            payment_method: original.payment_method.clone(),
            scope: original.scope.clone(),
            reversal_of: Some(original.reference.clone()),
            correlation: original.correlation.clone(),
            dimension: original.dimension.clone(),
            description: Some(format!("Reversal of {}", original.reference)),
            phone: None,
            posted_at: now,
            accounting_period: AccountingPeriod::containing(now),
        }
    }

    /// Mirrors a stock posting.
    #[must_use]
    pub fn mirror_stock(original: &StockEntry, reference: &str, now: DateTime<Utc>) -> StockEntry {
        StockEntry {
            id: StockEntryId::new(),
            sequence: 0,
            reference: reference.to_string(),
            quantity: original.quantity,
            debit_holder: original.credit_holder,
            credit_holder: original.debit_holder,
            category: StockCategory::Reversal,
            scope: original.scope.clone(),
            reversal_of: Some(original.reference.clone()),
            job_id: original.job_id,
            description: Some(format!("Reversal of {}", original.reference)),
            posted_at: now,
            accounting_period: AccountingPeriod::containing(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::balance::{AsOf, derive_balance};
    use crate::ledger::entry::fixtures::entry;
    use rust_decimal_macros::dec;
    use autoledger_shared::types::HolderId;

    #[test]
    fn test_mirror_swaps_holders() {
        let payer = HolderId::new();
        let payee = HolderId::new();
        let mut original = entry(1, "R-1", dec!(700), payer, payee);
        original.correlation = Some("EXP-1".to_string());

        let mirror = ReversalService::mirror_entry(&original, "REV-1", Utc::now());
        assert_eq!(mirror.debit_holder, payee);
        assert_eq!(mirror.credit_holder, payer);
        assert_eq!(mirror.amount, dec!(700));
        assert_eq!(mirror.reversal_of.as_deref(), Some("R-1"));
        assert_eq!(mirror.correlation.as_deref(), Some("EXP-1"));
        assert_eq!(mirror.movement_type, MovementType::Reversal);
    }

    #[test]
    fn test_mirror_cancels_original() {
        let payer = HolderId::new();
        let payee = HolderId::new();
        let original = entry(1, "R-1", dec!(700), payer, payee);
        let mut mirror = ReversalService::mirror_entry(&original, "REV-1", Utc::now());
        mirror.sequence = 2;

        let entries = vec![original, mirror];
        assert_eq!(derive_balance(payer, &entries, AsOf::Latest).balance, dec!(0));
        assert_eq!(derive_balance(payee, &entries, AsOf::Latest).balance, dec!(0));
    }
}
