//! Ledger entry domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use autoledger_shared::types::{HolderId, LedgerEntryId};

use super::period::AccountingPeriod;
use super::types::{CREDIT_LEG_SUFFIX, MovementType};

/// Which side of a posting a holder sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Value leaves the holder.
    Debit,
    /// Value enters the holder.
    Credit,
}

/// An immutable movement between two holders.
///
/// Shared by monetary and stock postings so balance derivation is written once.
pub trait Posting {
    /// Unit the posting moves (money or quantity).
    type Amount: Copy
        + Default
        + PartialOrd
        + std::ops::Add<Output = Self::Amount>
        + std::ops::Sub<Output = Self::Amount>
        + std::ops::Neg<Output = Self::Amount>;

    /// Holder the amount leaves.
    fn debit_holder(&self) -> HolderId;
    /// Holder the amount enters.
    fn credit_holder(&self) -> HolderId;
    /// Unsigned amount moved.
    fn magnitude(&self) -> Self::Amount;
    /// Store-assigned posting sequence.
    fn sequence(&self) -> i64;
    /// When the posting was committed.
    fn posted_at(&self) -> DateTime<Utc>;

    /// Returns the side `holder` sits on, if it is touched at all.
    fn side_for(&self, holder: HolderId) -> Option<EntryType> {
        if self.credit_holder() == holder {
            Some(EntryType::Credit)
        } else if self.debit_holder() == holder {
            Some(EntryType::Debit)
        } else {
            None
        }
    }

    /// Returns the signed effect on `holder`: credits add, debits subtract.
    fn signed_for(&self, holder: HolderId) -> Option<Self::Amount> {
        self.side_for(holder).map(|side| match side {
            EntryType::Credit => self.magnitude(),
            EntryType::Debit => -self.magnitude(),
        })
    }
}

/// A single monetary posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: LedgerEntryId,
    /// Store-assigned, strictly increasing sequence (0 until appended).
    pub sequence: i64,
    /// Business reference shared by a primary posting and its fee legs.
    pub reference: String,
    /// Fee leg label (`charge-N`); `None` for the primary posting.
    pub label: Option<String>,
    /// Amount moved, always positive.
    pub amount: Decimal,
    /// Holder the amount leaves.
    pub debit_holder: HolderId,
    /// Holder the amount enters.
    pub credit_holder: HolderId,
    /// Movement classification.
    pub movement_type: MovementType,
    /// Payment method used.
    pub payment_method: String,
    /// Entity scope.
    pub scope: String,
    /// Reference of the posting this one reverses.
    pub reversal_of: Option<String>,
    /// Reference of the obligation this posting pays towards.
    pub correlation: Option<String>,
    /// Wallet grouping tag.
    pub dimension: Option<String>,
    /// Free-text narration.
    pub description: Option<String>,
    /// Phone number notified after commit.
    pub phone: Option<String>,
    /// Commit timestamp.
    pub posted_at: DateTime<Utc>,
    /// Month bucket the posting is attributed to.
    pub accounting_period: AccountingPeriod,
}

impl LedgerEntry {
    /// Returns true for the posting a caller asked for, false for fee legs.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.label.is_none()
    }

    /// Returns true if this posting establishes a credit obligation.
    #[must_use]
    pub fn is_credit_leg(&self) -> bool {
        self.reference.ends_with(CREDIT_LEG_SUFFIX)
    }

    /// Returns true if this posting mirrors an earlier one.
    #[must_use]
    pub fn is_reversal(&self) -> bool {
        self.reversal_of.is_some()
    }
}

impl Posting for LedgerEntry {
    type Amount = Decimal;

    fn debit_holder(&self) -> HolderId {
        self.debit_holder
    }

    fn credit_holder(&self) -> HolderId {
        self.credit_holder
    }

    fn magnitude(&self) -> Decimal {
        self.amount
    }

    fn sequence(&self) -> i64 {
        self.sequence
    }

    fn posted_at(&self) -> DateTime<Utc> {
        self.posted_at
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Builds a primary entry between two holders.
    pub fn entry(
        sequence: i64,
        reference: &str,
        amount: Decimal,
        debit: HolderId,
        credit: HolderId,
    ) -> LedgerEntry {
        let posted_at = Utc::now();
        LedgerEntry {
            id: LedgerEntryId::new(),
            sequence,
            reference: reference.to_string(),
            label: None,
            amount,
            debit_holder: debit,
            credit_holder: credit,
            movement_type: MovementType::Payment,
            payment_method: "cash".to_string(),
            scope: "ALL".to_string(),
            reversal_of: None,
            correlation: None,
            dimension: None,
            description: None,
            phone: None,
            posted_at,
            accounting_period: AccountingPeriod::containing(posted_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::entry;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_amount_per_side() {
        let payer = HolderId::new();
        let payee = HolderId::new();
        let other = HolderId::new();
        let e = entry(1, "R-1", dec!(250.00), payer, payee);

        assert_eq!(e.signed_for(payee), Some(dec!(250.00)));
        assert_eq!(e.signed_for(payer), Some(dec!(-250.00)));
        assert_eq!(e.signed_for(other), None);
        assert_eq!(e.side_for(payer), Some(EntryType::Debit));
    }

    #[test]
    fn test_credit_leg_detection() {
        let mut e = entry(1, "EXP-9-credit", dec!(10), HolderId::new(), HolderId::new());
        assert!(e.is_credit_leg());
        e.reference = "EXP-9".to_string();
        assert!(!e.is_credit_leg());
    }

    #[test]
    fn test_primary_vs_fee_leg() {
        let mut e = entry(1, "R-1", dec!(10), HolderId::new(), HolderId::new());
        assert!(e.is_primary());
        e.label = Some("charge-1".to_string());
        assert!(!e.is_primary());
    }
}
