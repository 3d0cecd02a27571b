//! Stock ledger types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use autoledger_shared::types::{HolderId, JobId, StockEntryId};

use crate::ledger::entry::Posting;
use crate::ledger::holder::BalanceHolder;
use crate::ledger::period::AccountingPeriod;

/// Stock movement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockCategory {
    /// Item leaves stock to the entity (debit item, credit entity).
    Sale,
    /// Item enters stock from a vendor (debit vendor, credit item).
    Purchase,
    /// Mirror of a previous stock posting.
    Reversal,
}

impl StockCategory {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
            Self::Reversal => "reversal",
        }
    }

    /// Parses a category.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sale" => Some(Self::Sale),
            "purchase" => Some(Self::Purchase),
            "reversal" => Some(Self::Reversal),
            _ => None,
        }
    }
}

impl std::fmt::Display for StockCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable quantity movement between two holders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    /// Unique identifier.
    pub id: StockEntryId,
    /// Store-assigned, strictly increasing sequence (0 until appended).
    pub sequence: i64,
    /// Business reference, unique.
    pub reference: String,
    /// Quantity moved, always positive.
    pub quantity: i64,
    /// Holder the quantity leaves.
    pub debit_holder: HolderId,
    /// Holder the quantity enters.
    pub credit_holder: HolderId,
    /// Movement category.
    pub category: StockCategory,
    /// Entity scope.
    pub scope: String,
    /// Reference of the stock posting this one reverses.
    pub reversal_of: Option<String>,
    /// Job the posting was synthesised for.
    pub job_id: Option<JobId>,
    /// Free-text narration.
    pub description: Option<String>,
    /// Commit timestamp.
    pub posted_at: DateTime<Utc>,
    /// Month bucket.
    pub accounting_period: AccountingPeriod,
}

impl Posting for StockEntry {
    type Amount = i64;

    fn debit_holder(&self) -> HolderId {
        self.debit_holder
    }

    fn credit_holder(&self) -> HolderId {
        self.credit_holder
    }

    fn magnitude(&self) -> i64 {
        self.quantity
    }

    fn sequence(&self) -> i64 {
        self.sequence
    }

    fn posted_at(&self) -> DateTime<Utc> {
        self.posted_at
    }
}

/// Input describing one stock movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRequest {
    /// Business reference.
    pub reference: String,
    /// Quantity moved (ignored for reversals).
    pub quantity: i64,
    /// Category name.
    pub category: String,
    /// Owner reference of the holder the quantity leaves.
    pub debit_owner: String,
    /// Owner reference of the holder the quantity enters.
    pub credit_owner: String,
    /// Entity scope.
    pub scope: String,
    /// Reference of the stock posting being reversed.
    pub reversal_of: Option<String>,
    /// Job the posting belongs to.
    pub job_id: Option<JobId>,
    /// Free-text narration.
    pub description: Option<String>,
}

impl StockRequest {
    /// Creates a request for a sale or purchase.
    #[must_use]
    pub fn new(
        reference: impl Into<String>,
        quantity: i64,
        category: StockCategory,
        debit_owner: impl Into<String>,
        credit_owner: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            quantity,
            category: category.as_str().to_string(),
            debit_owner: debit_owner.into(),
            credit_owner: credit_owner.into(),
            scope: String::new(),
            reversal_of: None,
            job_id: None,
            description: None,
        }
    }

    /// Creates a request reversing the stock posting with `original_reference`.
    #[must_use]
    pub fn reversal(reference: impl Into<String>, original_reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            quantity: 0,
            category: StockCategory::Reversal.as_str().to_string(),
            debit_owner: String::new(),
            credit_owner: String::new(),
            scope: String::new(),
            reversal_of: Some(original_reference.into()),
            job_id: None,
            description: None,
        }
    }

    /// Sets the entity scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the narration.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A validated stock posting ready to append.
#[derive(Debug, Clone)]
pub struct StockBatch {
    /// The entry.
    pub entry: StockEntry,
    /// Holder the quantity leaves.
    pub debit_holder: BalanceHolder,
    /// Holder the quantity enters.
    pub credit_holder: BalanceHolder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(StockCategory::parse(" Sale"), Some(StockCategory::Sale));
        assert_eq!(StockCategory::parse("purchase"), Some(StockCategory::Purchase));
        assert_eq!(StockCategory::parse("transfer"), None);
    }

    #[test]
    fn test_stock_posting_signs() {
        let item = HolderId::new();
        let entity = HolderId::new();
        let now = Utc::now();
        let entry = StockEntry {
            id: StockEntryId::new(),
            sequence: 1,
            reference: "S-1".to_string(),
            quantity: 4,
            debit_holder: item,
            credit_holder: entity,
            category: StockCategory::Sale,
            scope: "garage-1".to_string(),
            reversal_of: None,
            job_id: None,
            description: None,
            posted_at: now,
            accounting_period: AccountingPeriod::containing(now),
        };
        assert_eq!(entry.signed_for(item), Some(-4));
        assert_eq!(entry.signed_for(entity), Some(4));
    }
}
