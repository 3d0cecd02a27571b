//! Ledger domain types for posting requests and batches.
//!
//! A caller describes a movement with a [`PostingRequest`]; the ledger service
//! turns it into a [`PostingBatch`] of immutable entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::LedgerEntry;
use super::holder::BalanceHolder;

/// Payment method that marks an obligation as settled over time.
pub const CREDIT_METHOD: &str = "credit";

/// Suffix carried by the reference of a credit-establishing leg.
pub const CREDIT_LEG_SUFFIX: &str = "-credit";

/// Movement type classification.
///
/// Determines tariff lookup and customer messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Customer payment received.
    Payment,
    /// Customer billed for work.
    Bill,
    /// Operating expense.
    Expense,
    /// Purchase from a vendor.
    Purchase,
    /// Sale to a customer.
    Sale,
    /// Transfer between holders.
    Transfer,
    /// Fee leg derived from a tariff.
    Charge,
    /// Mirror of a previous posting.
    Reversal,
}

impl MovementType {
    /// Returns the string representation of the movement type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Bill => "bill",
            Self::Expense => "expense",
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::Transfer => "transfer",
            Self::Charge => "charge",
            Self::Reversal => "reversal",
        }
    }

    /// Parses a movement type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "payment" => Some(Self::Payment),
            "bill" => Some(Self::Bill),
            "expense" => Some(Self::Expense),
            "purchase" => Some(Self::Purchase),
            "sale" => Some(Self::Sale),
            "transfer" => Some(Self::Transfer),
            "charge" => Some(Self::Charge),
            "reversal" => Some(Self::Reversal),
            _ => None,
        }
    }

    /// Returns true if this movement mirrors an earlier posting.
    #[must_use]
    pub const fn is_reversal(&self) -> bool {
        matches!(self, Self::Reversal)
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input describing one monetary movement.
///
/// Raw strings come straight from the boundary; the ledger service parses and
/// resolves them. For reversals the holders, amount and scope are taken from the
/// original posting, so those fields may be left empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRequest {
    /// Business correlation id, unique per posting.
    pub reference: String,
    /// Amount moved (must be positive unless this is a reversal).
    pub amount: Decimal,
    /// Movement type name.
    pub movement_type: String,
    /// Payment method name (also the owner reference of its holder).
    pub payment_method: String,
    /// Owner reference of the holder being debited.
    pub debit_owner: String,
    /// Owner reference of the holder being credited.
    pub credit_owner: String,
    /// Entity scope the posting belongs to.
    pub scope: String,
    /// Reference of the posting being reversed.
    pub reversal_of: Option<String>,
    /// Reference of the obligation this posting pays towards.
    pub correlation: Option<String>,
    /// Secondary grouping tag (vehicle, category) for wallet views.
    pub dimension: Option<String>,
    /// Free-text narration.
    pub description: Option<String>,
    /// Phone number to notify after commit.
    pub phone: Option<String>,
}

impl PostingRequest {
    /// Creates a request for a regular movement.
    #[must_use]
    pub fn new(
        reference: impl Into<String>,
        amount: Decimal,
        movement_type: impl Into<String>,
        payment_method: impl Into<String>,
        debit_owner: impl Into<String>,
        credit_owner: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            amount,
            movement_type: movement_type.into(),
            payment_method: payment_method.into(),
            debit_owner: debit_owner.into(),
            credit_owner: credit_owner.into(),
            scope: String::new(),
            reversal_of: None,
            correlation: None,
            dimension: None,
            description: None,
            phone: None,
        }
    }

    /// Creates a request that reverses the posting with `original_reference`.
    #[must_use]
    pub fn reversal(reference: impl Into<String>, original_reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            amount: Decimal::ZERO,
            movement_type: MovementType::Reversal.as_str().to_string(),
            payment_method: String::new(),
            debit_owner: String::new(),
            credit_owner: String::new(),
            scope: String::new(),
            reversal_of: Some(original_reference.into()),
            correlation: None,
            dimension: None,
            description: None,
            phone: None,
        }
    }

    /// Sets the entity scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the obligation correlation reference.
    #[must_use]
    pub fn with_correlation(mut self, correlation: impl Into<String>) -> Self {
        self.correlation = Some(correlation.into());
        self
    }

    /// Sets the wallet dimension.
    #[must_use]
    pub fn with_dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    /// Sets the narration.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the phone number to notify.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Batch totals for conservation checks.
///
/// Every entry moves its amount out of one holder and into another, so a
/// well-formed batch always balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTotals {
    /// Total amount debited.
    pub debit: Decimal,
    /// Total amount credited.
    pub credit: Decimal,
    /// Whether the batch is balanced (debits == credits).
    pub is_balanced: bool,
}

impl BatchTotals {
    /// Creates new batch totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// A validated batch ready to be appended in one unit of work.
///
/// The first entry is always the primary posting; any further entries are fee
/// legs derived from a tariff.
#[derive(Debug, Clone)]
pub struct PostingBatch {
    /// Entries in posting order.
    pub entries: Vec<LedgerEntry>,
    /// Holder debited by the primary posting.
    pub debit_holder: BalanceHolder,
    /// Holder credited by the primary posting.
    pub credit_holder: BalanceHolder,
    /// Conservation totals.
    pub totals: BatchTotals,
}

impl PostingBatch {
    /// Returns the primary posting.
    #[must_use]
    pub fn primary(&self) -> &LedgerEntry {
        &self.entries[0]
    }
}

/// Result of a committed posting.
#[derive(Debug, Clone)]
pub struct PostingReceipt {
    /// The primary posting, as stored.
    pub primary: LedgerEntry,
    /// Fee legs committed with it.
    pub derived: Vec<LedgerEntry>,
}

impl PostingReceipt {
    /// Returns every entry committed by this posting.
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        std::iter::once(&self.primary).chain(self.derived.iter())
    }

    /// Returns the number of entries committed.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.derived.len()
    }

    /// A receipt always holds at least the primary posting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}
