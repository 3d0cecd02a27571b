//! Credit obligation types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use autoledger_shared::types::{LedgerEntryId, ObligationId};

use crate::ledger::types::{CREDIT_METHOD, MovementType};

/// Settlement status of an obligation.
///
/// Ordered: a status only ever moves to a later variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditStatus {
    /// Not taken on credit.
    None,
    /// On credit, nothing paid yet.
    Pending,
    /// Partly paid.
    Partial,
    /// Fully paid. Terminal.
    Paid,
}

impl CreditStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Pending => "PENDING",
            Self::Partial => "PARTIAL",
            Self::Paid => "PAID",
        }
    }

    /// Parses a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "PENDING" => Some(Self::Pending),
            "PARTIAL" => Some(Self::Partial),
            "PAID" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Moves towards `next`, never backwards.
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }

    /// Returns true if no further settlement is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::fmt::Display for CreditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credit terms embedded in an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditState {
    /// Taken on credit.
    pub on_credit: bool,
    /// Settlement progress.
    pub status: CreditStatus,
}

impl CreditState {
    /// Derives the initial terms from the payment method.
    #[must_use]
    pub fn for_payment_method(payment_method: &str) -> Self {
        if payment_method.eq_ignore_ascii_case(CREDIT_METHOD) {
            Self {
                on_credit: true,
                status: CreditStatus::Pending,
            }
        } else {
            Self {
                on_credit: false,
                status: CreditStatus::None,
            }
        }
    }

    /// Applies the status implied by a remaining balance.
    pub fn record_balance(&mut self, remaining: Decimal) {
        let next = if remaining.is_zero() {
            CreditStatus::Paid
        } else {
            CreditStatus::Partial
        };
        self.status = self.status.advance(next);
    }
}

/// What kind of liability an obligation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    /// Operating expense.
    Expense,
    /// Expenditure against a vendor.
    Expenditure,
    /// Item bought from a vendor.
    ItemPurchase,
    /// Local purchase order.
    LocalPurchaseOrder,
}

impl ObligationKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Expenditure => "expenditure",
            Self::ItemPurchase => "item_purchase",
            Self::LocalPurchaseOrder => "local_purchase_order",
        }
    }

    /// Parses a kind.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "expense" => Some(Self::Expense),
            "expenditure" => Some(Self::Expenditure),
            "item_purchase" => Some(Self::ItemPurchase),
            "local_purchase_order" => Some(Self::LocalPurchaseOrder),
            _ => None,
        }
    }

    /// Movement type used when posting against this kind.
    #[must_use]
    pub const fn movement_type(&self) -> MovementType {
        match self {
            Self::Expense | Self::Expenditure => MovementType::Expense,
            Self::ItemPurchase | Self::LocalPurchaseOrder => MovementType::Purchase,
        }
    }
}

/// A liability that may be settled over several payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditObligation {
    /// Unique identifier.
    pub id: ObligationId,
    /// Business reference; payments carry it as their correlation.
    pub reference: String,
    /// Kind of liability.
    pub kind: ObligationKind,
    /// Total owed.
    pub amount: Decimal,
    /// Payment method it was raised with.
    pub payment_method: String,
    /// Owner reference of the holder that pays settlements.
    pub settlement_owner: String,
    /// Owner reference of the holder the value is owed to.
    pub counterparty_owner: String,
    /// Entity scope.
    pub scope: String,
    /// Credit terms.
    pub credit: CreditState,
    /// When the obligation was raised.
    pub created_at: DateTime<Utc>,
}

/// Input for raising an obligation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewObligation {
    /// Business reference.
    pub reference: String,
    /// Kind of liability.
    pub kind: ObligationKind,
    /// Total owed.
    pub amount: Decimal,
    /// Payment method; `credit` defers payment.
    pub payment_method: String,
    /// Owner reference of the holder that pays settlements.
    /// Defaults to the payment method's holder when not on credit.
    pub settlement_owner: Option<String>,
    /// Owner reference of the holder the value is owed to.
    pub counterparty_owner: String,
    /// Entity scope.
    pub scope: String,
}

/// A payment counted towards an obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLine {
    /// Posting id.
    pub entry_id: LedgerEntryId,
    /// Posting reference.
    pub reference: String,
    /// Movement type of the payment.
    pub movement_type: MovementType,
    /// Method used.
    pub payment_method: String,
    /// Amount paid.
    pub amount: Decimal,
    /// When it was posted.
    pub posted_at: DateTime<Utc>,
}

/// Settlement position of an obligation, derived from postings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outstanding {
    /// Sum of counted payments.
    pub paid: Decimal,
    /// `amount - paid`.
    pub balance: Decimal,
    /// Number of counted payments.
    pub payment_count: usize,
    /// Number the next settlement posting takes. Never reused, even after a
    /// settlement is reversed.
    pub next_settlement: usize,
    /// The counted payments.
    pub payments: Vec<PaymentLine>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_never_regresses() {
        assert_eq!(CreditStatus::Pending.advance(CreditStatus::Partial), CreditStatus::Partial);
        assert_eq!(CreditStatus::Partial.advance(CreditStatus::Paid), CreditStatus::Paid);
        assert_eq!(CreditStatus::Paid.advance(CreditStatus::Partial), CreditStatus::Paid);
        assert_eq!(CreditStatus::Partial.advance(CreditStatus::Pending), CreditStatus::Partial);
    }

    #[test]
    fn test_credit_terms_from_payment_method() {
        let credit = CreditState::for_payment_method("CREDIT");
        assert!(credit.on_credit);
        assert_eq!(credit.status, CreditStatus::Pending);

        let cash = CreditState::for_payment_method("cash");
        assert!(!cash.on_credit);
        assert_eq!(cash.status, CreditStatus::None);
    }

    #[test]
    fn test_record_balance() {
        let mut state = CreditState::for_payment_method("credit");
        state.record_balance(dec!(60000));
        assert_eq!(state.status, CreditStatus::Partial);
        state.record_balance(dec!(0));
        assert_eq!(state.status, CreditStatus::Paid);
    }

    #[test]
    fn test_kind_movement_type() {
        assert_eq!(ObligationKind::Expense.movement_type(), MovementType::Expense);
        assert_eq!(
            ObligationKind::LocalPurchaseOrder.movement_type(),
            MovementType::Purchase
        );
        assert_eq!(ObligationKind::parse("item_purchase"), Some(ObligationKind::ItemPurchase));
    }
}
