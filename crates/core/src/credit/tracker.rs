//! Credit tracking.
//!
//! Paid amounts are never stored on the obligation; they are folded from the
//! postings correlated to its reference.

use std::collections::HashSet;

use rust_decimal::Decimal;

use super::types::{CreditObligation, CreditStatus, Outstanding, PaymentLine};
use crate::ledger::entry::LedgerEntry;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{CREDIT_LEG_SUFFIX, CREDIT_METHOD, PostingRequest};

/// Separates an obligation reference from its settlement number.
pub const SETTLEMENT_SEPARATOR: char = '#';

/// Posting reference of settlement number `n` of `obligation_reference`.
#[must_use]
pub fn settlement_reference(obligation_reference: &str, n: usize) -> String {
    format!("{obligation_reference}{SETTLEMENT_SEPARATOR}{n}")
}

/// A validated settlement, ready to post.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPlan {
    /// Posting to commit.
    pub request: PostingRequest,
    /// Balance left after the posting.
    pub new_balance: Decimal,
    /// Status the obligation moves to.
    pub status: CreditStatus,
}

/// Stateless credit tracker.
pub struct CreditTracker;

impl CreditTracker {
    /// Folds the postings correlated to `obligation` into its settlement position.
    ///
    /// Credit-establishing legs, fee legs, reversals and reversed payments are
    /// not counted.
    #[must_use]
    pub fn outstanding(obligation: &CreditObligation, entries: &[LedgerEntry]) -> Outstanding {
        let correlated: Vec<&LedgerEntry> = entries
            .iter()
            .filter(|e| e.correlation.as_deref() == Some(obligation.reference.as_str()))
            .collect();
        let reversed: HashSet<&str> = correlated
            .iter()
            .filter_map(|e| e.reversal_of.as_deref())
            .collect();
        let next_settlement = correlated
            .iter()
            .filter_map(|e| {
                e.reference
                    .strip_prefix(obligation.reference.as_str())?
                    .strip_prefix(SETTLEMENT_SEPARATOR)?
                    .parse::<usize>()
                    .ok()
            })
            .max()
            .map_or(0, |n| n + 1);

        let payments: Vec<PaymentLine> = correlated
            .into_iter()
            .filter(|e| e.is_primary() && !e.is_credit_leg() && !e.is_reversal())
            .filter(|e| !reversed.contains(e.reference.as_str()))
            .map(|e| PaymentLine {
                entry_id: e.id,
                reference: e.reference.clone(),
                movement_type: e.movement_type,
                payment_method: e.payment_method.clone(),
                amount: e.amount,
                posted_at: e.posted_at,
            })
            .collect();

        let paid: Decimal = payments.iter().map(|p| p.amount).sum();
        Outstanding {
            paid,
            balance: obligation.amount - paid,
            payment_count: payments.len(),
            next_settlement,
            payments,
        }
    }

    /// Builds the posting that records an obligation when it is raised.
    ///
    /// On credit, the value moves from the credit control holder to the
    /// counterparty under `<reference>-credit`. Otherwise the payment is made
    /// straight away from the settlement holder.
    #[must_use]
    pub fn opening_posting(obligation: &CreditObligation, credit_owner: &str) -> PostingRequest {
        let movement = obligation.kind.movement_type();
        let request = if obligation.credit.on_credit {
            PostingRequest::new(
                format!("{}{CREDIT_LEG_SUFFIX}", obligation.reference),
                obligation.amount,
                movement.as_str(),
                CREDIT_METHOD,
                credit_owner,
                obligation.counterparty_owner.as_str(),
            )
        } else {
            PostingRequest::new(
                obligation.reference.as_str(),
                obligation.amount,
                movement.as_str(),
                obligation.payment_method.as_str(),
                obligation.settlement_owner.as_str(),
                obligation.counterparty_owner.as_str(),
            )
        };
        request
            .with_scope(obligation.scope.as_str())
            .with_correlation(obligation.reference.as_str())
            .with_description(obligation.kind.as_str())
    }

    /// Validates a settlement of `amount_to_pay` and plans its posting.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSettlement` for a non-positive amount, `NotOnCredit`
    /// when the obligation was paid upfront, and `Overpayment` when the amount
    /// exceeds what is outstanding.
    pub fn plan_settlement(
        obligation: &CreditObligation,
        outstanding: &Outstanding,
        amount_to_pay: Decimal,
        credit_owner: &str,
    ) -> Result<SettlementPlan, LedgerError> {
        if amount_to_pay <= Decimal::ZERO {
            return Err(LedgerError::InvalidSettlement(amount_to_pay));
        }
        if !obligation.credit.on_credit {
            return Err(LedgerError::NotOnCredit(obligation.reference.clone()));
        }

        let new_balance = obligation.amount - (outstanding.paid + amount_to_pay);
        if new_balance < Decimal::ZERO {
            return Err(LedgerError::Overpayment {
                reference: obligation.reference.clone(),
                outstanding: outstanding.balance,
                attempted: amount_to_pay,
            });
        }

        let mut credit = obligation.credit;
        credit.record_balance(new_balance);

        let request = PostingRequest::new(
            settlement_reference(&obligation.reference, outstanding.next_settlement),
            amount_to_pay,
            obligation.kind.movement_type().as_str(),
            obligation.settlement_owner.as_str(),
            obligation.settlement_owner.as_str(),
            credit_owner,
        )
        .with_scope(obligation.scope.as_str())
        .with_correlation(obligation.reference.as_str())
        .with_description(format!("settlement of {}", obligation.reference));

        Ok(SettlementPlan {
            request,
            new_balance,
            status: credit.status,
        })
    }
}
