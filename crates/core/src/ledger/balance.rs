//! Balance derivation.
//!
//! Balances are never stored. Every figure here is folded from posting history
//! on demand: credits add to a holder, debits subtract.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use autoledger_shared::types::HolderId;

use super::entry::{EntryType, LedgerEntry, Posting};
use super::period::AccountingPeriod;

/// Cut-off for a point-in-time balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AsOf {
    /// Everything posted so far.
    #[default]
    Latest,
    /// Postings with `posted_at <= t`.
    Time(DateTime<Utc>),
    /// Postings with `sequence <= n`.
    Sequence(i64),
}

impl AsOf {
    /// Returns true if `posting` falls inside the cut-off.
    pub fn includes<P: Posting>(&self, posting: &P) -> bool {
        match self {
            Self::Latest => true,
            Self::Time(at) => posting.posted_at() <= *at,
            Self::Sequence(seq) => posting.sequence() <= *seq,
        }
    }
}

/// Debit and credit totals for a holder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HolderBalance<A> {
    /// The holder.
    pub holder_id: HolderId,
    /// Total debited from the holder.
    pub debit_total: A,
    /// Total credited to the holder.
    pub credit_total: A,
    /// `credit_total - debit_total`.
    pub balance: A,
    /// Postings folded in.
    pub entry_count: usize,
}

/// Monetary balance of a holder.
pub type AccountBalance = HolderBalance<Decimal>;

impl<A> HolderBalance<A>
where
    A: Copy + Default + std::ops::Add<Output = A> + std::ops::Sub<Output = A>,
{
    /// Creates an empty balance.
    #[must_use]
    pub fn new(holder_id: HolderId) -> Self {
        Self {
            holder_id,
            debit_total: A::default(),
            credit_total: A::default(),
            balance: A::default(),
            entry_count: 0,
        }
    }

    /// Adds a debit amount.
    pub fn add_debit(&mut self, amount: A) {
        self.debit_total = self.debit_total + amount;
        self.balance = self.credit_total - self.debit_total;
        self.entry_count += 1;
    }

    /// Adds a credit amount.
    pub fn add_credit(&mut self, amount: A) {
        self.credit_total = self.credit_total + amount;
        self.balance = self.credit_total - self.debit_total;
        self.entry_count += 1;
    }

    /// Folds one posting into the balance if it touches the holder.
    pub fn apply<P: Posting<Amount = A>>(&mut self, posting: &P) {
        match posting.side_for(self.holder_id) {
            Some(EntryType::Debit) => self.add_debit(posting.magnitude()),
            Some(EntryType::Credit) => self.add_credit(posting.magnitude()),
            None => {}
        }
    }
}

/// Derives a holder's balance from its postings up to `as_of`.
pub fn derive_balance<P: Posting>(
    holder_id: HolderId,
    postings: &[P],
    as_of: AsOf,
) -> HolderBalance<P::Amount> {
    let mut balance = HolderBalance::new(holder_id);
    for posting in postings.iter().filter(|p| as_of.includes(*p)) {
        balance.apply(posting);
    }
    balance
}

/// Running balance information for a posting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunningBalance<A> {
    /// Position of the posting in the holder's history, starting at 1.
    pub version: i64,
    /// Balance before this posting.
    pub previous_balance: A,
    /// Balance after this posting.
    pub current_balance: A,
}

impl<A> RunningBalance<A>
where
    A: Copy + Default + std::ops::Add<Output = A>,
{
    /// Creates the running balance for the first posting on a holder.
    #[must_use]
    pub fn first_entry(change: A) -> Self {
        Self {
            version: 1,
            previous_balance: A::default(),
            current_balance: change,
        }
    }

    /// Creates the running balance following `previous`.
    #[must_use]
    pub fn next_entry(previous: &Self, change: A) -> Self {
        Self {
            version: previous.version + 1,
            previous_balance: previous.current_balance,
            current_balance: previous.current_balance + change,
        }
    }
}

/// One line of a holder statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine<P, A> {
    /// The posting.
    pub entry: P,
    /// Signed effect on the holder.
    pub change: A,
    /// Balances around the posting.
    pub running: RunningBalance<A>,
}

/// Builds a statement in sequence order with running balances.
pub fn statement<P: Posting + Clone>(
    holder_id: HolderId,
    postings: &[P],
) -> Vec<StatementLine<P, P::Amount>> {
    let mut ordered: Vec<&P> = postings.iter().collect();
    ordered.sort_by_key(|p| p.sequence());

    let mut lines: Vec<StatementLine<P, P::Amount>> = Vec::with_capacity(ordered.len());
    for posting in ordered {
        let Some(change) = posting.signed_for(holder_id) else {
            continue;
        };
        let running = match lines.last() {
            Some(prev) => RunningBalance::next_entry(&prev.running, change),
            None => RunningBalance::first_entry(change),
        };
        lines.push(StatementLine {
            entry: posting.clone(),
            change,
            running,
        });
    }
    lines
}

/// Balance of one wallet (dimension group) of a holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    /// Dimension tag; `None` groups untagged postings.
    pub dimension: Option<String>,
    /// Derived balance for the group.
    pub balance: AccountBalance,
}

/// Groups a holder's monetary postings by dimension and derives one balance per group.
#[must_use]
pub fn wallets(holder_id: HolderId, entries: &[LedgerEntry], as_of: AsOf) -> Vec<WalletBalance> {
    let mut groups: BTreeMap<Option<String>, AccountBalance> = BTreeMap::new();
    for entry in entries.iter().filter(|e| as_of.includes(*e)) {
        if entry.side_for(holder_id).is_none() {
            continue;
        }
        groups
            .entry(entry.dimension.clone())
            .or_insert_with(|| AccountBalance::new(holder_id))
            .apply(entry);
    }
    groups
        .into_iter()
        .map(|(dimension, balance)| WalletBalance { dimension, balance })
        .collect()
}

/// Debit and credit totals of a holder within one accounting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// The period.
    pub period: AccountingPeriod,
    /// Balance carried in from earlier periods.
    pub opening_balance: Decimal,
    /// Activity within the period.
    pub activity: AccountBalance,
    /// Balance at the end of the period.
    pub closing_balance: Decimal,
}

/// Summarises a holder's activity within `period`.
#[must_use]
pub fn period_summary(
    holder_id: HolderId,
    entries: &[LedgerEntry],
    period: AccountingPeriod,
) -> PeriodSummary {
    let mut opening = AccountBalance::new(holder_id);
    let mut activity = AccountBalance::new(holder_id);
    for entry in entries {
        if entry.accounting_period < period {
            opening.apply(entry);
        } else if entry.accounting_period == period {
            activity.apply(entry);
        }
    }
    PeriodSummary {
        period,
        opening_balance: opening.balance,
        closing_balance: opening.balance + activity.balance,
        activity,
    }
}
