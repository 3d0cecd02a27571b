//! Storage ports.
//!
//! The engine reads and writes through a [`UnitOfWork`]: everything done on one
//! unit of work becomes visible together on [`UnitOfWork::commit`], or not at
//! all. Dropping a unit of work without committing rolls it back.
//!
//! Implementations must make the read-check-write sequence safe against
//! concurrent units of work, either by serializing them or by failing the
//! later commit with [`LedgerError::ConcurrentModification`].

pub mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;
use autoledger_shared::types::{HolderId, JobId, ObligationId, TariffId};

use crate::audit::AuditRecord;
use crate::credit::CreditObligation;
use crate::inventory::{JobLineItem, StockEntry};
use crate::ledger::balance::{AsOf, derive_balance};
use crate::ledger::entry::LedgerEntry;
use crate::ledger::error::LedgerError;
use crate::ledger::holder::BalanceHolder;
use crate::ledger::pending::PendingTransaction;
use crate::ledger::types::MovementType;
use crate::tariff::{Charge, ChargeSplit, Tariff, TariffSchedule};

pub use memory::MemoryLedgerStore;

/// Result alias for storage calls.
pub type StoreResult<T> = Result<T, LedgerError>;

/// Read side of the store.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Looks up a holder by owner reference.
    async fn holder_by_owner(&self, owner_reference: &str) -> StoreResult<Option<BalanceHolder>>;

    /// Looks up a holder by id.
    async fn holder(&self, id: HolderId) -> StoreResult<Option<BalanceHolder>>;

    /// Returns the primary monetary posting with `reference`.
    async fn entry_by_reference(&self, reference: &str) -> StoreResult<Option<LedgerEntry>>;

    /// Returns the monetary posting that reverses `original_reference`.
    async fn reversal_for(&self, original_reference: &str) -> StoreResult<Option<LedgerEntry>>;

    /// Returns every monetary posting touching `holder`, in sequence order.
    async fn entries_for_holder(&self, holder: HolderId) -> StoreResult<Vec<LedgerEntry>>;

    /// Returns every monetary posting correlated to an obligation reference.
    async fn entries_by_correlation(&self, correlation: &str) -> StoreResult<Vec<LedgerEntry>>;

    /// Derived monetary balance of `holder`.
    async fn balance(&self, holder: HolderId) -> StoreResult<Decimal> {
        let entries = self.entries_for_holder(holder).await?;
        Ok(derive_balance(holder, &entries, AsOf::Latest).balance)
    }

    /// Returns the stock posting with `reference`.
    async fn stock_by_reference(&self, reference: &str) -> StoreResult<Option<StockEntry>>;

    /// Returns the stock posting that reverses `original_reference`.
    async fn stock_reversal_for(&self, original_reference: &str) -> StoreResult<Option<StockEntry>>;

    /// Returns every stock posting touching `holder`, in sequence order.
    async fn stock_for_holder(&self, holder: HolderId) -> StoreResult<Vec<StockEntry>>;

    /// Derived on-hand quantity of `holder`.
    async fn on_hand(&self, holder: HolderId) -> StoreResult<i64> {
        let entries = self.stock_for_holder(holder).await?;
        Ok(derive_balance(holder, &entries, AsOf::Latest).balance)
    }

    /// Returns a tariff with its tiers and splits.
    async fn tariff(&self, id: TariffId) -> StoreResult<Option<TariffSchedule>>;

    /// Returns the tariff registered for exactly this key.
    async fn find_tariff(
        &self,
        movement_type: MovementType,
        payment_method: &str,
        scope: &str,
    ) -> StoreResult<Option<TariffSchedule>>;

    /// Looks up an obligation by id.
    async fn obligation(&self, id: ObligationId) -> StoreResult<Option<CreditObligation>>;

    /// Looks up an obligation by reference.
    async fn obligation_by_reference(&self, reference: &str) -> StoreResult<Option<CreditObligation>>;

    /// Returns the job line items written for `job`.
    async fn job_lines(&self, job: JobId) -> StoreResult<Vec<JobLineItem>>;

    /// Returns up to `limit` deferred transactions still pending, oldest first.
    async fn pending(&self, limit: u64) -> StoreResult<Vec<PendingTransaction>>;

    /// Returns the audit trail of one record, oldest first.
    async fn audit_trail(&self, record_id: &str) -> StoreResult<Vec<AuditRecord>>;
}

/// Write side of the store, scoped to one atomic unit.
#[async_trait]
pub trait UnitOfWork: LedgerReader + Sized {
    /// Inserts a holder.
    async fn insert_holder(&mut self, holder: &BalanceHolder) -> StoreResult<()>;

    /// Appends monetary postings, assigning their sequence numbers.
    async fn append_entries(&mut self, entries: Vec<LedgerEntry>) -> StoreResult<Vec<LedgerEntry>>;

    /// Appends a stock posting, assigning its sequence number.
    async fn append_stock(&mut self, entry: StockEntry) -> StoreResult<StockEntry>;

    /// Inserts a tariff header.
    async fn insert_tariff(&mut self, tariff: &Tariff) -> StoreResult<()>;

    /// Inserts a tier.
    async fn insert_charge(&mut self, charge: &Charge) -> StoreResult<()>;

    /// Inserts a split.
    async fn insert_split(&mut self, split: &ChargeSplit) -> StoreResult<()>;

    /// Inserts or updates an obligation.
    async fn save_obligation(&mut self, obligation: &CreditObligation) -> StoreResult<()>;

    /// Inserts a job line item.
    async fn insert_job_line(&mut self, line: &JobLineItem) -> StoreResult<()>;

    /// Inserts or updates a deferred transaction.
    async fn save_pending(&mut self, pending: &PendingTransaction) -> StoreResult<()>;

    /// Writes an audit record.
    async fn record_audit(&mut self, record: &AuditRecord) -> StoreResult<()>;

    /// Makes every write visible atomically.
    async fn commit(self) -> StoreResult<()>;

    /// Discards every write.
    async fn rollback(self) -> StoreResult<()>;
}

/// Factory for units of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Unit of work type.
    type Uow: UnitOfWork;

    /// Opens a unit of work.
    async fn begin(&self) -> StoreResult<Self::Uow>;
}
