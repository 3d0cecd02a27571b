//! In-memory store.
//!
//! Units of work are serialized behind a single lock and write to a staged copy
//! of the state, which replaces the live state on commit.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use autoledger_shared::types::{HolderId, JobId, ObligationId, TariffId};

use super::{LedgerReader, LedgerStore, StoreResult, UnitOfWork};
use crate::audit::AuditRecord;
use crate::credit::CreditObligation;
use crate::inventory::{JobLineItem, StockEntry};
use crate::ledger::entry::LedgerEntry;
use crate::ledger::error::LedgerError;
use crate::ledger::holder::BalanceHolder;
use crate::ledger::pending::{PendingStatus, PendingTransaction};
use crate::ledger::types::MovementType;
use crate::tariff::{Charge, ChargeSplit, Tariff, TariffSchedule};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    holders: Vec<BalanceHolder>,
    entries: Vec<LedgerEntry>,
    stock: Vec<StockEntry>,
    tariffs: Vec<Tariff>,
    charges: Vec<Charge>,
    splits: Vec<ChargeSplit>,
    obligations: Vec<CreditObligation>,
    job_lines: Vec<JobLineItem>,
    pending: Vec<PendingTransaction>,
    audit: Vec<AuditRecord>,
    last_sequence: i64,
    last_stock_sequence: i64,
}

impl MemoryState {
    fn schedule(&self, tariff: &Tariff) -> TariffSchedule {
        let mut splits: Vec<ChargeSplit> = self
            .splits
            .iter()
            .filter(|s| s.tariff_id == tariff.id)
            .cloned()
            .collect();
        splits.sort_by_key(|s| s.position);
        TariffSchedule {
            tariff: tariff.clone(),
            charges: self
                .charges
                .iter()
                .filter(|c| c.tariff_id == tariff.id)
                .cloned()
                .collect(),
            splits,
        }
    }
}

/// Store keeping everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
    conflicts: Arc<AtomicU32>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next commit fail with a persistence error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Makes the next `count` commits fail as serialization conflicts.
    pub fn conflict_next_commits(&self, count: u32) {
        self.conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of monetary postings committed.
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Number of stock postings committed.
    pub async fn stock_count(&self) -> usize {
        self.state.lock().await.stock.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Uow = MemoryUnitOfWork;

    async fn begin(&self) -> StoreResult<MemoryUnitOfWork> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryUnitOfWork {
            guard,
            staged,
            fail_next_commit: Arc::clone(&self.fail_next_commit),
            conflicts: Arc::clone(&self.conflicts),
        })
    }
}

/// Unit of work over [`MemoryLedgerStore`].
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_next_commit: Arc<AtomicBool>,
    conflicts: Arc<AtomicU32>,
}

#[async_trait]
impl LedgerReader for MemoryUnitOfWork {
    async fn holder_by_owner(&self, owner_reference: &str) -> StoreResult<Option<BalanceHolder>> {
        Ok(self
            .staged
            .holders
            .iter()
            .find(|h| h.owner_reference == owner_reference)
            .cloned())
    }

    async fn holder(&self, id: HolderId) -> StoreResult<Option<BalanceHolder>> {
        Ok(self.staged.holders.iter().find(|h| h.id == id).cloned())
    }

    async fn entry_by_reference(&self, reference: &str) -> StoreResult<Option<LedgerEntry>> {
        Ok(self
            .staged
            .entries
            .iter()
            .find(|e| e.reference == reference && e.is_primary())
            .cloned())
    }

    async fn reversal_for(&self, original_reference: &str) -> StoreResult<Option<LedgerEntry>> {
        Ok(self
            .staged
            .entries
            .iter()
            .find(|e| e.reversal_of.as_deref() == Some(original_reference))
            .cloned())
    }

    async fn entries_for_holder(&self, holder: HolderId) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self
            .staged
            .entries
            .iter()
            .filter(|e| e.debit_holder == holder || e.credit_holder == holder)
            .cloned()
            .collect())
    }

    async fn entries_by_correlation(&self, correlation: &str) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self
            .staged
            .entries
            .iter()
            .filter(|e| e.correlation.as_deref() == Some(correlation))
            .cloned()
            .collect())
    }

    async fn stock_by_reference(&self, reference: &str) -> StoreResult<Option<StockEntry>> {
        Ok(self
            .staged
            .stock
            .iter()
            .find(|e| e.reference == reference)
            .cloned())
    }

    async fn stock_reversal_for(&self, original_reference: &str) -> StoreResult<Option<StockEntry>> {
        Ok(self
            .staged
            .stock
            .iter()
            .find(|e| e.reversal_of.as_deref() == Some(original_reference))
            .cloned())
    }

    async fn stock_for_holder(&self, holder: HolderId) -> StoreResult<Vec<StockEntry>> {
        Ok(self
            .staged
            .stock
            .iter()
            .filter(|e| e.debit_holder == holder || e.credit_holder == holder)
            .cloned()
            .collect())
    }

    async fn tariff(&self, id: TariffId) -> StoreResult<Option<TariffSchedule>> {
        Ok(self
            .staged
            .tariffs
            .iter()
            .find(|t| t.id == id)
            .map(|t| self.staged.schedule(t)))
    }

    async fn find_tariff(
        &self,
        movement_type: MovementType,
        payment_method: &str,
        scope: &str,
    ) -> StoreResult<Option<TariffSchedule>> {
        Ok(self
            .staged
            .tariffs
            .iter()
            .find(|t| {
                t.movement_type == movement_type
                    && t.payment_method == payment_method
                    && t.scope == scope
            })
            .map(|t| self.staged.schedule(t)))
    }

    async fn obligation(&self, id: ObligationId) -> StoreResult<Option<CreditObligation>> {
        Ok(self.staged.obligations.iter().find(|o| o.id == id).cloned())
    }

    async fn obligation_by_reference(&self, reference: &str) -> StoreResult<Option<CreditObligation>> {
        Ok(self
            .staged
            .obligations
            .iter()
            .find(|o| o.reference == reference)
            .cloned())
    }

    async fn job_lines(&self, job: JobId) -> StoreResult<Vec<JobLineItem>> {
        Ok(self
            .staged
            .job_lines
            .iter()
            .filter(|l| l.job_id == job)
            .cloned()
            .collect())
    }

    async fn pending(&self, limit: u64) -> StoreResult<Vec<PendingTransaction>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .staged
            .pending
            .iter()
            .filter(|p| p.status == PendingStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn audit_trail(&self, record_id: &str) -> StoreResult<Vec<AuditRecord>> {
        Ok(self
            .staged
            .audit
            .iter()
            .filter(|a| a.record_id == record_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_holder(&mut self, holder: &BalanceHolder) -> StoreResult<()> {
        if self
            .staged
            .holders
            .iter()
            .any(|h| h.owner_reference == holder.owner_reference)
        {
            return Err(LedgerError::DuplicateHolder(holder.owner_reference.clone()));
        }
        self.staged.holders.push(holder.clone());
        Ok(())
    }

    async fn append_entries(&mut self, entries: Vec<LedgerEntry>) -> StoreResult<Vec<LedgerEntry>> {
        let mut appended = Vec::with_capacity(entries.len());
        for mut entry in entries {
            if self
                .staged
                .entries
                .iter()
                .any(|e| e.reference == entry.reference && e.label == entry.label)
            {
                return Err(LedgerError::DuplicateReference(entry.reference));
            }
            if let Some(original) = entry.reversal_of.as_deref()
                && self
                    .staged
                    .entries
                    .iter()
                    .any(|e| e.reversal_of.as_deref() == Some(original))
            {
                return Err(LedgerError::AlreadyReversed(original.to_string()));
            }
            self.staged.last_sequence += 1;
            entry.sequence = self.staged.last_sequence;
            self.staged.entries.push(entry.clone());
            appended.push(entry);
        }
        Ok(appended)
    }

    async fn append_stock(&mut self, mut entry: StockEntry) -> StoreResult<StockEntry> {
        if self.staged.stock.iter().any(|e| e.reference == entry.reference) {
            return Err(LedgerError::DuplicateReference(entry.reference));
        }
        if let Some(original) = entry.reversal_of.as_deref()
            && self
                .staged
                .stock
                .iter()
                .any(|e| e.reversal_of.as_deref() == Some(original))
        {
            return Err(LedgerError::AlreadyReversed(original.to_string()));
        }
        self.staged.last_stock_sequence += 1;
        entry.sequence = self.staged.last_stock_sequence;
        self.staged.stock.push(entry.clone());
        Ok(entry)
    }

    async fn insert_tariff(&mut self, tariff: &Tariff) -> StoreResult<()> {
        self.staged.tariffs.push(tariff.clone());
        Ok(())
    }

    async fn insert_charge(&mut self, charge: &Charge) -> StoreResult<()> {
        self.staged.charges.push(charge.clone());
        Ok(())
    }

    async fn insert_split(&mut self, split: &ChargeSplit) -> StoreResult<()> {
        self.staged.splits.push(split.clone());
        Ok(())
    }

    async fn save_obligation(&mut self, obligation: &CreditObligation) -> StoreResult<()> {
        match self
            .staged
            .obligations
            .iter_mut()
            .find(|o| o.id == obligation.id)
        {
            Some(existing) => *existing = obligation.clone(),
            None => self.staged.obligations.push(obligation.clone()),
        }
        Ok(())
    }

    async fn insert_job_line(&mut self, line: &JobLineItem) -> StoreResult<()> {
        self.staged.job_lines.push(line.clone());
        Ok(())
    }

    async fn save_pending(&mut self, pending: &PendingTransaction) -> StoreResult<()> {
        match self.staged.pending.iter_mut().find(|p| p.id == pending.id) {
            Some(existing) => *existing = pending.clone(),
            None => self.staged.pending.push(pending.clone()),
        }
        Ok(())
    }

    async fn record_audit(&mut self, record: &AuditRecord) -> StoreResult<()> {
        self.staged.audit.push(record.clone());
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        let Self {
            mut guard,
            staged,
            fail_next_commit,
            conflicts,
        } = self;
        if fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(LedgerError::Persistence(
                "injected commit failure".to_string(),
            ));
        }
        if conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(LedgerError::ConcurrentModification);
        }
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
