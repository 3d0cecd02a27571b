//! `PostgreSQL` implementation of the ledger storage ports.
//!
//! Every unit of work is a `SERIALIZABLE` database transaction. Two units of
//! work that read and then write overlapping rows cannot both commit; the
//! loser surfaces as [`LedgerError::ConcurrentModification`] and the engine
//! re-runs its validation. Unique-index violations are reported the same
//! way, so a racing duplicate is re-checked and rejected with its proper
//! error on the retry.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RuntimeErr,
    SqlErr, TransactionTrait,
};
use tracing::debug;
use autoledger_core::audit::AuditRecord;
use autoledger_core::credit::CreditObligation;
use autoledger_core::inventory::{JobLineItem, StockEntry};
use autoledger_core::ledger::{BalanceHolder, LedgerEntry, MovementType, PendingStatus, PendingTransaction};
use autoledger_core::store::{LedgerReader, LedgerStore, StoreResult, UnitOfWork};
use autoledger_core::tariff::{Charge, ChargeSplit, Tariff, TariffSchedule};
use autoledger_core::LedgerError;
use autoledger_shared::types::{HolderId, JobId, ObligationId, TariffId};

use super::mapping::{
    audit_from_row, audit_to_row, charge_from_row, charge_to_row, entry_from_row, entry_to_row,
    holder_from_row, holder_to_row, job_line_from_row, job_line_to_row, obligation_from_row,
    obligation_to_row, pending_from_row, pending_to_row, split_from_row, split_to_row,
    stock_from_row, stock_to_row, tariff_from_row, tariff_to_row,
};
use crate::entities::{
    audit_log, balance_holders, charge_splits, charges, credit_obligations, job_line_items,
    ledger_entries, pending_transactions, stock_entries, tariffs,
};

/// `SQLSTATE` codes `PostgreSQL` raises when a transaction lost a race.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

/// Translates a database error into the engine's error vocabulary.
pub(crate) fn map_db_err(err: DbErr) -> LedgerError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        debug!(error = %err, "unique constraint raced");
        return LedgerError::ConcurrentModification;
    }
    let sqlstate = match &err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => {
            e.code().map(std::borrow::Cow::into_owned)
        }
        _ => None,
    };
    if sqlstate.is_some_and(|code| RETRYABLE_SQLSTATES.contains(&code.as_str())) {
        debug!(error = %err, "serialization failure");
        return LedgerError::ConcurrentModification;
    }
    LedgerError::Persistence(err.to_string())
}

/// Ledger store backed by a `PostgreSQL` connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a new store.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Uow = PgUnitOfWork;

    async fn begin(&self) -> StoreResult<PgUnitOfWork> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .map_err(map_db_err)?;
        Ok(PgUnitOfWork { txn })
    }
}

/// One serializable database transaction.
///
/// Dropping it without [`UnitOfWork::commit`] rolls the transaction back.
pub struct PgUnitOfWork {
    txn: DatabaseTransaction,
}

impl PgUnitOfWork {
    async fn schedule(&self, tariff: tariffs::Model) -> StoreResult<TariffSchedule> {
        let tariff_id = tariff.id;
        let charges = charges::Entity::find()
            .filter(charges::Column::TariffId.eq(tariff_id))
            .order_by_asc(charges::Column::MinValue)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(charge_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let splits = charge_splits::Entity::find()
            .filter(charge_splits::Column::TariffId.eq(tariff_id))
            .order_by_asc(charge_splits::Column::Position)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(split_from_row)
            .collect();
        Ok(TariffSchedule {
            tariff: tariff_from_row(tariff)?,
            charges,
            splits,
        })
    }

    async fn entries_where(&self, condition: Condition) -> StoreResult<Vec<LedgerEntry>> {
        ledger_entries::Entity::find()
            .filter(condition)
            .order_by_asc(ledger_entries::Column::Sequence)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(entry_from_row)
            .collect()
    }

    async fn insert_entry(&self, entry: &LedgerEntry) -> StoreResult<LedgerEntry> {
        let row = entry_to_row(entry).insert(&self.txn).await.map_err(map_db_err)?;
        entry_from_row(row)
    }
}

#[async_trait]
impl LedgerReader for PgUnitOfWork {
    async fn holder_by_owner(&self, owner_reference: &str) -> StoreResult<Option<BalanceHolder>> {
        balance_holders::Entity::find()
            .filter(balance_holders::Column::OwnerReference.eq(owner_reference))
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(holder_from_row)
            .transpose()
    }

    async fn holder(&self, id: HolderId) -> StoreResult<Option<BalanceHolder>> {
        balance_holders::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(holder_from_row)
            .transpose()
    }

    async fn entry_by_reference(&self, reference: &str) -> StoreResult<Option<LedgerEntry>> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::Reference.eq(reference))
            .filter(ledger_entries::Column::Label.is_null())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(entry_from_row)
            .transpose()
    }

    async fn reversal_for(&self, original_reference: &str) -> StoreResult<Option<LedgerEntry>> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::ReversalOf.eq(original_reference))
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(entry_from_row)
            .transpose()
    }

    async fn entries_for_holder(&self, holder: HolderId) -> StoreResult<Vec<LedgerEntry>> {
        let id = holder.into_inner();
        self.entries_where(
            Condition::any()
                .add(ledger_entries::Column::DebitHolderId.eq(id))
                .add(ledger_entries::Column::CreditHolderId.eq(id)),
        )
        .await
    }

    async fn entries_by_correlation(&self, correlation: &str) -> StoreResult<Vec<LedgerEntry>> {
        self.entries_where(Condition::all().add(ledger_entries::Column::Correlation.eq(correlation)))
            .await
    }

    async fn stock_by_reference(&self, reference: &str) -> StoreResult<Option<StockEntry>> {
        stock_entries::Entity::find()
            .filter(stock_entries::Column::Reference.eq(reference))
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(stock_from_row)
            .transpose()
    }

    async fn stock_reversal_for(&self, original_reference: &str) -> StoreResult<Option<StockEntry>> {
        stock_entries::Entity::find()
            .filter(stock_entries::Column::ReversalOf.eq(original_reference))
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(stock_from_row)
            .transpose()
    }

    async fn stock_for_holder(&self, holder: HolderId) -> StoreResult<Vec<StockEntry>> {
        let id = holder.into_inner();
        stock_entries::Entity::find()
            .filter(
                Condition::any()
                    .add(stock_entries::Column::DebitHolderId.eq(id))
                    .add(stock_entries::Column::CreditHolderId.eq(id)),
            )
            .order_by_asc(stock_entries::Column::Sequence)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(stock_from_row)
            .collect()
    }

    async fn tariff(&self, id: TariffId) -> StoreResult<Option<TariffSchedule>> {
        let row = tariffs::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        match row {
            Some(row) => Ok(Some(self.schedule(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_tariff(
        &self,
        movement_type: MovementType,
        payment_method: &str,
        scope: &str,
    ) -> StoreResult<Option<TariffSchedule>> {
        let row = tariffs::Entity::find()
            .filter(tariffs::Column::MovementType.eq(movement_type.as_str()))
            .filter(tariffs::Column::PaymentMethod.eq(payment_method))
            .filter(tariffs::Column::Scope.eq(scope))
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        match row {
            Some(row) => Ok(Some(self.schedule(row).await?)),
            None => Ok(None),
        }
    }

    async fn obligation(&self, id: ObligationId) -> StoreResult<Option<CreditObligation>> {
        credit_obligations::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(obligation_from_row)
            .transpose()
    }

    async fn obligation_by_reference(&self, reference: &str) -> StoreResult<Option<CreditObligation>> {
        credit_obligations::Entity::find()
            .filter(credit_obligations::Column::Reference.eq(reference))
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(obligation_from_row)
            .transpose()
    }

    async fn job_lines(&self, job: JobId) -> StoreResult<Vec<JobLineItem>> {
        Ok(job_line_items::Entity::find()
            .filter(job_line_items::Column::JobId.eq(job.into_inner()))
            .order_by_asc(job_line_items::Column::CreatedAt)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(job_line_from_row)
            .collect())
    }

    async fn pending(&self, limit: u64) -> StoreResult<Vec<PendingTransaction>> {
        pending_transactions::Entity::find()
            .filter(pending_transactions::Column::Status.eq(PendingStatus::Pending.as_str()))
            .order_by_asc(pending_transactions::Column::CreatedAt)
            .limit(limit)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(pending_from_row)
            .collect()
    }

    async fn audit_trail(&self, record_id: &str) -> StoreResult<Vec<AuditRecord>> {
        audit_log::Entity::find()
            .filter(audit_log::Column::RecordId.eq(record_id))
            .order_by_asc(audit_log::Column::RecordedAt)
            .order_by_asc(audit_log::Column::Id)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(audit_from_row)
            .collect()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_holder(&mut self, holder: &BalanceHolder) -> StoreResult<()> {
        holder_to_row(holder).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn append_entries(&mut self, entries: Vec<LedgerEntry>) -> StoreResult<Vec<LedgerEntry>> {
        let mut appended = Vec::with_capacity(entries.len());
        for entry in &entries {
            appended.push(self.insert_entry(entry).await?);
        }
        Ok(appended)
    }

    async fn append_stock(&mut self, entry: StockEntry) -> StoreResult<StockEntry> {
        let row = stock_to_row(&entry).insert(&self.txn).await.map_err(map_db_err)?;
        stock_from_row(row)
    }

    async fn insert_tariff(&mut self, tariff: &Tariff) -> StoreResult<()> {
        tariff_to_row(tariff).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_charge(&mut self, charge: &Charge) -> StoreResult<()> {
        charge_to_row(charge).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_split(&mut self, split: &ChargeSplit) -> StoreResult<()> {
        split_to_row(split).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn save_obligation(&mut self, obligation: &CreditObligation) -> StoreResult<()> {
        credit_obligations::Entity::insert(obligation_to_row(obligation))
            .on_conflict(
                OnConflict::column(credit_obligations::Column::Id)
                    .update_columns([
                        credit_obligations::Column::OnCredit,
                        credit_obligations::Column::CreditStatus,
                        credit_obligations::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_job_line(&mut self, line: &JobLineItem) -> StoreResult<()> {
        job_line_to_row(line).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn save_pending(&mut self, pending: &PendingTransaction) -> StoreResult<()> {
        pending_transactions::Entity::insert(pending_to_row(pending)?)
            .on_conflict(
                OnConflict::column(pending_transactions::Column::Id)
                    .update_columns([
                        pending_transactions::Column::Status,
                        pending_transactions::Column::Reason,
                        pending_transactions::Column::ProcessedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn record_audit(&mut self, record: &AuditRecord) -> StoreResult<()> {
        audit_log::Entity::insert(audit_to_row(record))
            .exec_without_returning(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.txn.commit().await.map_err(map_db_err)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.txn.rollback().await.map_err(map_db_err)
    }
}

/// Counts the deferred transactions still waiting for replay.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn pending_backlog(db: &DatabaseConnection) -> StoreResult<u64> {
    pending_transactions::Entity::find()
        .filter(pending_transactions::Column::Status.eq(PendingStatus::Pending.as_str()))
        .count(db)
        .await
        .map_err(map_db_err)
}
