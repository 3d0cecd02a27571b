//! Ledger engine.
//!
//! [`Ledger`] runs every operation inside one unit of work: it reads, validates
//! against what it read, writes postings with their audit records and commits.
//! A commit that loses a serialization race is retried from the top, so the
//! retry revalidates against the balance the winner left behind.
//!
//! Notices for committed postings are handed to the [`Notifier`] on detached
//! tasks; a delivery failure is logged and never reaches the caller.

mod notice;

pub use notice::{format_amount, notice_for};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use autoledger_shared::config::LedgerConfig;
use autoledger_shared::types::{ChargeId, ChargeSplitId, HolderId, JobLineId, ObligationId, TariffId};
use autoledger_shared::{Notification, Notifier};

use crate::audit::{AuditAction, AuditRecord};
use crate::credit::{CreditObligation, CreditState, CreditTracker, NewObligation, Outstanding};
use crate::inventory::{JobCompletion, JobLineItem, StockEntry, StockRequest, StockService};
use crate::ledger::balance::{
    AccountBalance, AsOf, HolderBalance, PeriodSummary, StatementLine, WalletBalance, derive_balance,
    period_summary, statement, wallets,
};
use crate::ledger::entry::LedgerEntry;
use crate::ledger::error::LedgerError;
use crate::ledger::holder::{BalanceHolder, NewHolder};
use crate::ledger::pending::{PendingTransaction, ReplaySummary};
use crate::ledger::period::AccountingPeriod;
use crate::ledger::service::LedgerService;
use crate::ledger::types::{MovementType, PostingBatch, PostingReceipt, PostingRequest};
use crate::store::{LedgerReader, LedgerStore, UnitOfWork};
use crate::tariff::{Charge, ChargeSplit, NewCharge, NewSplit, NewTariff, Tariff, TariffEngine};

const HOLDER_RECORD: &str = "balance_holder";
const ENTRY_RECORD: &str = "ledger_entry";
const STOCK_RECORD: &str = "stock_entry";
const TARIFF_RECORD: &str = "tariff";
const CHARGE_RECORD: &str = "charge";
const SPLIT_RECORD: &str = "charge_split";
const OBLIGATION_RECORD: &str = "credit_obligation";
const JOB_LINE_RECORD: &str = "job_line_item";

/// Outcome of a committed settlement.
#[derive(Debug, Clone)]
pub struct Settlement {
    /// The settlement posting.
    pub receipt: PostingReceipt,
    /// The obligation with its advanced status.
    pub obligation: CreditObligation,
    /// Balance left to pay.
    pub balance: Decimal,
}

/// The ledger engine.
pub struct Ledger<S> {
    store: S,
    config: LedgerConfig,
    notifier: Option<Arc<dyn Notifier>>,
    currency_label: String,
    in_flight: Mutex<JoinSet<()>>,
}

impl<S: LedgerStore> Ledger<S> {
    /// Creates an engine over `store` with notifications disabled.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            notifier: None,
            currency_label: String::new(),
            in_flight: Mutex::new(JoinSet::new()),
        }
    }

    /// Sends notices through `notifier` after each commit.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>, currency_label: impl Into<String>) -> Self {
        self.notifier = Some(notifier);
        self.currency_label = currency_label.into();
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========== Holders ==========

    /// Opens a balance holder for an owner reference.
    pub async fn open_holder(&self, holder: NewHolder) -> Result<BalanceHolder, LedgerError> {
        let owner = holder.owner_reference.clone();
        let mut attempt = 1;
        loop {
            match self.try_open_holder(holder.clone()).await {
                Err(err) if self.should_retry("open_holder", &err, attempt) => attempt += 1,
                outcome => return Self::finish("open_holder", &owner, outcome),
            }
        }
    }

    async fn try_open_holder(&self, holder: NewHolder) -> Result<BalanceHolder, LedgerError> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;
        if uow.holder_by_owner(holder.owner_reference.trim()).await?.is_some() {
            return Err(LedgerError::DuplicateHolder(holder.owner_reference));
        }
        let holder = holder.into_holder(now)?;
        uow.insert_holder(&holder).await?;
        Self::audit(&mut uow, HOLDER_RECORD, holder.id, AuditAction::Create, &holder, now).await?;
        uow.commit().await?;
        Ok(holder)
    }

    /// Looks up a holder by owner reference.
    pub async fn holder(&self, owner_reference: &str) -> Result<BalanceHolder, LedgerError> {
        let uow = self.store.begin().await?;
        let holder = uow
            .holder_by_owner(owner_reference)
            .await?
            .ok_or_else(|| LedgerError::HolderNotFound(owner_reference.to_string()))?;
        uow.rollback().await?;
        Ok(holder)
    }

    // ========== Postings ==========

    /// Validates and commits a monetary posting with its fee legs.
    ///
    /// Nothing is written unless every check passes; the primary posting, its
    /// fee legs and their audit records become visible together.
    pub async fn post(&self, request: &PostingRequest) -> Result<PostingReceipt, LedgerError> {
        let mut attempt = 1;
        let outcome = loop {
            match self.try_post(request).await {
                Err(err) if self.should_retry("post", &err, attempt) => attempt += 1,
                outcome => break outcome,
            }
        };
        let (receipt, notice) = Self::finish("post", &request.reference, outcome)?;
        debug!(reference = %receipt.primary.reference, entries = receipt.len(), "Posting batch committed");
        self.dispatch(notice).await;
        Ok(receipt)
    }

    async fn try_post(
        &self,
        request: &PostingRequest,
    ) -> Result<(PostingReceipt, Option<Notification>), LedgerError> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;
        let batch = LedgerService::prepare(&uow, request, &self.config, now).await?;
        let committed = self.write_batch(&mut uow, batch, now).await?;
        uow.commit().await?;
        Ok(committed)
    }

    /// Appends a prepared batch and its audit records.
    async fn write_batch(
        &self,
        uow: &mut S::Uow,
        batch: PostingBatch,
        now: DateTime<Utc>,
    ) -> Result<(PostingReceipt, Option<Notification>), LedgerError> {
        let PostingBatch {
            entries,
            debit_holder,
            credit_holder,
            ..
        } = batch;

        let mut appended = uow.append_entries(entries).await?.into_iter();
        let primary = appended
            .next()
            .ok_or_else(|| LedgerError::Internal("store returned an empty batch".to_string()))?;
        let receipt = PostingReceipt {
            primary,
            derived: appended.collect(),
        };
        for entry in receipt.entries() {
            Self::audit(uow, ENTRY_RECORD, entry.id, AuditAction::Create, entry, now).await?;
        }

        let notice = self
            .notifier
            .as_ref()
            .and_then(|_| notice_for(&receipt.primary, &debit_holder, &credit_holder, &self.currency_label));
        Ok((receipt, notice))
    }

    /// Validates and commits a stock posting.
    pub async fn post_stock(&self, request: &StockRequest) -> Result<StockEntry, LedgerError> {
        let mut attempt = 1;
        loop {
            match self.try_post_stock(request).await {
                Err(err) if self.should_retry("post_stock", &err, attempt) => attempt += 1,
                outcome => return Self::finish("post_stock", &request.reference, outcome),
            }
        }
    }

    async fn try_post_stock(&self, request: &StockRequest) -> Result<StockEntry, LedgerError> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;
        let batch = StockService::prepare(&uow, request, now).await?;
        let entry = uow.append_stock(batch.entry).await?;
        Self::audit(&mut uow, STOCK_RECORD, entry.id, AuditAction::Create, &entry, now).await?;
        uow.commit().await?;
        Ok(entry)
    }

    // ========== Balances ==========

    /// Derived monetary balance of a holder.
    pub async fn balance(&self, holder: HolderId, as_of: AsOf) -> Result<Decimal, LedgerError> {
        Ok(self.account_balance(holder, as_of).await?.balance)
    }

    /// Derived monetary balance with debit and credit totals.
    pub async fn account_balance(&self, holder: HolderId, as_of: AsOf) -> Result<AccountBalance, LedgerError> {
        let entries = self.entries_for(holder).await?;
        Ok(derive_balance(holder, &entries, as_of))
    }

    /// Derived on-hand quantity of an item.
    pub async fn on_hand(&self, holder: HolderId, as_of: AsOf) -> Result<i64, LedgerError> {
        let uow = self.store.begin().await?;
        Self::require_holder(&uow, holder).await?;
        let entries = uow.stock_for_holder(holder).await?;
        uow.rollback().await?;
        let derived: HolderBalance<i64> = derive_balance(holder, &entries, as_of);
        Ok(derived.balance)
    }

    /// Balances of a holder grouped by posting dimension.
    pub async fn wallets(&self, holder: HolderId, as_of: AsOf) -> Result<Vec<WalletBalance>, LedgerError> {
        let entries = self.entries_for(holder).await?;
        Ok(wallets(holder, &entries, as_of))
    }

    /// A holder's postings with running balances.
    pub async fn statement(
        &self,
        holder: HolderId,
    ) -> Result<Vec<StatementLine<LedgerEntry, Decimal>>, LedgerError> {
        let entries = self.entries_for(holder).await?;
        Ok(statement(holder, &entries))
    }

    /// Opening balance, activity and closing balance of a holder for one month.
    pub async fn period_summary(
        &self,
        holder: HolderId,
        period: AccountingPeriod,
    ) -> Result<PeriodSummary, LedgerError> {
        let entries = self.entries_for(holder).await?;
        Ok(period_summary(holder, &entries, period))
    }

    async fn entries_for(&self, holder: HolderId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let uow = self.store.begin().await?;
        Self::require_holder(&uow, holder).await?;
        let entries = uow.entries_for_holder(holder).await?;
        uow.rollback().await?;
        Ok(entries)
    }

    async fn require_holder(reader: &S::Uow, holder: HolderId) -> Result<BalanceHolder, LedgerError> {
        reader
            .holder(holder)
            .await?
            .ok_or_else(|| LedgerError::HolderNotFound(holder.to_string()))
    }

    // ========== Tariffs ==========

    /// Registers a tariff. A blank scope registers it for every entity.
    pub async fn create_tariff(&self, tariff: NewTariff) -> Result<Tariff, LedgerError> {
        let code = tariff.code.clone();
        let mut attempt = 1;
        loop {
            match self.try_create_tariff(&tariff).await {
                Err(err) if self.should_retry("create_tariff", &err, attempt) => attempt += 1,
                outcome => return Self::finish("create_tariff", &code, outcome),
            }
        }
    }

    async fn try_create_tariff(&self, new: &NewTariff) -> Result<Tariff, LedgerError> {
        let now = Utc::now();
        let movement_type = MovementType::parse(&new.movement_type)
            .ok_or_else(|| LedgerError::UnknownMovementType(new.movement_type.clone()))?;
        let scope = match new.scope.trim() {
            "" => self.config.wildcard_scope.clone(),
            scope => scope.to_string(),
        };

        let mut uow = self.store.begin().await?;
        if uow
            .find_tariff(movement_type, &new.payment_method, &scope)
            .await?
            .is_some()
        {
            return Err(LedgerError::DuplicateTariff(format!(
                "{movement_type}/{}/{scope}",
                new.payment_method
            )));
        }
        let tariff = Tariff {
            id: TariffId::new(),
            code: new.code.clone(),
            movement_type,
            payment_method: new.payment_method.clone(),
            scope,
            created_at: now,
        };
        uow.insert_tariff(&tariff).await?;
        Self::audit(&mut uow, TARIFF_RECORD, tariff.id, AuditAction::Create, &tariff, now).await?;
        uow.commit().await?;
        Ok(tariff)
    }

    /// Adds a charge tier to a tariff.
    pub async fn add_charge(&self, tariff: TariffId, charge: NewCharge) -> Result<Charge, LedgerError> {
        let subject = tariff.to_string();
        let mut attempt = 1;
        loop {
            match self.try_add_charge(tariff, &charge).await {
                Err(err) if self.should_retry("add_charge", &err, attempt) => attempt += 1,
                outcome => return Self::finish("add_charge", &subject, outcome),
            }
        }
    }

    async fn try_add_charge(&self, tariff: TariffId, new: &NewCharge) -> Result<Charge, LedgerError> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;
        let schedule = uow
            .tariff(tariff)
            .await?
            .ok_or_else(|| LedgerError::TariffNotFound(tariff.to_string()))?;
        TariffEngine::validate_charge(&schedule.charges, new)?;

        let charge = Charge {
            id: ChargeId::new(),
            tariff_id: tariff,
            min_value: new.min_value,
            max_value: new.max_value,
            charge_type: new.charge_type,
            amount: new.amount,
        };
        uow.insert_charge(&charge).await?;
        Self::audit(&mut uow, CHARGE_RECORD, charge.id, AuditAction::Create, &charge, now).await?;
        uow.commit().await?;
        Ok(charge)
    }

    /// Appends a fee split to a tariff.
    pub async fn add_split(&self, tariff: TariffId, split: NewSplit) -> Result<ChargeSplit, LedgerError> {
        let subject = tariff.to_string();
        let mut attempt = 1;
        loop {
            match self.try_add_split(tariff, &split).await {
                Err(err) if self.should_retry("add_split", &err, attempt) => attempt += 1,
                outcome => return Self::finish("add_split", &subject, outcome),
            }
        }
    }

    async fn try_add_split(&self, tariff: TariffId, new: &NewSplit) -> Result<ChargeSplit, LedgerError> {
        let now = Utc::now();
        TariffEngine::validate_percentage(new.percentage)?;
        let mut uow = self.store.begin().await?;
        let schedule = uow
            .tariff(tariff)
            .await?
            .ok_or_else(|| LedgerError::TariffNotFound(tariff.to_string()))?;
        let destination = uow
            .holder_by_owner(&new.destination_owner)
            .await?
            .ok_or_else(|| LedgerError::HolderNotFound(new.destination_owner.clone()))?;
        if destination.is_item() {
            return Err(LedgerError::InvalidHolder(destination.owner_reference));
        }

        let position = i32::try_from(schedule.splits.len() + 1)
            .map_err(|_| LedgerError::Internal("too many splits on one tariff".to_string()))?;
        let split = ChargeSplit {
            id: ChargeSplitId::new(),
            tariff_id: tariff,
            position,
            percentage: new.percentage,
            destination: destination.id,
        };
        uow.insert_split(&split).await?;
        Self::audit(&mut uow, SPLIT_RECORD, split.id, AuditAction::Create, &split, now).await?;
        uow.commit().await?;
        Ok(split)
    }

    // ========== Credit ==========

    /// Raises an obligation and posts its opening movement.
    ///
    /// On credit, the value is carried by the credit control holder under
    /// `<reference>-credit`; otherwise it is paid upfront from the settlement
    /// holder.
    pub async fn open_obligation(&self, obligation: NewObligation) -> Result<CreditObligation, LedgerError> {
        let reference = obligation.reference.clone();
        let mut attempt = 1;
        let outcome = loop {
            match self.try_open_obligation(&obligation).await {
                Err(err) if self.should_retry("open_obligation", &err, attempt) => attempt += 1,
                outcome => break outcome,
            }
        };
        let (obligation, notice) = Self::finish("open_obligation", &reference, outcome)?;
        self.dispatch(notice).await;
        Ok(obligation)
    }

    async fn try_open_obligation(
        &self,
        new: &NewObligation,
    ) -> Result<(CreditObligation, Option<Notification>), LedgerError> {
        let now = Utc::now();
        let reference = new.reference.trim();
        if reference.is_empty() {
            return Err(LedgerError::EmptyReference);
        }
        if new.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(new.amount));
        }
        let credit = CreditState::for_payment_method(&new.payment_method);
        let settlement_owner = match (&new.settlement_owner, credit.on_credit) {
            (Some(owner), _) => owner.clone(),
            (None, false) => new.payment_method.clone(),
            (None, true) => return Err(LedgerError::SettlementHolderMissing(reference.to_string())),
        };

        let mut uow = self.store.begin().await?;
        if uow.obligation_by_reference(reference).await?.is_some() {
            return Err(LedgerError::DuplicateObligation(reference.to_string()));
        }
        let obligation = CreditObligation {
            id: ObligationId::new(),
            reference: reference.to_string(),
            kind: new.kind,
            amount: new.amount,
            payment_method: new.payment_method.clone(),
            settlement_owner,
            counterparty_owner: new.counterparty_owner.clone(),
            scope: new.scope.clone(),
            credit,
            created_at: now,
        };

        let opening = CreditTracker::opening_posting(&obligation, &self.config.credit_owner);
        let batch = LedgerService::prepare(&uow, &opening, &self.config, now).await?;
        let (_, notice) = self.write_batch(&mut uow, batch, now).await?;
        uow.save_obligation(&obligation).await?;
        Self::audit(
            &mut uow,
            OBLIGATION_RECORD,
            obligation.id,
            AuditAction::Create,
            &obligation,
            now,
        )
        .await?;
        uow.commit().await?;
        Ok((obligation, notice))
    }

    /// Settlement position of an obligation.
    pub async fn outstanding(&self, obligation: ObligationId) -> Result<Outstanding, LedgerError> {
        let uow = self.store.begin().await?;
        let obligation = Self::require_obligation(&uow, obligation).await?;
        let entries = uow.entries_by_correlation(&obligation.reference).await?;
        uow.rollback().await?;
        Ok(CreditTracker::outstanding(&obligation, &entries))
    }

    /// Pays `amount_to_pay` towards an obligation on credit.
    ///
    /// The settlement posting and the status change commit together.
    pub async fn settle(
        &self,
        obligation: ObligationId,
        amount_to_pay: Decimal,
    ) -> Result<Settlement, LedgerError> {
        let subject = obligation.to_string();
        let mut attempt = 1;
        let outcome = loop {
            match self.try_settle(obligation, amount_to_pay).await {
                Err(err) if self.should_retry("settle", &err, attempt) => attempt += 1,
                outcome => break outcome,
            }
        };
        let (settlement, notice) = Self::finish("settle", &subject, outcome)?;
        info!(
            reference = %settlement.obligation.reference,
            status = %settlement.obligation.credit.status,
            balance = %settlement.balance,
            "Obligation settled"
        );
        self.dispatch(notice).await;
        Ok(settlement)
    }

    async fn try_settle(
        &self,
        obligation: ObligationId,
        amount_to_pay: Decimal,
    ) -> Result<(Settlement, Option<Notification>), LedgerError> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;
        let mut obligation = Self::require_obligation(&uow, obligation).await?;
        let entries = uow.entries_by_correlation(&obligation.reference).await?;
        let outstanding = CreditTracker::outstanding(&obligation, &entries);
        let plan = CreditTracker::plan_settlement(&obligation, &outstanding, amount_to_pay, &self.config.credit_owner)?;

        let batch = LedgerService::prepare(&uow, &plan.request, &self.config, now).await?;
        let (receipt, notice) = self.write_batch(&mut uow, batch, now).await?;

        obligation.credit.status = obligation.credit.status.advance(plan.status);
        uow.save_obligation(&obligation).await?;
        Self::audit(
            &mut uow,
            OBLIGATION_RECORD,
            obligation.id,
            AuditAction::Update,
            &obligation,
            now,
        )
        .await?;
        uow.commit().await?;

        Ok((
            Settlement {
                receipt,
                obligation,
                balance: plan.new_balance,
            },
            notice,
        ))
    }

    async fn require_obligation(reader: &S::Uow, id: ObligationId) -> Result<CreditObligation, LedgerError> {
        reader
            .obligation(id)
            .await?
            .ok_or_else(|| LedgerError::ObligationNotFound(id.to_string()))
    }

    // ========== Jobs ==========

    /// Posts the labour for a completed job.
    ///
    /// Returns `None` when no time elapsed and nothing was posted.
    pub async fn complete_job(&self, job: &JobCompletion) -> Result<Option<JobLineItem>, LedgerError> {
        let mut attempt = 1;
        loop {
            match self.try_complete_job(job).await {
                Err(err) if self.should_retry("complete_job", &err, attempt) => attempt += 1,
                outcome => return Self::finish("complete_job", &job.job_reference, outcome),
            }
        }
    }

    async fn try_complete_job(&self, job: &JobCompletion) -> Result<Option<JobLineItem>, LedgerError> {
        let now = Utc::now();
        let Some(quantity) = job.labour_quantity()? else {
            return Ok(None);
        };

        let mut uow = self.store.begin().await?;
        if !uow.job_lines(job.job_id).await?.is_empty() {
            return Err(LedgerError::JobAlreadyCompleted(job.job_reference.clone()));
        }
        let request = job.labour_request(&self.config.labour_owner, quantity);
        let batch = StockService::prepare(&uow, &request, now).await?;
        let item_holder = batch.debit_holder.id;
        let entry = uow.append_stock(batch.entry).await?;
        Self::audit(&mut uow, STOCK_RECORD, entry.id, AuditAction::Create, &entry, now).await?;

        let line = JobLineItem {
            id: JobLineId::new(),
            job_id: job.job_id,
            item_holder,
            quantity,
            stock_entry: entry.id,
            created_at: now,
        };
        uow.insert_job_line(&line).await?;
        Self::audit(&mut uow, JOB_LINE_RECORD, line.id, AuditAction::Create, &line, now).await?;
        uow.commit().await?;
        Ok(Some(line))
    }

    // ========== Deferred transactions ==========

    /// Parks a posting request for later replay.
    pub async fn enqueue(&self, request: PostingRequest) -> Result<PendingTransaction, LedgerError> {
        let pending = PendingTransaction::new(request, Utc::now());
        let mut uow = self.store.begin().await?;
        uow.save_pending(&pending).await?;
        uow.commit().await?;
        debug!(reference = %pending.request.reference, id = %pending.id, "Posting queued");
        Ok(pending)
    }

    /// Replays up to `limit` queued requests through [`Ledger::post`]'s path.
    ///
    /// A request that posts is marked processed in the same unit of work as
    /// its postings. A rejected request is marked failed with the error
    /// message. Store failures leave the request queued for the next pass.
    pub async fn replay_pending(&self, limit: u64) -> Result<ReplaySummary, LedgerError> {
        let uow = self.store.begin().await?;
        let queued = uow.pending(limit).await?;
        uow.rollback().await?;

        let mut summary = ReplaySummary::default();
        for pending in queued {
            let mut attempt = 1;
            let outcome = loop {
                match self.try_replay(pending.clone()).await {
                    Err(err) if self.should_retry("replay", &err, attempt) => attempt += 1,
                    outcome => break outcome,
                }
            };
            match outcome {
                Ok(notice) => {
                    summary.processed += 1;
                    info!(reference = %pending.request.reference, id = %pending.id, "Queued posting replayed");
                    self.dispatch(notice).await;
                }
                Err(err @ (LedgerError::Persistence(_) | LedgerError::ConcurrentModification)) => {
                    warn!(
                        reference = %pending.request.reference,
                        error = %err,
                        "Queued posting left for the next pass"
                    );
                }
                Err(err) => {
                    warn!(
                        reference = %pending.request.reference,
                        error_code = err.error_code(),
                        error = %err,
                        "Queued posting rejected"
                    );
                    self.mark_failed(pending, &err).await?;
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    async fn try_replay(&self, mut pending: PendingTransaction) -> Result<Option<Notification>, LedgerError> {
        let now = Utc::now();
        let mut uow = self.store.begin().await?;
        let batch = LedgerService::prepare(&uow, &pending.request, &self.config, now).await?;
        let (_, notice) = self.write_batch(&mut uow, batch, now).await?;
        pending.mark_processed(now);
        uow.save_pending(&pending).await?;
        uow.commit().await?;
        Ok(notice)
    }

    async fn mark_failed(&self, mut pending: PendingTransaction, err: &LedgerError) -> Result<(), LedgerError> {
        pending.mark_failed(err.to_string(), Utc::now());
        let mut uow = self.store.begin().await?;
        uow.save_pending(&pending).await?;
        uow.commit().await
    }

    // ========== Audit ==========

    /// Audit trail of one record, oldest first.
    pub async fn audit_trail(&self, record_id: &str) -> Result<Vec<AuditRecord>, LedgerError> {
        let uow = self.store.begin().await?;
        let trail = uow.audit_trail(record_id).await?;
        uow.rollback().await?;
        Ok(trail)
    }

    async fn audit<T: Serialize>(
        uow: &mut S::Uow,
        record_type: &str,
        record_id: impl ToString,
        action: AuditAction,
        record: &T,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let record = AuditRecord::capture(record_type, record_id, action, record, now)?;
        uow.record_audit(&record).await
    }

    // ========== Notifications ==========

    /// Waits for every notice handed out so far to be delivered or to fail.
    pub async fn flush_notifications(&self) {
        let mut in_flight = self.in_flight.lock().await;
        while in_flight.join_next().await.is_some() {}
    }

    async fn dispatch(&self, notice: Option<Notification>) {
        let (Some(notifier), Some(notice)) = (self.notifier.clone(), notice) else {
            return;
        };
        let mut in_flight = self.in_flight.lock().await;
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn(async move {
            if let Err(err) = notifier.notify(&notice).await {
                warn!(to = %notice.to, error = %err, "Notification delivery failed");
            }
        });
    }

    // ========== Outcome handling ==========

    fn should_retry(&self, operation: &'static str, err: &LedgerError, attempt: u32) -> bool {
        let retry = err.is_retryable() && attempt < self.config.max_commit_attempts;
        if retry {
            debug!(operation, attempt, error_code = err.error_code(), "Retrying after commit conflict");
        }
        retry
    }

    fn finish<T>(operation: &'static str, subject: &str, outcome: Result<T, LedgerError>) -> Result<T, LedgerError> {
        match &outcome {
            Ok(_) => info!(operation, subject, "Ledger operation committed"),
            Err(err) => warn!(
                operation,
                subject,
                error_code = err.error_code(),
                error = %err,
                "Ledger operation rejected"
            ),
        }
        outcome
    }
}
