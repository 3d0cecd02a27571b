//! Row to domain conversions.
//!
//! Enum columns are stored as their `as_str` form; a value that no longer
//! parses surfaces as a persistence error rather than a panic.

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use autoledger_core::audit::{AuditAction, AuditRecord};
use autoledger_core::credit::{CreditObligation, CreditState, CreditStatus, ObligationKind};
use autoledger_core::inventory::{JobLineItem, StockCategory, StockEntry};
use autoledger_core::ledger::{
    AccountingPeriod, BalanceHolder, HolderKind, LedgerEntry, MovementType, PendingStatus,
    PendingTransaction,
};
use autoledger_core::tariff::{Charge, ChargeSplit, ChargeType, Tariff};
use autoledger_core::LedgerError;
use autoledger_shared::types::{
    AuditRecordId, ChargeId, ChargeSplitId, HolderId, JobId, JobLineId, LedgerEntryId, ObligationId,
    PendingTransactionId, StockEntryId, TariffId,
};

use crate::entities::{
    audit_log, balance_holders, charge_splits, charges, credit_obligations, job_line_items,
    ledger_entries, pending_transactions, stock_entries, tariffs,
};

fn unreadable(column: &str, value: &str) -> LedgerError {
    LedgerError::Persistence(format!("unreadable {column}: {value}"))
}

fn period(value: &str) -> Result<AccountingPeriod, LedgerError> {
    value
        .parse()
        .map_err(|_| unreadable("accounting_period", value))
}

// ========== Holders ==========

pub(crate) fn holder_from_row(row: balance_holders::Model) -> Result<BalanceHolder, LedgerError> {
    let kind = HolderKind::parse(&row.kind).ok_or_else(|| unreadable("balance_holders.kind", &row.kind))?;
    Ok(BalanceHolder {
        id: HolderId::from_uuid(row.id),
        owner_reference: row.owner_reference,
        name: row.name,
        kind,
        scope_group: row.scope_group,
        minimum_balance: row.minimum_balance,
        is_service: row.is_service,
        created_at: row.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn holder_to_row(holder: &BalanceHolder) -> balance_holders::ActiveModel {
    balance_holders::ActiveModel {
        id: Set(holder.id.into_inner()),
        owner_reference: Set(holder.owner_reference.clone()),
        name: Set(holder.name.clone()),
        kind: Set(holder.kind.as_str().to_string()),
        scope_group: Set(holder.scope_group.clone()),
        minimum_balance: Set(holder.minimum_balance),
        is_service: Set(holder.is_service),
        created_at: Set(holder.created_at.into()),
    }
}

// ========== Postings ==========

pub(crate) fn entry_from_row(row: ledger_entries::Model) -> Result<LedgerEntry, LedgerError> {
    let movement_type = MovementType::parse(&row.movement_type)
        .ok_or_else(|| unreadable("ledger_entries.movement_type", &row.movement_type))?;
    let accounting_period = period(&row.accounting_period)?;
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(row.id),
        sequence: row.sequence,
        reference: row.reference,
        label: row.label,
        amount: row.amount,
        debit_holder: HolderId::from_uuid(row.debit_holder_id),
        credit_holder: HolderId::from_uuid(row.credit_holder_id),
        movement_type,
        payment_method: row.payment_method,
        scope: row.scope,
        reversal_of: row.reversal_of,
        correlation: row.correlation,
        dimension: row.dimension,
        description: row.description,
        phone: row.phone,
        posted_at: row.posted_at.with_timezone(&Utc),
        accounting_period,
    })
}

/// The sequence is left to the database.
pub(crate) fn entry_to_row(entry: &LedgerEntry) -> ledger_entries::ActiveModel {
    ledger_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        sequence: NotSet,
        reference: Set(entry.reference.clone()),
        label: Set(entry.label.clone()),
        amount: Set(entry.amount),
        debit_holder_id: Set(entry.debit_holder.into_inner()),
        credit_holder_id: Set(entry.credit_holder.into_inner()),
        movement_type: Set(entry.movement_type.as_str().to_string()),
        payment_method: Set(entry.payment_method.clone()),
        scope: Set(entry.scope.clone()),
        reversal_of: Set(entry.reversal_of.clone()),
        correlation: Set(entry.correlation.clone()),
        dimension: Set(entry.dimension.clone()),
        description: Set(entry.description.clone()),
        phone: Set(entry.phone.clone()),
        posted_at: Set(entry.posted_at.into()),
        accounting_period: Set(entry.accounting_period.to_string()),
    }
}

pub(crate) fn stock_from_row(row: stock_entries::Model) -> Result<StockEntry, LedgerError> {
    let category = StockCategory::parse(&row.category)
        .ok_or_else(|| unreadable("stock_entries.category", &row.category))?;
    let accounting_period = period(&row.accounting_period)?;
    Ok(StockEntry {
        id: StockEntryId::from_uuid(row.id),
        sequence: row.sequence,
        reference: row.reference,
        quantity: row.quantity,
        debit_holder: HolderId::from_uuid(row.debit_holder_id),
        credit_holder: HolderId::from_uuid(row.credit_holder_id),
        category,
        scope: row.scope,
        reversal_of: row.reversal_of,
        job_id: row.job_id.map(JobId::from_uuid),
        description: row.description,
        posted_at: row.posted_at.with_timezone(&Utc),
        accounting_period,
    })
}

pub(crate) fn stock_to_row(entry: &StockEntry) -> stock_entries::ActiveModel {
    stock_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        sequence: NotSet,
        reference: Set(entry.reference.clone()),
        quantity: Set(entry.quantity),
        debit_holder_id: Set(entry.debit_holder.into_inner()),
        credit_holder_id: Set(entry.credit_holder.into_inner()),
        category: Set(entry.category.as_str().to_string()),
        scope: Set(entry.scope.clone()),
        reversal_of: Set(entry.reversal_of.clone()),
        job_id: Set(entry.job_id.map(JobId::into_inner)),
        description: Set(entry.description.clone()),
        posted_at: Set(entry.posted_at.into()),
        accounting_period: Set(entry.accounting_period.to_string()),
    }
}

// ========== Tariffs ==========

pub(crate) fn tariff_from_row(row: tariffs::Model) -> Result<Tariff, LedgerError> {
    let movement_type = MovementType::parse(&row.movement_type)
        .ok_or_else(|| unreadable("tariffs.movement_type", &row.movement_type))?;
    Ok(Tariff {
        id: TariffId::from_uuid(row.id),
        code: row.code,
        movement_type,
        payment_method: row.payment_method,
        scope: row.scope,
        created_at: row.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn tariff_to_row(tariff: &Tariff) -> tariffs::ActiveModel {
    tariffs::ActiveModel {
        id: Set(tariff.id.into_inner()),
        code: Set(tariff.code.clone()),
        movement_type: Set(tariff.movement_type.as_str().to_string()),
        payment_method: Set(tariff.payment_method.clone()),
        scope: Set(tariff.scope.clone()),
        created_at: Set(tariff.created_at.into()),
    }
}

pub(crate) fn charge_from_row(row: charges::Model) -> Result<Charge, LedgerError> {
    let charge_type = ChargeType::parse(&row.charge_type)
        .ok_or_else(|| unreadable("charges.charge_type", &row.charge_type))?;
    Ok(Charge {
        id: ChargeId::from_uuid(row.id),
        tariff_id: TariffId::from_uuid(row.tariff_id),
        min_value: row.min_value,
        max_value: row.max_value,
        charge_type,
        amount: row.amount,
    })
}

pub(crate) fn charge_to_row(charge: &Charge) -> charges::ActiveModel {
    charges::ActiveModel {
        id: Set(charge.id.into_inner()),
        tariff_id: Set(charge.tariff_id.into_inner()),
        min_value: Set(charge.min_value),
        max_value: Set(charge.max_value),
        charge_type: Set(charge.charge_type.as_str().to_string()),
        amount: Set(charge.amount),
    }
}

pub(crate) fn split_from_row(row: charge_splits::Model) -> ChargeSplit {
    ChargeSplit {
        id: ChargeSplitId::from_uuid(row.id),
        tariff_id: TariffId::from_uuid(row.tariff_id),
        position: row.position,
        percentage: row.percentage,
        destination: HolderId::from_uuid(row.destination_holder_id),
    }
}

pub(crate) fn split_to_row(split: &ChargeSplit) -> charge_splits::ActiveModel {
    charge_splits::ActiveModel {
        id: Set(split.id.into_inner()),
        tariff_id: Set(split.tariff_id.into_inner()),
        position: Set(split.position),
        percentage: Set(split.percentage),
        destination_holder_id: Set(split.destination.into_inner()),
    }
}

// ========== Credit ==========

pub(crate) fn obligation_from_row(row: credit_obligations::Model) -> Result<CreditObligation, LedgerError> {
    let kind = ObligationKind::parse(&row.kind).ok_or_else(|| unreadable("credit_obligations.kind", &row.kind))?;
    let status = CreditStatus::parse(&row.credit_status)
        .ok_or_else(|| unreadable("credit_obligations.credit_status", &row.credit_status))?;
    Ok(CreditObligation {
        id: ObligationId::from_uuid(row.id),
        reference: row.reference,
        kind,
        amount: row.amount,
        payment_method: row.payment_method,
        settlement_owner: row.settlement_owner,
        counterparty_owner: row.counterparty_owner,
        scope: row.scope,
        credit: CreditState {
            on_credit: row.on_credit,
            status,
        },
        created_at: row.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn obligation_to_row(obligation: &CreditObligation) -> credit_obligations::ActiveModel {
    credit_obligations::ActiveModel {
        id: Set(obligation.id.into_inner()),
        reference: Set(obligation.reference.clone()),
        kind: Set(obligation.kind.as_str().to_string()),
        amount: Set(obligation.amount),
        payment_method: Set(obligation.payment_method.clone()),
        settlement_owner: Set(obligation.settlement_owner.clone()),
        counterparty_owner: Set(obligation.counterparty_owner.clone()),
        scope: Set(obligation.scope.clone()),
        on_credit: Set(obligation.credit.on_credit),
        credit_status: Set(obligation.credit.status.as_str().to_string()),
        created_at: Set(obligation.created_at.into()),
        updated_at: Set(Utc::now().into()),
    }
}

// ========== Jobs ==========

pub(crate) fn job_line_from_row(row: job_line_items::Model) -> JobLineItem {
    JobLineItem {
        id: JobLineId::from_uuid(row.id),
        job_id: JobId::from_uuid(row.job_id),
        item_holder: HolderId::from_uuid(row.item_holder_id),
        quantity: row.quantity,
        stock_entry: StockEntryId::from_uuid(row.stock_entry_id),
        created_at: row.created_at.with_timezone(&Utc),
    }
}

pub(crate) fn job_line_to_row(line: &JobLineItem) -> job_line_items::ActiveModel {
    job_line_items::ActiveModel {
        id: Set(line.id.into_inner()),
        job_id: Set(line.job_id.into_inner()),
        item_holder_id: Set(line.item_holder.into_inner()),
        quantity: Set(line.quantity),
        stock_entry_id: Set(line.stock_entry.into_inner()),
        created_at: Set(line.created_at.into()),
    }
}

// ========== Queue ==========

pub(crate) fn pending_from_row(row: pending_transactions::Model) -> Result<PendingTransaction, LedgerError> {
    let status = PendingStatus::parse(&row.status)
        .ok_or_else(|| unreadable("pending_transactions.status", &row.status))?;
    let request = serde_json::from_value(row.request)
        .map_err(|e| LedgerError::Persistence(format!("unreadable pending_transactions.request: {e}")))?;
    Ok(PendingTransaction {
        id: PendingTransactionId::from_uuid(row.id),
        request,
        status,
        reason: row.reason,
        created_at: row.created_at.with_timezone(&Utc),
        processed_at: row.processed_at.map(|at| at.with_timezone(&Utc)),
    })
}

pub(crate) fn pending_to_row(pending: &PendingTransaction) -> Result<pending_transactions::ActiveModel, LedgerError> {
    let request = serde_json::to_value(&pending.request)
        .map_err(|e| LedgerError::Internal(format!("queued request is not serializable: {e}")))?;
    Ok(pending_transactions::ActiveModel {
        id: Set(pending.id.into_inner()),
        request: Set(request),
        status: Set(pending.status.as_str().to_string()),
        reason: Set(pending.reason.clone()),
        created_at: Set(pending.created_at.into()),
        processed_at: Set(pending.processed_at.map(Into::into)),
    })
}

// ========== Audit ==========

pub(crate) fn audit_from_row(row: audit_log::Model) -> Result<AuditRecord, LedgerError> {
    let action = AuditAction::parse(&row.action).ok_or_else(|| unreadable("audit_log.action", &row.action))?;
    Ok(AuditRecord {
        id: AuditRecordId::from_uuid(row.id),
        record_type: row.record_type,
        record_id: row.record_id,
        action,
        snapshot: row.snapshot,
        recorded_at: row.recorded_at.with_timezone(&Utc),
    })
}

pub(crate) fn audit_to_row(record: &AuditRecord) -> audit_log::ActiveModel {
    audit_log::ActiveModel {
        id: Set(record.id.into_inner()),
        record_type: Set(record.record_type.clone()),
        record_id: Set(record.record_id.clone()),
        action: Set(record.action.as_str().to_string()),
        snapshot: Set(record.snapshot.clone()),
        recorded_at: Set(record.recorded_at.into()),
    }
}
