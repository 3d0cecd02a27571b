//! Stock posting validation.
//!
//! The same rules as monetary postings apply, on quantities: unique reference,
//! at-most-once reversal, and a floor of zero on non-service items. Stock
//! movements carry no fees.

use chrono::{DateTime, Utc};
use autoledger_shared::types::{HolderId, StockEntryId};

use super::types::{StockBatch, StockCategory, StockEntry, StockRequest};
use crate::ledger::error::LedgerError;
use crate::ledger::holder::BalanceHolder;
use crate::ledger::period::AccountingPeriod;
use crate::ledger::reversal::ReversalService;
use crate::store::LedgerReader;

/// Stateless stock posting service.
pub struct StockService;

impl StockService {
    /// Validate a stock request and resolve it into an entry.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if validation fails; nothing is written.
    pub async fn prepare<R>(
        reader: &R,
        request: &StockRequest,
        now: DateTime<Utc>,
    ) -> Result<StockBatch, LedgerError>
    where
        R: LedgerReader + ?Sized,
    {
        let reference = request.reference.trim();
        if reference.is_empty() {
            return Err(LedgerError::EmptyReference);
        }
        let category = StockCategory::parse(&request.category)
            .ok_or_else(|| LedgerError::UnknownMovementType(request.category.clone()))?;

        let entry = match (category, request.reversal_of.as_deref()) {
            (StockCategory::Reversal, None) => return Err(LedgerError::ReversalTargetMissing),
            (StockCategory::Reversal, Some(original_ref)) => {
                if reader.stock_by_reference(reference).await?.is_some() {
                    return Err(LedgerError::DuplicateReference(reference.to_string()));
                }
                if reader.stock_reversal_for(original_ref).await?.is_some() {
                    return Err(LedgerError::AlreadyReversed(original_ref.to_string()));
                }
                let original = reader
                    .stock_by_reference(original_ref)
                    .await?
                    .ok_or_else(|| LedgerError::OriginalNotFound(original_ref.to_string()))?;
                ReversalService::mirror_stock(&original, reference, now)
            }
            (_, Some(target)) => {
                return Err(LedgerError::UnexpectedReversalTarget(target.to_string()));
            }
            (_, None) => {
                if request.quantity <= 0 {
                    return Err(LedgerError::InvalidQuantity(request.quantity));
                }
                let debit = Self::resolve_holder(reader, &request.debit_owner).await?;
                let credit = Self::resolve_holder(reader, &request.credit_owner).await?;
                if debit.id == credit.id {
                    return Err(LedgerError::SameHolder(debit.owner_reference));
                }
                if reader.stock_by_reference(reference).await?.is_some() {
                    return Err(LedgerError::DuplicateReference(reference.to_string()));
                }
                StockEntry {
                    id: StockEntryId::new(),
                    sequence: 0,
                    reference: reference.to_string(),
                    quantity: request.quantity,
                    debit_holder: debit.id,
                    credit_holder: credit.id,
                    category,
                    scope: request.scope.clone(),
                    reversal_of: None,
                    job_id: request.job_id,
                    description: request.description.clone(),
                    posted_at: now,
                    accounting_period: AccountingPeriod::containing(now),
                }
            }
        };

        let debit_holder = Self::holder_by_id(reader, entry.debit_holder).await?;
        let credit_holder = Self::holder_by_id(reader, entry.credit_holder).await?;

        if debit_holder.enforces_stock_floor() {
            let on_hand = reader.on_hand(debit_holder.id).await?;
            if on_hand - entry.quantity < 0 {
                return Err(LedgerError::InsufficientQuantity {
                    holder: debit_holder.owner_reference,
                    on_hand,
                    requested: entry.quantity,
                });
            }
        }

        Ok(StockBatch {
            entry,
            debit_holder,
            credit_holder,
        })
    }

    async fn resolve_holder<R>(reader: &R, owner: &str) -> Result<BalanceHolder, LedgerError>
    where
        R: LedgerReader + ?Sized,
    {
        reader
            .holder_by_owner(owner)
            .await?
            .ok_or_else(|| LedgerError::HolderNotFound(owner.to_string()))
    }

    async fn holder_by_id<R>(reader: &R, id: HolderId) -> Result<BalanceHolder, LedgerError>
    where
        R: LedgerReader + ?Sized,
    {
        reader
            .holder(id)
            .await?
            .ok_or_else(|| LedgerError::HolderNotFound(id.to_string()))
    }
}
