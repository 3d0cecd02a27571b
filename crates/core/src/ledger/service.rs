//! Ledger service for posting validation and resolution.
//!
//! [`LedgerService::prepare`] turns a [`PostingRequest`] into a validated
//! [`PostingBatch`]. It only reads; the caller appends the batch in the same
//! unit of work the reads were made in.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use autoledger_shared::config::LedgerConfig;
use autoledger_shared::types::{HolderId, LedgerEntryId};

use super::entry::LedgerEntry;
use super::error::LedgerError;
use super::holder::BalanceHolder;
use super::period::AccountingPeriod;
use super::reversal::ReversalService;
use super::types::{BatchTotals, MovementType, PostingBatch, PostingRequest};
use crate::store::LedgerReader;
use crate::tariff::TariffEngine;

/// Ledger service for posting validation.
///
/// Stateless; every input it needs is read through the given reader.
pub struct LedgerService;

impl LedgerService {
    /// Validate a posting request and resolve it into a batch.
    ///
    /// Checks run in this order and stop at the first failure:
    /// 1. Reference present, movement type known
    /// 2. `reversal_of` consistent with the movement type
    /// 3. Amount positive and both holders resolve (non-reversals)
    /// 4. Reference not already posted
    /// 5. Reversals: original not already reversed, original exists
    /// 6. Reversals: holders, amount and scope copied swapped from the original
    /// 7. Tariff fee legs fanned out (non-reversals)
    /// 8. Batch balances
    /// 9. Every debited holder stays at or above its minimum balance
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if validation fails.
    pub async fn prepare<R>(
        reader: &R,
        request: &PostingRequest,
        config: &LedgerConfig,
        now: DateTime<Utc>,
    ) -> Result<PostingBatch, LedgerError>
    where
        R: LedgerReader + ?Sized,
    {
        let reference = request.reference.trim();
        if reference.is_empty() {
            return Err(LedgerError::EmptyReference);
        }
        let movement = MovementType::parse(&request.movement_type)
            .ok_or_else(|| LedgerError::UnknownMovementType(request.movement_type.clone()))?;

        match (movement.is_reversal(), request.reversal_of.as_deref()) {
            (true, None) => return Err(LedgerError::ReversalTargetMissing),
            (false, Some(target)) => {
                return Err(LedgerError::UnexpectedReversalTarget(target.to_string()));
            }
            _ => {}
        }

        let resolved = if movement.is_reversal() {
            None
        } else {
            if request.amount <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount(request.amount));
            }
            let debit = Self::resolve_holder(reader, &request.debit_owner).await?;
            let credit = Self::resolve_holder(reader, &request.credit_owner).await?;
            if debit.id == credit.id {
                return Err(LedgerError::SameHolder(debit.owner_reference));
            }
            Some((debit, credit))
        };

        if reader.entry_by_reference(reference).await?.is_some() {
            return Err(LedgerError::DuplicateReference(reference.to_string()));
        }

        let (primary, debit_holder, credit_holder) = match (resolved, request.reversal_of.as_deref()) {
            (Some((debit, credit)), _) => {
                let primary = Self::primary_entry(reference, request, movement, &debit, &credit, now);
                (primary, debit, credit)
            }
            (None, Some(original_ref)) => {
                if reader.reversal_for(original_ref).await?.is_some() {
                    return Err(LedgerError::AlreadyReversed(original_ref.to_string()));
                }
                let original = reader
                    .entry_by_reference(original_ref)
                    .await?
                    .ok_or_else(|| LedgerError::OriginalNotFound(original_ref.to_string()))?;
                let mirror = ReversalService::mirror_entry(&original, reference, now);
                let debit = Self::holder_by_id(reader, mirror.debit_holder).await?;
                let credit = Self::holder_by_id(reader, mirror.credit_holder).await?;
                (mirror, debit, credit)
            }
            (None, None) => return Err(LedgerError::ReversalTargetMissing),
        };

        let mut entries = vec![primary];
        if !movement.is_reversal() {
            entries.extend(Self::fee_entries(reader, &entries[0], config).await?);
        }

        Self::check_minimum_balances(reader, &entries).await?;

        Ok(PostingBatch {
            totals: Self::calculate_totals(&entries),
            entries,
            debit_holder,
            credit_holder,
        })
    }

    /// Calculate batch totals from the net effect on each holder.
    ///
    /// `debit` is what leaves holders that end up lower, `credit` what reaches
    /// holders that end up higher. Movements that net out within one holder
    /// count on neither side.
    #[must_use]
    pub fn calculate_totals(entries: &[LedgerEntry]) -> BatchTotals {
        let effects = Self::net_effects(entries);
        let debit: Decimal = effects.values().filter(|v| v.is_sign_negative()).map(|v| -*v).sum();
        let credit: Decimal = effects.values().filter(|v| v.is_sign_positive()).copied().sum();
        BatchTotals::new(debit, credit)
    }

    /// Net effect of a batch on each holder it touches.
    #[must_use]
    pub fn net_effects(entries: &[LedgerEntry]) -> BTreeMap<HolderId, Decimal> {
        let mut effects: BTreeMap<HolderId, Decimal> = BTreeMap::new();
        for entry in entries {
            *effects.entry(entry.debit_holder).or_default() -= entry.amount;
            *effects.entry(entry.credit_holder).or_default() += entry.amount;
        }
        effects
    }

    async fn resolve_holder<R>(reader: &R, owner: &str) -> Result<BalanceHolder, LedgerError>
    where
        R: LedgerReader + ?Sized,
    {
        let holder = reader
            .holder_by_owner(owner)
            .await?
            .ok_or_else(|| LedgerError::HolderNotFound(owner.to_string()))?;
        if holder.is_item() {
            return Err(LedgerError::InvalidHolder(holder.owner_reference));
        }
        Ok(holder)
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

    fn primary_entry(
        reference: &str,
        request: &PostingRequest,
        movement: MovementType,
        debit: &BalanceHolder,
        credit: &BalanceHolder,
        now: DateTime<Utc>,
    ) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            sequence: 0,
            reference: reference.to_string(),
            label: None,
            amount: request.amount,
            debit_holder: debit.id,
            credit_holder: credit.id,
            movement_type: movement,
            payment_method: request.payment_method.clone(),
            scope: request.scope.clone(),
            reversal_of: None,
            correlation: request.correlation.clone(),
            dimension: request.dimension.clone(),
            description: request.description.clone(),
            phone: request.phone.clone(),
            posted_at: now,
            accounting_period: AccountingPeriod::containing(now),
        }
    }

    async fn fee_entries<R>(
        reader: &R,
        primary: &LedgerEntry,
        config: &LedgerConfig,
    ) -> Result<Vec<LedgerEntry>, LedgerError>
    where
        R: LedgerReader + ?Sized,
    {
        let Some(schedule) = reader
            .find_tariff(
                primary.movement_type,
                &primary.payment_method,
                &config.wildcard_scope,
            )
            .await?
        else {
            return Ok(Vec::new());
        };

        Ok(TariffEngine::fee_legs(&schedule, primary.amount)
            .into_iter()
            .map(|leg| LedgerEntry {
                id: LedgerEntryId::new(),
                sequence: 0,
                reference: primary.reference.clone(),
                label: Some(leg.label),
                amount: leg.amount,
                debit_holder: primary.debit_holder,
                credit_holder: leg.destination,
                movement_type: MovementType::Charge,
                payment_method: primary.payment_method.clone(),
                scope: primary.scope.clone(),
                reversal_of: None,
                correlation: None,
                dimension: primary.dimension.clone(),
                description: Some(schedule.tariff.code.clone()),
                phone: None,
                posted_at: primary.posted_at,
                accounting_period: primary.accounting_period,
            })
            .collect())
    }

    async fn check_minimum_balances<R>(reader: &R, entries: &[LedgerEntry]) -> Result<(), LedgerError>
    where
        R: LedgerReader + ?Sized,
    {
        let effects = Self::net_effects(entries);
        let mut debited: Vec<HolderId> = entries.iter().map(|e| e.debit_holder).collect();
        debited.sort();
        debited.dedup();

        for holder_id in debited {
            let holder = Self::holder_by_id(reader, holder_id).await?;
            let Some(minimum) = holder.minimum_balance else {
                continue;
            };
            let current = reader.balance(holder_id).await?;
            let balance_after = current + effects.get(&holder_id).copied().unwrap_or_default();
            if !holder.allows_balance(balance_after) {
                return Err(LedgerError::InsufficientFunds {
                    holder: holder.owner_reference,
                    balance_after,
                    minimum,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::holder::{HolderKind, NewHolder};
    use crate::store::{LedgerStore, MemoryLedgerStore, UnitOfWork};
    use crate::tariff::{Charge, ChargeSplit, ChargeType, Tariff};
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use autoledger_shared::types::{ChargeId, ChargeSplitId, TariffId};

    async fn seeded() -> MemoryLedgerStore {
        let store = MemoryLedgerStore::new();
        let mut uow = store.begin().await.unwrap();
        for holder in [
            NewHolder::new("escrow", "Escrow", HolderKind::Commission),
            NewHolder::new("cust-1", "Jane", HolderKind::Customer),
            NewHolder::new("cash", "Cash", HolderKind::Commission).with_minimum_balance(dec!(0)),
            NewHolder::new("fees-a", "Fees A", HolderKind::Commission),
            NewHolder::new("fees-b", "Fees B", HolderKind::Commission),
            NewHolder::new("oil", "Oil", HolderKind::Item),
        ] {
            uow.insert_holder(&holder.into_holder(Utc::now()).unwrap())
                .await
                .unwrap();
        }
        uow.commit().await.unwrap();
        store
    }

    async fn add_momo_tariff(store: &MemoryLedgerStore) {
        let mut uow = store.begin().await.unwrap();
        let fees_a = uow.holder_by_owner("fees-a").await.unwrap().unwrap();
        let fees_b = uow.holder_by_owner("fees-b").await.unwrap().unwrap();
        let tariff = Tariff {
            id: TariffId::new(),
            code: "MOMO-IN".to_string(),
            movement_type: MovementType::Payment,
            payment_method: "momo".to_string(),
            scope: "ALL".to_string(),
            created_at: Utc::now(),
        };
        uow.insert_tariff(&tariff).await.unwrap();
        uow.insert_charge(&Charge {
            id: ChargeId::new(),
            tariff_id: tariff.id,
            min_value: dec!(0),
            max_value: dec!(1000000),
            charge_type: ChargeType::Flat,
            amount: dec!(500),
        })
        .await
        .unwrap();
        for (position, destination) in [(1, fees_a.id), (2, fees_b.id)] {
            uow.insert_split(&ChargeSplit {
                id: ChargeSplitId::new(),
                tariff_id: tariff.id,
                position,
                percentage: dec!(50),
                destination,
            })
            .await
            .unwrap();
        }
        uow.commit().await.unwrap();
    }

    fn payment(reference: &str, amount: Decimal, method: &str) -> PostingRequest {
        PostingRequest::new(reference, amount, "payment", method, "escrow", "cust-1").with_scope("garage-1")
    }

    #[tokio::test]
    async fn test_prepare_simple_payment() {
        let store = seeded().await;
        let uow = store.begin().await.unwrap();

        let batch = LedgerService::prepare(&uow, &payment("P-1", dec!(20000), "cash"), &LedgerConfig::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.primary().reference, "P-1");
        assert_eq!(batch.debit_holder.owner_reference, "escrow");
        assert_eq!(batch.credit_holder.owner_reference, "cust-1");
        assert!(batch.totals.is_balanced);
    }

    #[tokio::test]
    async fn test_prepare_fans_out_fee_legs() {
        let store = seeded().await;
        add_momo_tariff(&store).await;
        let uow = store.begin().await.unwrap();

        let batch = LedgerService::prepare(&uow, &payment("P-1", dec!(20000), "momo"), &LedgerConfig::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(batch.entries.len(), 3);
        let legs: Vec<_> = batch.entries.iter().skip(1).collect();
        assert_eq!(legs[0].label.as_deref(), Some("charge-1"));
        assert_eq!(legs[1].label.as_deref(), Some("charge-2"));
        assert!(legs.iter().all(|l| l.amount == dec!(250)));
        assert!(legs.iter().all(|l| l.reference == "P-1"));
        assert!(legs.iter().all(|l| l.debit_holder == batch.debit_holder.id));
        assert!(legs.iter().all(|l| l.movement_type == MovementType::Charge));
        assert_eq!(batch.totals.debit, dec!(20500));
        assert_eq!(batch.totals.credit, dec!(20500));
        assert!(batch.totals.is_balanced);
    }

    #[test]
    fn test_totals_net_out_round_trips() {
        use crate::ledger::entry::fixtures::entry;

        let (a, b, c) = (HolderId::new(), HolderId::new(), HolderId::new());
        let there = entry(1, "T-1", dec!(300), a, b);
        let back = entry(2, "T-2", dec!(300), b, a);
        let totals = LedgerService::calculate_totals(&[there.clone(), back]);
        assert_eq!(totals.debit, Decimal::ZERO);
        assert_eq!(totals.credit, Decimal::ZERO);

        let onward = entry(3, "T-3", dec!(100), b, c);
        let totals = LedgerService::calculate_totals(&[there, onward]);
        assert_eq!(totals.debit, dec!(300));
        assert_eq!(totals.credit, dec!(300));
        assert!(totals.is_balanced);
    }

    #[tokio::test]
    async fn test_scoped_tariff_is_not_consulted() {
        let store = seeded().await;
        let mut uow = store.begin().await.unwrap();
        let tariff = Tariff {
            id: TariffId::new(),
            code: "GARAGE-ONLY".to_string(),
            movement_type: MovementType::Payment,
            payment_method: "momo".to_string(),
            scope: "garage-1".to_string(),
            created_at: Utc::now(),
        };
        uow.insert_tariff(&tariff).await.unwrap();

        let batch = LedgerService::prepare(&uow, &payment("P-1", dec!(20000), "momo"), &LedgerConfig::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(batch.entries.len(), 1);
    }

    #[rstest]
    #[case(PostingRequest::new("", dec!(1), "payment", "cash", "escrow", "cust-1"), "EMPTY_REFERENCE")]
    #[case(PostingRequest::new("R", dec!(1), "refund", "cash", "escrow", "cust-1"), "UNKNOWN_MOVEMENT_TYPE")]
    #[case(PostingRequest::new("R", dec!(0), "payment", "cash", "escrow", "cust-1"), "INVALID_AMOUNT")]
    #[case(PostingRequest::new("R", dec!(-5), "payment", "cash", "escrow", "cust-1"), "INVALID_AMOUNT")]
    #[case(PostingRequest::new("R", dec!(1), "payment", "cash", "nobody", "cust-1"), "HOLDER_NOT_FOUND")]
    #[case(PostingRequest::new("R", dec!(1), "payment", "cash", "escrow", "nobody"), "HOLDER_NOT_FOUND")]
    #[case(PostingRequest::new("R", dec!(1), "payment", "cash", "escrow", "escrow"), "SAME_HOLDER")]
    #[case(PostingRequest::new("R", dec!(1), "payment", "cash", "escrow", "oil"), "INVALID_HOLDER")]
    #[case(PostingRequest::new("R", dec!(1), "reversal", "cash", "escrow", "cust-1"), "REVERSAL_TARGET_MISSING")]
    #[case(PostingRequest::reversal("R", "missing"), "ORIGINAL_NOT_FOUND")]
    #[tokio::test]
    async fn test_prepare_rejects(#[case] request: PostingRequest, #[case] code: &str) {
        let store = seeded().await;
        let uow = store.begin().await.unwrap();

        let err = LedgerService::prepare(&uow, &request, &LedgerConfig::default(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), code);
    }

    #[tokio::test]
    async fn test_prepare_rejects_reversal_target_on_regular_movement() {
        let store = seeded().await;
        let uow = store.begin().await.unwrap();
        let mut request = payment("P-2", dec!(10), "cash");
        request.reversal_of = Some("P-1".to_string());

        let err = LedgerService::prepare(&uow, &request, &LedgerConfig::default(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnexpectedReversalTarget(_)));
    }

    #[tokio::test]
    async fn test_prepare_duplicate_and_reversal_rules() {
        let store = seeded().await;
        let config = LedgerConfig::default();
        let mut uow = store.begin().await.unwrap();
        let batch = LedgerService::prepare(&uow, &payment("P-1", dec!(100), "cash"), &config, Utc::now())
            .await
            .unwrap();
        uow.append_entries(batch.entries).await.unwrap();

        let dup = LedgerService::prepare(&uow, &payment("P-1", dec!(100), "cash"), &config, Utc::now()).await;
        assert!(matches!(dup, Err(LedgerError::DuplicateReference(_))));

        let reversal = LedgerService::prepare(&uow, &PostingRequest::reversal("REV-1", "P-1"), &config, Utc::now())
            .await
            .unwrap();
        assert_eq!(reversal.primary().amount, dec!(100));
        assert_eq!(reversal.debit_holder.owner_reference, "cust-1");
        assert_eq!(reversal.credit_holder.owner_reference, "escrow");
        assert_eq!(reversal.primary().scope, "garage-1");
        uow.append_entries(reversal.entries).await.unwrap();

        let again = LedgerService::prepare(&uow, &PostingRequest::reversal("REV-2", "P-1"), &config, Utc::now()).await;
        assert!(matches!(again, Err(LedgerError::AlreadyReversed(_))));
    }

    #[tokio::test]
    async fn test_prepare_enforces_minimum_balance() {
        let store = seeded().await;
        let config = LedgerConfig::default();
        let mut uow = store.begin().await.unwrap();

        let overdraw = PostingRequest::new("X-1", dec!(1), "expense", "cash", "cash", "escrow");
        let err = LedgerService::prepare(&uow, &overdraw, &config, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                holder: "cash".to_string(),
                balance_after: dec!(-1),
                minimum: dec!(0),
            }
        );

        let fund = PostingRequest::new("F-1", dec!(50), "transfer", "cash", "escrow", "cash");
        let batch = LedgerService::prepare(&uow, &fund, &config, Utc::now()).await.unwrap();
        uow.append_entries(batch.entries).await.unwrap();

        let exact = PostingRequest::new("X-2", dec!(50), "expense", "cash", "cash", "escrow");
        assert!(LedgerService::prepare(&uow, &exact, &config, Utc::now()).await.is_ok());
    }

    #[test]
    fn test_net_effects_sum_to_zero() {
        let a = HolderId::new();
        let b = HolderId::new();
        let c = HolderId::new();
        let entries = vec![
            crate::ledger::entry::fixtures::entry(1, "R", dec!(100), a, b),
            crate::ledger::entry::fixtures::entry(2, "R", dec!(5), a, c),
        ];
        let effects = LedgerService::net_effects(&entries);
        assert_eq!(effects[&a], dec!(-105));
        assert_eq!(effects[&b], dec!(100));
        assert_eq!(effects.values().copied().sum::<Decimal>(), Decimal::ZERO);
    }
}
