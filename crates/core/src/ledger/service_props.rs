//! Property-based tests for posting and balance derivation.
//!
//! - Conservation: every batch nets to zero across the holders it touches
//! - Commutativity: a balance does not depend on posting order
//! - Fee fan-out never allocates more than the fee

use proptest::prelude::*;
use rust_decimal::Decimal;
use autoledger_shared::types::HolderId;

use super::balance::{AsOf, derive_balance, statement};
use super::entry::LedgerEntry;
use super::entry::fixtures::entry;
use super::service::LedgerService;
use crate::tariff::{Charge, ChargeSplit, ChargeType, Tariff, TariffEngine, TariffSchedule};

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate postings between a small pool of holders.
fn postings(holders: usize, max_len: usize) -> impl Strategy<Value = Vec<(usize, usize, Decimal)>> {
    prop::collection::vec(
        (0..holders, 0..holders, positive_amount()).prop_filter("distinct holders", |(d, c, _)| d != c),
        1..=max_len,
    )
}

fn build(pool: &[HolderId], raw: &[(usize, usize, Decimal)]) -> Vec<LedgerEntry> {
    raw.iter()
        .enumerate()
        .map(|(i, (d, c, amount))| {
            let seq = i64::try_from(i + 1).unwrap();
            entry(seq, &format!("R-{seq}"), *amount, pool[*d], pool[*c])
        })
        .collect()
}

fn schedule_with_splits(fee: Decimal, percentages: &[Decimal]) -> TariffSchedule {
    let tariff = Tariff {
        id: autoledger_shared::types::TariffId::new(),
        code: "PROP".to_string(),
        movement_type: super::types::MovementType::Payment,
        payment_method: "momo".to_string(),
        scope: "ALL".to_string(),
        created_at: chrono::Utc::now(),
    };
    TariffSchedule {
        charges: vec![Charge {
            id: autoledger_shared::types::ChargeId::new(),
            tariff_id: tariff.id,
            min_value: Decimal::ZERO,
            max_value: Decimal::MAX,
            charge_type: ChargeType::Flat,
            amount: fee,
        }],
        splits: percentages
            .iter()
            .enumerate()
            .map(|(i, pct)| ChargeSplit {
                id: autoledger_shared::types::ChargeSplitId::new(),
                tariff_id: tariff.id,
                position: i32::try_from(i + 1).unwrap(),
                percentage: *pct,
                destination: HolderId::new(),
            })
            .collect(),
        tariff,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The sum of every holder's derived balance is always zero.
    #[test]
    fn prop_balances_conserve_value(raw in postings(5, 30)) {
        let pool: Vec<HolderId> = (0..5).map(|_| HolderId::new()).collect();
        let entries = build(&pool, &raw);

        let total: Decimal = pool
            .iter()
            .map(|h| derive_balance(*h, &entries, AsOf::Latest).balance)
            .sum();
        prop_assert_eq!(total, Decimal::ZERO);

        let effects = LedgerService::net_effects(&entries);
        prop_assert_eq!(effects.values().copied().sum::<Decimal>(), Decimal::ZERO);

        let totals = LedgerService::calculate_totals(&entries);
        prop_assert!(totals.is_balanced);
    }

    /// A holder's balance is the signed sum of its postings in any order.
    #[test]
    fn prop_balance_is_order_independent(raw in postings(4, 20), seed in any::<u64>()) {
        let pool: Vec<HolderId> = (0..4).map(|_| HolderId::new()).collect();
        let entries = build(&pool, &raw);

        let mut shuffled = entries.clone();
        let len = shuffled.len();
        // Deterministic Fisher-Yates driven by the generated seed.
        let mut state = seed;
        for i in (1..len).rev() {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let j = usize::try_from(state % (u64::try_from(i).unwrap() + 1)).unwrap();
            shuffled.swap(i, j);
        }

        for holder in &pool {
            prop_assert_eq!(
                derive_balance(*holder, &entries, AsOf::Latest).balance,
                derive_balance(*holder, &shuffled, AsOf::Latest).balance
            );
        }
    }

    /// The last statement line carries the derived balance.
    #[test]
    fn prop_statement_ends_at_balance(raw in postings(3, 20)) {
        let pool: Vec<HolderId> = (0..3).map(|_| HolderId::new()).collect();
        let entries = build(&pool, &raw);

        for holder in &pool {
            let lines = statement(*holder, &entries);
            let expected = derive_balance(*holder, &entries, AsOf::Latest);
            prop_assert_eq!(lines.len(), expected.entry_count);
            if let Some(last) = lines.last() {
                prop_assert_eq!(last.running.current_balance, expected.balance);
            }
        }
    }

    /// Point-in-time balances by sequence agree with a prefix of history.
    #[test]
    fn prop_as_of_sequence_is_prefix(raw in postings(3, 20), cut in 0usize..20) {
        let pool: Vec<HolderId> = (0..3).map(|_| HolderId::new()).collect();
        let entries = build(&pool, &raw);
        let cut = cut.min(entries.len());

        for holder in &pool {
            let as_of = derive_balance(*holder, &entries, AsOf::Sequence(i64::try_from(cut).unwrap()));
            let prefix = derive_balance(*holder, &entries[..cut], AsOf::Latest);
            prop_assert_eq!(as_of.balance, prefix.balance);
        }
    }

    /// Split legs never allocate more than the fee.
    #[test]
    fn prop_fan_out_bounded_by_fee(
        fee in positive_amount(),
        percentages in prop::collection::vec((1i64..=100i64).prop_map(Decimal::from), 1..4),
    ) {
        let total_pct: Decimal = percentages.iter().copied().sum();
        prop_assume!(total_pct <= Decimal::ONE_HUNDRED);

        let schedule = schedule_with_splits(fee, &percentages);
        let legs = TariffEngine::fee_legs(&schedule, Decimal::ONE);
        let allocated: Decimal = legs.iter().map(|l| l.amount).sum();

        // Rounding each leg to cents can add at most half a cent per leg.
        let tolerance = Decimal::new(5, 3) * Decimal::from(percentages.len());
        prop_assert!(allocated <= fee + tolerance);
        prop_assert!(legs.iter().all(|l| l.amount > Decimal::ZERO && l.amount <= fee));
    }
}
