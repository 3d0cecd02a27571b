//! Integration tests for the `PostgreSQL` ledger store.
//!
//! Each test runs against `DATABASE_URL` when it is set, otherwise against a
//! throwaway Postgres container. When neither is reachable the test is skipped.
//! Owner references carry a per-test tag so runs can share one database.

#![allow(clippy::uninlined_format_args)]

use std::env;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::Barrier;
use uuid::Uuid;

use autoledger_core::credit::{CreditStatus, NewObligation, ObligationKind};
use autoledger_core::inventory::JobCompletion;
use autoledger_core::ledger::{AsOf, HolderKind, NewHolder, PendingStatus, PostingRequest};
use autoledger_core::store::{LedgerReader, LedgerStore, UnitOfWork};
use autoledger_core::tariff::{ChargeType, NewCharge, NewSplit, NewTariff};
use autoledger_core::{Ledger, LedgerError};
use autoledger_db::migration::Migrator;
use autoledger_db::PgLedgerStore;
use autoledger_shared::config::LedgerConfig;
use autoledger_shared::types::JobId;

struct TestDb {
    db: DatabaseConnection,
    _container: Option<ContainerAsync<Postgres>>,
}

async fn test_db() -> Option<TestDb> {
    let (url, container) = match env::var("DATABASE_URL") {
        Ok(url) => (url, None),
        Err(_) => {
            let container = match Postgres::default().start().await {
                Ok(container) => container,
                Err(e) => {
                    eprintln!("Skipping test - database not available: {}", e);
                    return None;
                }
            };
            let host = container.get_host().await.ok()?;
            let port = container.get_host_port_ipv4(5432).await.ok()?;
            (format!("postgres://postgres:postgres@{host}:{port}/postgres"), Some(container))
        }
    };

    let db = match Database::connect(&url).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Skipping test - database not available: {}", e);
            return None;
        }
    };
    if let Err(e) = Migrator::up(&db, None).await {
        eprintln!("Skipping test - migration failed: {}", e);
        return None;
    }
    Some(TestDb {
        db,
        _container: container,
    })
}

fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Owner references for one test run.
struct Owners {
    tag: String,
}

impl Owners {
    fn new() -> Self {
        Self { tag: tag() }
    }

    fn of(&self, name: &str) -> String {
        format!("{name}-{}", self.tag)
    }

    fn config(&self) -> LedgerConfig {
        LedgerConfig {
            labour_owner: self.of("labour"),
            credit_owner: self.of("credit"),
            max_commit_attempts: 25,
            ..LedgerConfig::default()
        }
    }
}

async fn seeded_ledger(db: &DatabaseConnection, owners: &Owners) -> Ledger<PgLedgerStore> {
    let ledger = Ledger::new(PgLedgerStore::new(db.clone()), owners.config());
    for holder in [
        NewHolder::new(owners.of("escrow"), "Escrow", HolderKind::Entity),
        NewHolder::new(owners.of("cust"), "Jane", HolderKind::Customer),
        NewHolder::new(owners.of("cash"), "Cash", HolderKind::Entity).with_minimum_balance(dec!(0)),
        NewHolder::new(owners.of("fees-a"), "Agent commission", HolderKind::Commission),
        NewHolder::new(owners.of("fees-b"), "Platform commission", HolderKind::Commission),
        NewHolder::new(owners.of("credit"), "Credit control", HolderKind::Entity),
        NewHolder::new(owners.of("vendor"), "Parts Ltd", HolderKind::Vendor),
        NewHolder::new(owners.of("garage"), "Garage", HolderKind::Entity),
        NewHolder::new(owners.of("labour"), "Labour", HolderKind::Item).service(),
    ] {
        ledger.open_holder(holder).await.unwrap();
    }
    ledger
}

async fn balance_of(ledger: &Ledger<PgLedgerStore>, owner: &str) -> Decimal {
    let holder = ledger.holder(owner).await.unwrap();
    ledger.balance(holder.id, AsOf::Latest).await.unwrap()
}

#[tokio::test]
async fn test_fee_fan_out_is_persisted_in_sequence() {
    let Some(test) = test_db().await else { return };
    let owners = Owners::new();
    let ledger = seeded_ledger(&test.db, &owners).await;
    let method = owners.of("momo");

    let tariff = ledger
        .create_tariff(NewTariff {
            code: owners.of("MOMO"),
            movement_type: "payment".to_string(),
            payment_method: method.clone(),
            scope: String::new(),
        })
        .await
        .unwrap();
    ledger
        .add_charge(
            tariff.id,
            NewCharge {
                min_value: dec!(0),
                max_value: dec!(1000000),
                charge_type: ChargeType::Flat,
                amount: dec!(500),
            },
        )
        .await
        .unwrap();
    for destination in ["fees-a", "fees-b"] {
        ledger
            .add_split(
                tariff.id,
                NewSplit {
                    percentage: dec!(50),
                    destination_owner: owners.of(destination),
                },
            )
            .await
            .unwrap();
    }

    let reference = owners.of("PAY");
    let receipt = ledger
        .post(&PostingRequest::new(
            reference.clone(),
            dec!(20000),
            "payment",
            method,
            owners.of("escrow"),
            owners.of("cust"),
        ))
        .await
        .unwrap();

    assert_eq!(receipt.len(), 3);
    let sequences: Vec<i64> = receipt.entries().map(|e| e.sequence).collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]), "sequences {:?}", sequences);

    assert_eq!(balance_of(&ledger, &owners.of("escrow")).await, dec!(-20500));
    assert_eq!(balance_of(&ledger, &owners.of("cust")).await, dec!(20000));
    assert_eq!(balance_of(&ledger, &owners.of("fees-a")).await, dec!(250));
    assert_eq!(balance_of(&ledger, &owners.of("fees-b")).await, dec!(250));

    let trail = ledger.audit_trail(&receipt.primary.id.to_string()).await.unwrap();
    assert_eq!(trail.len(), 1);
}

#[tokio::test]
async fn test_duplicate_and_double_reversal_are_rejected() {
    let Some(test) = test_db().await else { return };
    let owners = Owners::new();
    let ledger = seeded_ledger(&test.db, &owners).await;
    let reference = owners.of("BILL");
    let request = PostingRequest::new(
        reference.clone(),
        dec!(75000),
        "bill",
        "cash",
        owners.of("cust"),
        owners.of("garage"),
    );

    ledger.post(&request).await.unwrap();
    let err = ledger.post(&request).await.unwrap_err();
    assert_eq!(err, LedgerError::DuplicateReference(reference.clone()));

    ledger
        .post(&PostingRequest::reversal(owners.of("REV-1"), reference.clone()))
        .await
        .unwrap();
    let err = ledger
        .post(&PostingRequest::reversal(owners.of("REV-2"), reference.clone()))
        .await
        .unwrap_err();
    assert_eq!(err, LedgerError::AlreadyReversed(reference));

    assert_eq!(balance_of(&ledger, &owners.of("cust")).await, dec!(0));
    assert_eq!(balance_of(&ledger, &owners.of("garage")).await, dec!(0));
}

#[tokio::test]
async fn test_dropped_unit_of_work_leaves_no_trace() {
    let Some(test) = test_db().await else { return };
    let owners = Owners::new();
    let store = PgLedgerStore::new(test.db.clone());
    let holder = NewHolder::new(owners.of("ghost"), "Ghost", HolderKind::Entity)
        .into_holder(Utc::now())
        .unwrap();

    {
        let mut uow = store.begin().await.unwrap();
        uow.insert_holder(&holder).await.unwrap();
        assert!(uow.holder_by_owner(&owners.of("ghost")).await.unwrap().is_some());
    }

    let uow = store.begin().await.unwrap();
    assert!(uow.holder_by_owner(&owners.of("ghost")).await.unwrap().is_none());
    uow.rollback().await.unwrap();
}

#[tokio::test]
async fn test_settlement_lifecycle_round_trips() {
    let Some(test) = test_db().await else { return };
    let owners = Owners::new();
    let ledger = seeded_ledger(&test.db, &owners).await;
    ledger
        .post(&PostingRequest::new(
            owners.of("FUND"),
            dec!(500000),
            "transfer",
            "bank",
            owners.of("escrow"),
            owners.of("cash"),
        ))
        .await
        .unwrap();

    let obligation = ledger
        .open_obligation(NewObligation {
            reference: owners.of("EXP"),
            kind: ObligationKind::Expense,
            amount: dec!(100000),
            payment_method: "credit".to_string(),
            settlement_owner: Some(owners.of("cash")),
            counterparty_owner: owners.of("vendor"),
            scope: owners.of("garage"),
        })
        .await
        .unwrap();
    assert_eq!(obligation.credit.status, CreditStatus::Pending);

    let first = ledger.settle(obligation.id, dec!(40000)).await.unwrap();
    assert_eq!(first.balance, dec!(60000));
    assert_eq!(first.obligation.credit.status, CreditStatus::Partial);

    let err = ledger.settle(obligation.id, dec!(60001)).await.unwrap_err();
    assert!(matches!(err, LedgerError::Overpayment { .. }));

    let last = ledger.settle(obligation.id, dec!(60000)).await.unwrap();
    assert_eq!(last.balance, dec!(0));
    assert_eq!(last.obligation.credit.status, CreditStatus::Paid);

    let outstanding = ledger.outstanding(obligation.id).await.unwrap();
    assert_eq!(outstanding.payment_count, 2);
    assert_eq!(outstanding.paid, dec!(100000));

    let trail = ledger.audit_trail(&obligation.id.to_string()).await.unwrap();
    assert_eq!(trail.len(), 3);
}

#[tokio::test]
async fn test_job_labour_posts_once() {
    let Some(test) = test_db().await else { return };
    let owners = Owners::new();
    let ledger = seeded_ledger(&test.db, &owners).await;
    let completed_at = Utc::now();
    let job = JobCompletion {
        job_id: JobId::new(),
        job_reference: owners.of("JOB"),
        entity_owner: owners.of("garage"),
        scope: owners.of("garage"),
        created_at: completed_at - Duration::minutes(150),
        completed_at,
    };

    let line = ledger.complete_job(&job).await.unwrap().unwrap();
    assert_eq!(line.quantity, 2);

    let err = ledger.complete_job(&job).await.unwrap_err();
    assert!(matches!(err, LedgerError::JobAlreadyCompleted(_)));
}

#[tokio::test]
async fn test_replayed_transaction_leaves_queue() {
    let Some(test) = test_db().await else { return };
    let owners = Owners::new();
    let ledger = seeded_ledger(&test.db, &owners).await;
    let queued = ledger
        .enqueue(PostingRequest::new(
            owners.of("DEFER"),
            dec!(1000),
            "bill",
            "cash",
            owners.of("cust"),
            owners.of("garage"),
        ))
        .await
        .unwrap();
    assert_eq!(queued.status, PendingStatus::Pending);

    let summary = ledger.replay_pending(10_000).await.unwrap();
    assert!(summary.processed >= 1);

    let uow = ledger.store().begin().await.unwrap();
    let still_pending = uow.pending(10_000).await.unwrap();
    assert!(still_pending.iter().all(|p| p.id != queued.id));
    uow.rollback().await.unwrap();
    assert_eq!(balance_of(&ledger, &owners.of("garage")).await, dec!(1000));
}

#[tokio::test]
async fn test_concurrent_debits_never_breach_minimum() {
    const DEBITS: usize = 10;
    let Some(test) = test_db().await else { return };
    let owners = Owners::new();
    let ledger = Arc::new(seeded_ledger(&test.db, &owners).await);
    ledger
        .post(&PostingRequest::new(
            owners.of("FUND"),
            dec!(5000),
            "transfer",
            "bank",
            owners.of("escrow"),
            owners.of("cash"),
        ))
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(DEBITS));
    let mut handles = Vec::with_capacity(DEBITS);
    for i in 0..DEBITS {
        let ledger = Arc::clone(&ledger);
        let barrier = Arc::clone(&barrier);
        let request = PostingRequest::new(
            owners.of(&format!("DEBIT-{i}")),
            dec!(1000),
            "expense",
            "cash",
            owners.of("cash"),
            owners.of("vendor"),
        );
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            ledger.post(&request).await
        }));
    }

    let results = join_all(handles).await;
    let mut succeeded = 0_i64;
    for result in results {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LedgerError::InsufficientFunds { .. } | LedgerError::ConcurrentModification) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert!(succeeded <= 5, "{} debits of 1000 against 5000", succeeded);
    let cash = balance_of(&ledger, &owners.of("cash")).await;
    assert!(cash >= Decimal::ZERO);
    assert_eq!(cash, dec!(5000) - Decimal::from(succeeded) * dec!(1000));
}
