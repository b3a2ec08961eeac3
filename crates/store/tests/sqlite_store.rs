//! SQLite store integration tests

use chrono::Utc;
use cleancredit_core::{Account, AccountId, Points, ScoringPolicy, StoreConfig, WasteCategory};
use cleancredit_ledger::{reconcile, Direction, LedgerError, PendingViolation};
use cleancredit_store::{export_audit, file_digest, LedgerStore, SqliteStore, StoreError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tempfile::TempDir;

async fn open(dir: &TempDir, config: &StoreConfig) -> SqliteStore {
    let store = SqliteStore::open(dir.path().join("cleancredit.db"), config)
        .await
        .unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let pool = Account::provision_pool("TAG", 10, Points::new(1000), &mut rng).unwrap();
    store.provision(pool).await.unwrap();
    store
}

fn id(raw: &str) -> AccountId {
    AccountId::new(raw).unwrap()
}

fn pending(reporter: &str, reported: &str, category: Option<&str>) -> PendingViolation {
    PendingViolation {
        reporter_id: id(reporter),
        reported_id: id(reported),
        reported_label: String::new(),
        raw_scanned_value: reported.to_string(),
        description: Some("by the fountain".to_string()),
        waste_category: WasteCategory::parse(category),
        proposed_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &StoreConfig::default()).await;

    store.claim(&id("TAG_001"), "Asha").await.unwrap();
    store.claim(&id("TAG_002"), "Rahul").await.unwrap();

    let result = store
        .settle(&pending("TAG_001", "TAG_002", Some("Plastic")), &ScoringPolicy::new(20, 10, 50))
        .await
        .unwrap();

    let asha = store.account(&id("TAG_001")).await.unwrap();
    let rahul = store.account(&id("TAG_002")).await.unwrap();
    assert_eq!(asha.balance, Points::new(1030));
    assert_eq!(asha.report_count, 1);
    assert_eq!(rahul.balance, Points::new(950));
    assert_eq!(rahul.violation_notes.len(), 1);
    assert!(rahul.violation_notes[0].starts_with("Plastic left at "));
    assert!(rahul.violation_notes[0].ends_with(" UTC: by the fountain"));

    let events = store.scan_events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], result.scan_event);

    let entries = store.ledger_entries().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].direction, Direction::Credit);
    assert_eq!(entries[0].account_id, id("TAG_001"));
    assert_eq!(entries[0].counterparty_id, id("TAG_002"));
    assert_eq!(entries[0].amount, Points::new(30));
    assert_eq!(entries[1].direction, Direction::Debit);
    assert_eq!(entries[1].account_id, id("TAG_002"));
    assert_eq!(entries[1].counterparty_id, id("TAG_001"));
    assert_eq!(entries[1].amount, Points::new(50));
    assert_eq!(entries[0].transaction_id, entries[1].transaction_id);
    assert_eq!(entries[0].timestamp, entries[1].timestamp);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir, &StoreConfig::default()).await;
        store.claim(&id("TAG_003"), "Mei").await.unwrap();
        store
            .settle(&pending("TAG_003", "TAG_004", None), &ScoringPolicy::default())
            .await
            .unwrap();
        store.close().await;
    }

    let store = SqliteStore::open(dir.path().join("cleancredit.db"), &StoreConfig::default())
        .await
        .unwrap();
    let mei = store.account(&id("TAG_003")).await.unwrap();
    assert_eq!(mei.display_name, "Mei");
    assert_eq!(mei.balance, Points::new(1020));
    assert_eq!(store.ledger_entries().await.unwrap().len(), 2);

    let err = store.provision(Vec::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyProvisioned(10)));
}

#[tokio::test]
async fn test_claim_is_idempotent_and_moves_no_points() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &StoreConfig::default()).await;

    store.claim(&id("TAG_005"), "Asha").await.unwrap();
    let renamed = store.claim(&id("TAG_005"), "Asha K").await.unwrap();

    assert_eq!(renamed.display_name, "Asha K");
    assert_eq!(renamed.balance, Points::new(1000));
    assert_eq!(store.accounts().await.unwrap().len(), 10);
    assert!(store.ledger_entries().await.unwrap().is_empty());

    let missing = store.claim(&id("TAG_404"), "Nobody").await.unwrap_err();
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn test_missing_account_aborts_without_writes() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &StoreConfig::default()).await;

    let err = store
        .settle(&pending("TAG_001", "TAG_404", None), &ScoringPolicy::default())
        .await
        .unwrap_err();
    assert!(err.is_account_missing());
    assert!(!err.is_retryable());

    let reporter = store.account(&id("TAG_001")).await.unwrap();
    assert_eq!(reporter.balance, Points::new(1000));
    assert_eq!(reporter.report_count, 0);
    assert!(store.scan_events().await.unwrap().is_empty());
    assert!(store.ledger_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_insert_rolls_back_balances() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &StoreConfig::default()).await;

    // Force the debit insert to fail after the balances were written
    sqlx::query(
        r#"
        CREATE TRIGGER reject_debits BEFORE INSERT ON ledger_entries
        WHEN NEW.direction = 'debit'
        BEGIN SELECT RAISE(ABORT, 'debit rejected'); END
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();

    let err = store
        .settle(&pending("TAG_001", "TAG_002", Some("Paper")), &ScoringPolicy::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));

    let reporter = store.account(&id("TAG_001")).await.unwrap();
    let reported = store.account(&id("TAG_002")).await.unwrap();
    assert_eq!(reporter.balance, Points::new(1000));
    assert_eq!(reporter.report_count, 0);
    assert_eq!(reported.balance, Points::new(1000));
    assert!(reported.violation_notes.is_empty());
    assert!(store.scan_events().await.unwrap().is_empty());
    assert!(store.ledger_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_entry_amounts_must_be_positive() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &StoreConfig::default()).await;

    let err = store
        .settle(&pending("TAG_001", "TAG_002", None), &ScoringPolicy::new(0, 0, 50))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Ledger(LedgerError::ZeroReward)));
    assert!(store.ledger_entries().await.unwrap().is_empty());

    let insert = |direction: &'static str| {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (entry_id, timestamp, account_id, direction, amount,
                                        reason, counterparty_id, waste_category, transaction_id)
            VALUES (?, ?, 'TAG_001', ?, 0, 'manual', 'TAG_002', NULL, 'tx')
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(Utc::now())
        .bind(direction)
    };
    assert!(insert("credit").execute(store.pool()).await.is_err());
    // A debit against an account already at zero records nothing deducted
    insert("debit").execute(store.pool()).await.unwrap();
}

#[tokio::test]
async fn test_balance_floor_and_reconciliation() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &StoreConfig::default()).await;
    let policy = ScoringPolicy::default();

    for _ in 0..25 {
        store.settle(&pending("TAG_001", "TAG_002", None), &policy).await.unwrap();
    }

    let reported = store.account(&id("TAG_002")).await.unwrap();
    assert_eq!(reported.balance, Points::ZERO);
    assert_eq!(reported.violation_notes.len(), 25);

    // The 21st+ settlements find the account at zero and deduct nothing
    let last_debit = store
        .ledger_entries()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.is_debit())
        .last()
        .unwrap();
    assert!(last_debit.amount.is_zero());

    let report = reconcile(
        &store.accounts().await.unwrap(),
        &store.seed_balances().await.unwrap(),
        &store.ledger_entries().await.unwrap(),
    );
    assert!(report.is_consistent(), "{:?}", report);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_settlements_do_not_lose_updates() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir, &StoreConfig::default()).await);
    let policy = ScoringPolicy::default();

    let reporters = ["TAG_001", "TAG_003", "TAG_004", "TAG_005"];
    let mut handles = Vec::new();
    for round in 0..4 {
        for reporter in reporters {
            let store = Arc::clone(&store);
            let category = if round % 2 == 0 { Some("Plastic") } else { None };
            let pending = pending(reporter, "TAG_002", category);
            handles.push(tokio::spawn(async move {
                store.settle(&pending, &policy).await
            }));
        }
    }

    // Every settlement waits its turn for the write lock; none gives up
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reported = store.account(&id("TAG_002")).await.unwrap();
    assert_eq!(reported.violation_notes.len(), 16);
    assert_eq!(reported.balance, Points::new(1000 - 16 * 50));
    for reporter in reporters {
        let account = store.account(&id(reporter)).await.unwrap();
        assert_eq!(account.balance, Points::new(1000 + 2 * 30 + 2 * 20));
        assert_eq!(account.report_count, 4);
    }
    assert_eq!(store.scan_events().await.unwrap().len(), 16);
    assert_eq!(store.ledger_entries().await.unwrap().len(), 32);

    let report = reconcile(
        &store.accounts().await.unwrap(),
        &store.seed_balances().await.unwrap(),
        &store.ledger_entries().await.unwrap(),
    );
    assert!(report.is_consistent(), "{:?}", report);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unrelated_settlements_all_commit() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir, &StoreConfig::default()).await);
    let policy = ScoringPolicy::default();

    let pairs = [
        ("TAG_001", "TAG_002"),
        ("TAG_003", "TAG_004"),
        ("TAG_005", "TAG_006"),
        ("TAG_007", "TAG_008"),
        ("TAG_009", "TAG_010"),
    ];
    let mut handles = Vec::new();
    for _ in 0..2 {
        for (reporter, reported) in pairs {
            let store = Arc::clone(&store);
            let pending = pending(reporter, reported, None);
            handles.push(tokio::spawn(async move {
                store.settle(&pending, &policy).await
            }));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for (reporter, reported) in pairs {
        assert_eq!(
            store.account(&id(reporter)).await.unwrap().balance,
            Points::new(1040)
        );
        assert_eq!(
            store.account(&id(reported)).await.unwrap().balance,
            Points::new(900)
        );
    }
    assert_eq!(store.ledger_entries().await.unwrap().len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_claims_racing_settlements() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open(&dir, &StoreConfig::default()).await);
    let policy = ScoringPolicy::default();

    let mut settles = Vec::new();
    let mut claims = Vec::new();
    for i in 0..8 {
        let settle_store = Arc::clone(&store);
        let pending = pending("TAG_001", "TAG_002", None);
        settles.push(tokio::spawn(async move {
            settle_store.settle(&pending, &policy).await
        }));

        let claim_store = Arc::clone(&store);
        let name = format!("Rahul {}", i);
        claims.push(tokio::spawn(async move {
            claim_store.claim(&id("TAG_002"), &name).await
        }));
    }

    for handle in settles {
        handle.await.unwrap().unwrap();
    }
    for handle in claims {
        handle.await.unwrap().unwrap();
    }

    let rahul = store.account(&id("TAG_002")).await.unwrap();
    assert!(rahul.display_name.starts_with("Rahul "));
    assert_eq!(rahul.balance, Points::new(1000 - 8 * 50));
    assert_eq!(rahul.violation_notes.len(), 8);
    let asha = store.account(&id("TAG_001")).await.unwrap();
    assert_eq!(asha.balance, Points::new(1000 + 8 * 20));

    let report = reconcile(
        &store.accounts().await.unwrap(),
        &store.seed_balances().await.unwrap(),
        &store.ledger_entries().await.unwrap(),
    );
    assert!(report.is_consistent(), "{:?}", report);
}

#[tokio::test]
async fn test_change_feed_delivers_full_contents() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &StoreConfig::default()).await;
    let mut rx = store.subscribe();

    store
        .settle(&pending("TAG_001", "TAG_002", None), &ScoringPolicy::default())
        .await
        .unwrap();

    let snapshot = rx.recv().await.unwrap();
    assert_eq!(snapshot.accounts.len(), 10);
    assert_eq!(snapshot.scan_events.len(), 1);
    assert_eq!(snapshot.ledger_entries.len(), 2);
    assert_eq!(
        snapshot.account(&id("TAG_001")).unwrap().balance,
        Points::new(1020)
    );
    assert!(snapshot.revision >= 2);
}

#[tokio::test]
async fn test_audit_export_digest() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir, &StoreConfig::default()).await;
    let policy = ScoringPolicy::default();
    store.settle(&pending("TAG_001", "TAG_002", Some("Glass")), &policy).await.unwrap();
    store.settle(&pending("TAG_003", "TAG_002", None), &policy).await.unwrap();

    let path = dir.path().join("audit.jsonl");
    let summary = export_audit(&store, &path).await.unwrap();

    assert_eq!(summary.scan_events, 2);
    assert_eq!(summary.ledger_entries, 4);
    assert_eq!(summary.sha256, file_digest(&path).unwrap());

    let content = std::fs::read_to_string(&path).unwrap();
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 6);
    assert_eq!(records[0]["record"], "scan_event");
    assert_eq!(records[0]["scannerId"], "TAG_001");
    assert_eq!(records[1]["record"], "ledger_entry");
    assert_eq!(records[1]["type"], "credit");
    assert_eq!(records[2]["type"], "debit");
    assert_eq!(records[3]["scannerId"], "TAG_003");
}
