//! SQLite store
//!
//! The database runs in WAL mode with a busy timeout. Every write opens with
//! `BEGIN IMMEDIATE`, so writers queue for the lock and read current balances
//! once they hold it. A settlement reads both accounts, plans, then writes
//! balances guarded by each row's version. A busy error past the timeout or a
//! version mismatch rolls the transaction back and the whole thing is retried
//! from a fresh read, up to `max_settle_attempts`.

pub mod repos;
pub mod schema;

pub use repos::{AccountRepo, LedgerEntryRepo, MetaRepo, NoteRepo, ScanEventRepo};
pub use schema::{AccountRow, LedgerEntryRow, NoteRow, ScanEventRow};

use crate::error::{is_busy, StoreError, StoreResult};
use crate::feed::{ChangeFeed, SnapshotReceiver};
use crate::traits::{LedgerStore, Snapshot};
use async_trait::async_trait;
use chrono::Utc;
use cleancredit_core::{Account, AccountId, Points, ScoringPolicy, StoreConfig};
use cleancredit_ledger::{LedgerEntry, PendingViolation, ScanEvent, SettlementPlan, SettlementResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Store backed by a SQLite database file
pub struct SqliteStore {
    pool: SqlitePool,
    config: StoreConfig,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and apply the schema
    pub async fn open(path: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout())
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            config: config.clone(),
            feed: ChangeFeed::new(),
        };
        store.init().await?;
        debug!(path = %path.as_ref().display(), "SQLite store opened");
        Ok(store)
    }

    async fn init(&self) -> StoreResult<()> {
        for statement in schema::SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Start a transaction that holds the write lock from its first statement.
    ///
    /// Competing writers wait on the busy timeout here instead of failing a
    /// read-to-write upgrade against a newer WAL snapshot.
    async fn begin_write(&self) -> StoreResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn load_accounts(conn: &mut SqliteConnection) -> StoreResult<Vec<Account>> {
        let rows = AccountRepo::get_all(&mut *conn).await?;
        let mut notes = NoteRepo::get_all(&mut *conn).await?;
        rows.into_iter()
            .map(|row| {
                let account_notes = notes.remove(&row.id).unwrap_or_default();
                row.into_account(account_notes)
            })
            .collect()
    }

    async fn load_account(conn: &mut SqliteConnection, id: &AccountId) -> StoreResult<Account> {
        let row = AccountRepo::find(&mut *conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Account", id.as_str()))?;
        let notes = NoteRepo::for_account(&mut *conn, id).await?;
        row.into_account(notes)
    }

    /// One settlement attempt
    async fn try_settle(
        &self,
        pending: &PendingViolation,
        policy: &ScoringPolicy,
    ) -> StoreResult<SettlementResult> {
        let mut tx = self.begin_write().await?;

        let reporter_row = AccountRepo::find(&mut *tx, &pending.reporter_id)
            .await?
            .ok_or_else(|| StoreError::account_missing(&pending.reporter_id))?;
        let reported_row = AccountRepo::find(&mut *tx, &pending.reported_id)
            .await?
            .ok_or_else(|| StoreError::account_missing(&pending.reported_id))?;
        let (reporter_version, reported_version) = (reporter_row.version, reported_row.version);

        // Notes are append-only and do not feed the plan
        let reporter = reporter_row.into_account(Vec::new())?;
        let reported = reported_row.into_account(Vec::new())?;

        let plan = SettlementPlan::build(pending, policy, &reporter, &reported, Utc::now())?;

        let reporter_written = AccountRepo::update_settled(
            &mut *tx,
            &plan.reporter_id,
            plan.reporter_balance,
            plan.reporter_report_count,
            reporter_version,
        )
        .await?;
        let reported_written = AccountRepo::update_settled(
            &mut *tx,
            &plan.reported_id,
            plan.reported_balance,
            reported.report_count,
            reported_version,
        )
        .await?;
        if !(reporter_written && reported_written) {
            return Err(StoreError::Conflict { attempts: 1 });
        }

        NoteRepo::append(&mut *tx, &plan.reported_id, &plan.violation_note).await?;
        ScanEventRepo::insert(&mut *tx, &plan.result.scan_event).await?;
        LedgerEntryRepo::insert(&mut *tx, &plan.result.credit).await?;
        LedgerEntryRepo::insert(&mut *tx, &plan.result.debit).await?;
        MetaRepo::bump(&mut *tx).await?;

        tx.commit().await?;
        Ok(plan.result)
    }

    async fn publish(&self) {
        match self.snapshot().await {
            Ok(snapshot) => {
                self.feed.publish(snapshot);
            }
            Err(e) => warn!(error = %e, "Failed to publish snapshot"),
        }
    }
}

fn is_contention(err: &StoreError) -> bool {
    match err {
        StoreError::Conflict { .. } => true,
        StoreError::Database(e) => is_busy(e),
        _ => false,
    }
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn provision(&self, accounts: Vec<Account>) -> StoreResult<usize> {
        let mut tx = self.begin_write().await?;

        let existing = AccountRepo::count(&mut *tx).await?;
        if existing > 0 {
            return Err(StoreError::AlreadyProvisioned(existing as usize));
        }
        for account in &accounts {
            AccountRepo::insert(&mut *tx, account).await?;
        }
        MetaRepo::bump(&mut *tx).await?;
        tx.commit().await?;

        info!(count = accounts.len(), "Provisioned account pool");
        self.publish().await;
        Ok(accounts.len())
    }

    async fn accounts(&self) -> StoreResult<Vec<Account>> {
        let mut conn = self.pool.acquire().await?;
        Self::load_accounts(&mut conn).await
    }

    async fn account(&self, id: &AccountId) -> StoreResult<Account> {
        let mut conn = self.pool.acquire().await?;
        Self::load_account(&mut conn, id).await
    }

    async fn claim(&self, id: &AccountId, display_name: &str) -> StoreResult<Account> {
        let mut tx = self.begin_write().await?;
        let mut account = Self::load_account(&mut tx, id).await?;

        if !account.claim(display_name)? {
            return Ok(account);
        }
        AccountRepo::update_name(&mut *tx, id, &account.display_name).await?;
        MetaRepo::bump(&mut *tx).await?;
        tx.commit().await?;

        info!(account = %id, name = %account.display_name, "Account claimed");
        self.publish().await;
        Ok(account)
    }

    async fn settle(
        &self,
        pending: &PendingViolation,
        policy: &ScoringPolicy,
    ) -> StoreResult<SettlementResult> {
        let attempts = self.config.max_settle_attempts.max(1);

        for attempt in 1..=attempts {
            match self.try_settle(pending, policy).await {
                Ok(result) => {
                    info!(
                        tx = %result.transaction_id(),
                        reporter = %pending.reporter_id,
                        reported = %pending.reported_id,
                        reward = %result.credit.amount,
                        penalty = %result.debit.amount,
                        attempt,
                        "Settlement committed"
                    );
                    self.publish().await;
                    return Ok(result);
                }
                Err(e) if is_contention(&e) && attempt < attempts => {
                    warn!(
                        attempt,
                        reporter = %pending.reporter_id,
                        reported = %pending.reported_id,
                        error = %e,
                        "Settlement conflict, retrying"
                    );
                    tokio::time::sleep(self.config.retry_backoff(attempt)).await;
                }
                Err(e) if is_contention(&e) => {
                    warn!(attempts, error = %e, "Settlement retries exhausted");
                    return Err(StoreError::Conflict { attempts });
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::Conflict { attempts })
    }

    async fn ledger_entries(&self) -> StoreResult<Vec<LedgerEntry>> {
        LedgerEntryRepo::get_all(&self.pool).await
    }

    async fn scan_events(&self) -> StoreResult<Vec<ScanEvent>> {
        ScanEventRepo::get_all(&self.pool).await
    }

    async fn seed_balances(&self) -> StoreResult<BTreeMap<AccountId, Points>> {
        AccountRepo::seed_balances(&self.pool)
            .await?
            .into_iter()
            .map(|(id, seed)| Ok((AccountId::new(id)?, Points::from_i64(seed)?)))
            .collect()
    }

    async fn snapshot(&self) -> StoreResult<Snapshot> {
        // One read transaction so every collection comes from the same commit
        let mut tx = self.pool.begin().await?;
        let revision = MetaRepo::revision(&mut *tx).await?;
        let accounts = Self::load_accounts(&mut tx).await?;
        let scan_events = ScanEventRepo::get_all(&mut *tx).await?;
        let ledger_entries = LedgerEntryRepo::get_all(&mut *tx).await?;
        tx.commit().await?;

        Ok(Snapshot {
            revision,
            accounts,
            scan_events,
            ledger_entries,
        })
    }

    fn subscribe(&self) -> SnapshotReceiver {
        self.feed.subscribe()
    }
}
