//! Repository implementations for SQLite
//!
//! Every function takes an executor so the same query runs against the pool
//! or inside a settlement transaction.

use crate::error::{StoreError, StoreResult};
use crate::sqlite::schema::*;
use cleancredit_core::{Account, AccountId, Points};
use cleancredit_ledger::{LedgerEntry, ScanEvent};
use sqlx::SqliteExecutor;
use std::collections::HashMap;

// ============================================================================
// Account Repository
// ============================================================================

/// Repository for the accounts table
pub struct AccountRepo;

impl AccountRepo {
    pub async fn get_all<'e, E: SqliteExecutor<'e>>(executor: E) -> StoreResult<Vec<AccountRow>> {
        let rows = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts ORDER BY id")
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    pub async fn find<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: &AccountId,
    ) -> StoreResult<Option<AccountRow>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn count<'e, E: SqliteExecutor<'e>>(executor: E) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Insert a freshly provisioned account; its balance becomes the seed
    pub async fn insert<'e, E: SqliteExecutor<'e>>(executor: E, account: &Account) -> StoreResult<()> {
        let balance = account.balance.to_i64()?;
        sqlx::query(
            r#"
            INSERT INTO accounts (id, display_name, identity_code, balance, report_count, seed_balance, version)
            VALUES (?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.display_name)
        .bind(account.identity_code.as_str())
        .bind(balance)
        .bind(i64::from(account.report_count))
        .bind(balance)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update_name<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: &AccountId,
        display_name: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET display_name = ?, version = version + 1 WHERE id = ?",
        )
        .bind(display_name)
        .bind(id.as_str())
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Account", id.as_str()));
        }
        Ok(())
    }

    /// Write a settled balance if the row is still at `expected_version`.
    ///
    /// Returns `false` when another commit changed the row first.
    pub async fn update_settled<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: &AccountId,
        balance: Points,
        report_count: u32,
        expected_version: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = ?, report_count = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(balance.to_i64()?)
        .bind(i64::from(report_count))
        .bind(id.as_str())
        .bind(expected_version)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn seed_balances<'e, E: SqliteExecutor<'e>>(
        executor: E,
    ) -> StoreResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT id, seed_balance FROM accounts ORDER BY id",
        )
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}

// ============================================================================
// Violation Note Repository
// ============================================================================

/// Repository for the violation_notes table
pub struct NoteRepo;

impl NoteRepo {
    /// All notes grouped by account, oldest first
    pub async fn get_all<'e, E: SqliteExecutor<'e>>(
        executor: E,
    ) -> StoreResult<HashMap<String, Vec<String>>> {
        let rows = sqlx::query_as::<_, NoteRow>(
            "SELECT account_id, note FROM violation_notes ORDER BY account_id, seq",
        )
        .fetch_all(executor)
        .await?;

        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            grouped.entry(row.account_id).or_default().push(row.note);
        }
        Ok(grouped)
    }

    pub async fn for_account<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: &AccountId,
    ) -> StoreResult<Vec<String>> {
        let notes = sqlx::query_scalar::<_, String>(
            "SELECT note FROM violation_notes WHERE account_id = ? ORDER BY seq",
        )
        .bind(id.as_str())
        .fetch_all(executor)
        .await?;
        Ok(notes)
    }

    pub async fn append<'e, E: SqliteExecutor<'e>>(
        executor: E,
        id: &AccountId,
        note: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO violation_notes (account_id, seq, note)
            VALUES (?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM violation_notes WHERE account_id = ?), ?)
            "#,
        )
        .bind(id.as_str())
        .bind(id.as_str())
        .bind(note)
        .execute(executor)
        .await?;
        Ok(())
    }
}

// ============================================================================
// Scan Event Repository
// ============================================================================

/// Repository for the scan_events table
pub struct ScanEventRepo;

impl ScanEventRepo {
    /// Newest first
    pub async fn get_all<'e, E: SqliteExecutor<'e>>(executor: E) -> StoreResult<Vec<ScanEvent>> {
        let rows = sqlx::query_as::<_, ScanEventRow>(
            r#"
            SELECT transaction_id, timestamp, reporter_id, reported_id, waste_category,
                   reward, penalty, raw_scanned_value, description
            FROM scan_events ORDER BY seq DESC
            "#,
        )
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(ScanEvent::try_from).collect()
    }

    pub async fn insert<'e, E: SqliteExecutor<'e>>(executor: E, event: &ScanEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO scan_events (transaction_id, timestamp, reporter_id, reported_id,
                                     waste_category, reward, penalty, raw_scanned_value, description)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.transaction_id.to_string())
        .bind(event.timestamp)
        .bind(event.reporter_id.as_str())
        .bind(event.reported_id.as_str())
        .bind(event.waste_category.as_ref().map(|c| c.as_str().to_string()))
        .bind(event.reward.to_i64()?)
        .bind(event.penalty.to_i64()?)
        .bind(&event.raw_scanned_value)
        .bind(&event.description)
        .execute(executor)
        .await?;
        Ok(())
    }
}

// ============================================================================
// Ledger Entry Repository
// ============================================================================

/// Repository for the ledger_entries table
pub struct LedgerEntryRepo;

impl LedgerEntryRepo {
    /// Append order
    pub async fn get_all<'e, E: SqliteExecutor<'e>>(executor: E) -> StoreResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            SELECT entry_id, timestamp, account_id, direction, amount, reason,
                   counterparty_id, waste_category, transaction_id
            FROM ledger_entries ORDER BY seq
            "#,
        )
        .fetch_all(executor)
        .await?;
        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    pub async fn insert<'e, E: SqliteExecutor<'e>>(executor: E, entry: &LedgerEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (entry_id, timestamp, account_id, direction, amount,
                                        reason, counterparty_id, waste_category, transaction_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.entry_id.to_string())
        .bind(entry.timestamp)
        .bind(entry.account_id.as_str())
        .bind(entry.direction.to_string())
        .bind(entry.amount.to_i64()?)
        .bind(&entry.reason)
        .bind(entry.counterparty_id.as_str())
        .bind(entry.waste_category.as_ref().map(|c| c.as_str().to_string()))
        .bind(entry.transaction_id.to_string())
        .execute(executor)
        .await?;
        Ok(())
    }
}

// ============================================================================
// Revision
// ============================================================================

/// Repository for the store_meta row
pub struct MetaRepo;

impl MetaRepo {
    pub async fn revision<'e, E: SqliteExecutor<'e>>(executor: E) -> StoreResult<u64> {
        let revision: i64 = sqlx::query_scalar("SELECT revision FROM store_meta WHERE id = 1")
            .fetch_one(executor)
            .await?;
        u64::try_from(revision).map_err(|_| StoreError::corrupt("store_meta", "negative revision"))
    }

    pub async fn bump<'e, E: SqliteExecutor<'e>>(executor: E) -> StoreResult<()> {
        sqlx::query("UPDATE store_meta SET revision = revision + 1 WHERE id = 1")
            .execute(executor)
            .await?;
        Ok(())
    }
}
