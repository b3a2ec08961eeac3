//! Database schema and row types
//!
//! Tables: `accounts`, `violation_notes`, `scan_events`, `ledger_entries` and
//! a single-row `store_meta` holding the commit revision.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use cleancredit_core::{Account, AccountId, IdentityCode, Points, WasteCategory};
use cleancredit_ledger::{Direction, LedgerEntry, ScanEvent, TransactionId};
use std::str::FromStr;
use uuid::Uuid;

pub(crate) const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL DEFAULT '',
        identity_code TEXT NOT NULL UNIQUE,
        balance INTEGER NOT NULL CHECK (balance >= 0),
        report_count INTEGER NOT NULL DEFAULT 0 CHECK (report_count >= 0),
        seed_balance INTEGER NOT NULL CHECK (seed_balance >= 0),
        version INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS violation_notes (
        account_id TEXT NOT NULL REFERENCES accounts(id),
        seq INTEGER NOT NULL,
        note TEXT NOT NULL,
        PRIMARY KEY (account_id, seq)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scan_events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        transaction_id TEXT NOT NULL UNIQUE,
        timestamp TEXT NOT NULL,
        reporter_id TEXT NOT NULL REFERENCES accounts(id),
        reported_id TEXT NOT NULL REFERENCES accounts(id),
        waste_category TEXT,
        reward INTEGER NOT NULL,
        penalty INTEGER NOT NULL,
        raw_scanned_value TEXT NOT NULL,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        entry_id TEXT NOT NULL UNIQUE,
        timestamp TEXT NOT NULL,
        account_id TEXT NOT NULL REFERENCES accounts(id),
        direction TEXT NOT NULL CHECK (direction IN ('credit', 'debit')),
        amount INTEGER NOT NULL CHECK (amount > 0 OR (direction = 'debit' AND amount = 0)),
        reason TEXT NOT NULL,
        counterparty_id TEXT NOT NULL REFERENCES accounts(id),
        waste_category TEXT,
        transaction_id TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_ledger_entries_account
    ON ledger_entries(account_id)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS store_meta (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        revision INTEGER NOT NULL
    )
    "#,
    "INSERT OR IGNORE INTO store_meta (id, revision) VALUES (1, 0)",
];

/// Row type for `accounts`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub id: String,
    pub display_name: String,
    pub identity_code: String,
    pub balance: i64,
    pub report_count: i64,
    pub seed_balance: i64,
    pub version: i64,
}

/// Row type for `violation_notes`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NoteRow {
    pub account_id: String,
    pub note: String,
}

/// Row type for `scan_events`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanEventRow {
    pub transaction_id: String,
    pub timestamp: DateTime<Utc>,
    pub reporter_id: String,
    pub reported_id: String,
    pub waste_category: Option<String>,
    pub reward: i64,
    pub penalty: i64,
    pub raw_scanned_value: String,
    pub description: Option<String>,
}

/// Row type for `ledger_entries`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntryRow {
    pub entry_id: String,
    pub timestamp: DateTime<Utc>,
    pub account_id: String,
    pub direction: String,
    pub amount: i64,
    pub reason: String,
    pub counterparty_id: String,
    pub waste_category: Option<String>,
    pub transaction_id: String,
}

// === Conversion implementations ===

impl AccountRow {
    pub fn into_account(self, violation_notes: Vec<String>) -> StoreResult<Account> {
        Ok(Account {
            id: AccountId::new(self.id)?,
            display_name: self.display_name,
            identity_code: IdentityCode::new(self.identity_code)?,
            balance: Points::from_i64(self.balance)?,
            report_count: u32::try_from(self.report_count)
                .map_err(|_| StoreError::corrupt("accounts", "report_count out of range"))?,
            violation_notes,
        })
    }
}

impl TryFrom<ScanEventRow> for ScanEvent {
    type Error = StoreError;

    fn try_from(row: ScanEventRow) -> StoreResult<Self> {
        Ok(ScanEvent {
            transaction_id: parse_transaction_id("scan_events", &row.transaction_id)?,
            timestamp: row.timestamp,
            reporter_id: AccountId::new(row.reporter_id)?,
            reported_id: AccountId::new(row.reported_id)?,
            waste_category: WasteCategory::parse(row.waste_category.as_deref()),
            reward: Points::from_i64(row.reward)?,
            penalty: Points::from_i64(row.penalty)?,
            raw_scanned_value: row.raw_scanned_value,
            description: row.description,
        })
    }
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: LedgerEntryRow) -> StoreResult<Self> {
        Ok(LedgerEntry {
            entry_id: Uuid::parse_str(&row.entry_id)
                .map_err(|e| StoreError::corrupt("ledger_entries", e))?,
            timestamp: row.timestamp,
            account_id: AccountId::new(row.account_id)?,
            direction: Direction::from_str(&row.direction)
                .map_err(|e| StoreError::corrupt("ledger_entries", e))?,
            amount: Points::from_i64(row.amount)?,
            reason: row.reason,
            counterparty_id: AccountId::new(row.counterparty_id)?,
            waste_category: WasteCategory::parse(row.waste_category.as_deref()),
            transaction_id: parse_transaction_id("ledger_entries", &row.transaction_id)?,
        })
    }
}

fn parse_transaction_id(table: &str, raw: &str) -> StoreResult<TransactionId> {
    Uuid::parse_str(raw)
        .map(TransactionId::from_uuid)
        .map_err(|e| StoreError::corrupt(table, e))
}
