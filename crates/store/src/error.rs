//! Store errors
//!
//! Wraps sqlx, IO and ledger errors. Conflict and unavailability are
//! retryable by the caller; everything else is terminal.

use cleancredit_core::{AccountId, CoreError};
use cleancredit_ledger::LedgerError;
use thiserror::Error;

/// Store layer errors
#[derive(Debug, Error)]
pub enum StoreError {
    // === Database errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Store already provisioned with {0} accounts")]
    AlreadyProvisioned(usize),

    #[error("Corrupt record in {table}: {detail}")]
    Corrupt { table: String, detail: String },

    // === Settlement errors ===
    #[error("Settlement conflict: gave up after {attempts} attempts")]
    Conflict { attempts: u32 },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Core(#[from] CoreError),

    // === Export errors ===
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for StoreError
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn corrupt(table: &str, detail: impl ToString) -> Self {
        Self::Corrupt {
            table: table.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn account_missing(id: &AccountId) -> Self {
        Self::Ledger(LedgerError::AccountMissing(id.clone()))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_account_missing(&self) -> bool {
        matches!(self, Self::Ledger(e) if e.is_account_missing())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the caller may try the whole operation again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } | Self::Unavailable(_) => true,
            Self::Database(e) => is_busy(e) || matches!(e, sqlx::Error::PoolTimedOut),
            _ => false,
        }
    }
}

/// SQLite result codes for a locked database or a stale read snapshot
const BUSY_CODES: [&str; 4] = ["5", "6", "261", "517"];

/// Whether an sqlx error is SQLite reporting lock contention
pub fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db
            .code()
            .map_or(false, |code| BUSY_CODES.contains(&code.as_ref())),
        _ => false,
    }
}
