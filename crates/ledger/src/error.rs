//! Ledger errors

use cleancredit_core::{AccountId, CoreError};
use thiserror::Error;

/// Errors that abort a settlement before anything is applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account no longer exists: {0}")]
    AccountMissing(AccountId),

    #[error("Account mismatch: expected {expected}, got {actual}")]
    AccountMismatch {
        expected: AccountId,
        actual: AccountId,
    },

    #[error("Reporter and reported party are the same account: {0}")]
    SelfSettlement(AccountId),

    #[error("Reward must be positive")]
    ZeroReward,

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl LedgerError {
    pub fn is_account_missing(&self) -> bool {
        matches!(self, LedgerError::AccountMissing(_))
    }
}
