//! Report flow errors

use crate::decoder::DecodeFailure;
use cleancredit_core::AccountId;
use cleancredit_ledger::Rejection;
use cleancredit_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Shown to the user verbatim
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Decode(#[from] DecodeFailure),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cannot {event} while the report is {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("Unknown reporter: {0}")]
    UnknownReporter(AccountId),
}

pub type ReportResult<T> = Result<T, ReportError>;

impl ReportError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Whether confirming again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}
