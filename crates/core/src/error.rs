//! Core domain errors

use thiserror::Error;

/// Errors raised while constructing or mutating core domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    // === Points ===
    #[error("Points overflow")]
    PointsOverflow,

    #[error("Points cannot be negative: {0}")]
    NegativePoints(i64),

    // === Identity ===
    #[error("Invalid identity code '{0}': expected exactly 10 digits")]
    InvalidIdentityCode(String),

    #[error("Invalid account id: {0}")]
    InvalidAccountId(String),

    #[error("Display name cannot be empty")]
    EmptyDisplayName,

    #[error("Duplicate identity code: {0}")]
    DuplicateIdentityCode(String),

    // === Configuration ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// True for errors caused by malformed identity input
    pub fn is_identity_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidIdentityCode(_)
                | CoreError::InvalidAccountId(_)
                | CoreError::DuplicateIdentityCode(_)
        )
    }
}
