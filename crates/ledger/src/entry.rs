//! Audit records produced by settlement
//!
//! Both record types are immutable once created. They serialize with the
//! persisted field names shared with other implementations.

use chrono::{DateTime, Utc};
use cleancredit_core::{AccountId, Points, WasteCategory};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Direction of a ledger entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Credit,
    Debit,
}

/// Identifier shared by the scan event and both ledger entries of one settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audit record of one resolved-and-settled violation report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    #[serde(rename = "transactionId")]
    pub transaction_id: TransactionId,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "scannerId")]
    pub reporter_id: AccountId,

    #[serde(rename = "littererId")]
    pub reported_id: AccountId,

    #[serde(rename = "wasteType", default, skip_serializing_if = "Option::is_none")]
    pub waste_category: Option<WasteCategory>,

    #[serde(rename = "rewardPoints")]
    pub reward: Points,

    /// Nominal penalty; the debit entry carries what was actually deducted
    #[serde(rename = "penaltyPoints")]
    pub penalty: Points,

    #[serde(rename = "scannedValue")]
    pub raw_scanned_value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One side of a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(rename = "id")]
    pub entry_id: Uuid,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "userId")]
    pub account_id: AccountId,

    #[serde(rename = "type")]
    pub direction: Direction,

    pub amount: Points,

    pub reason: String,

    #[serde(rename = "counterpartyId")]
    pub counterparty_id: AccountId,

    #[serde(rename = "wasteType", default, skip_serializing_if = "Option::is_none")]
    pub waste_category: Option<WasteCategory>,

    #[serde(rename = "transactionId")]
    pub transaction_id: TransactionId,
}

impl LedgerEntry {
    pub fn is_credit(&self) -> bool {
        self.direction == Direction::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.direction == Direction::Debit
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.direction {
            Direction::Credit => '+',
            Direction::Debit => '-',
        };
        write!(
            f,
            "{} {} {}{} ({}) [{}]",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.account_id,
            sign,
            self.amount,
            self.reason,
            self.counterparty_id
        )
    }
}
