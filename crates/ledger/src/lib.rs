//! CleanCredit Ledger - Violation settlement core
//!
//! Every points movement goes through this crate. A confirmed violation is
//! settled as one logical transaction: a scan event, a credit to the reporter
//! and a debit to the reported party.
//!
//! # Flow
//! raw scan → [`resolve`] → [`validate`] → (confirmation) → [`SettlementPlan`]
//! → atomic commit in a store → [`project`] / [`reconcile`] on the read side.

pub mod entry;
pub mod error;
pub mod projection;
pub mod reconcile;
pub mod resolver;
pub mod settlement;
pub mod validation;

pub use entry::{Direction, LedgerEntry, ScanEvent, TransactionId};
pub use error::LedgerError;
pub use projection::{project, LedgerProjection};
pub use reconcile::{reconcile, Divergence, ReconciliationReport};
pub use resolver::{decode_scan_value, resolve, MatchedBy, Resolved};
pub use settlement::{format_violation_note, SettlementPlan, SettlementResult};
pub use validation::{validate, PendingViolation, Rejection, ReportDetails};
