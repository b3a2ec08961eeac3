//! Settlement planning
//!
//! A [`SettlementPlan`] is computed from a snapshot of both accounts and holds
//! everything one settlement writes: new balances, the reporter's new report
//! count, the violation note, the scan event and the credit/debit pair.
//! Stores persist a plan inside a single transaction; applying it to the
//! in-memory accounts is [`SettlementPlan::apply`].
//!
//! # Amounts
//! - credit = reward_base (+ sorting_bonus when classified)
//! - debit = min(balance, penalty), so the reported balance floors at zero
//!   while `seed + credits - debits == balance` still holds
//!
//! Credits are always positive. A debit is positive unless the reported
//! account was already at zero, in which case the pair is still written with
//! a zero debit so every settlement keeps its credit/debit pair.

use crate::entry::{Direction, LedgerEntry, ScanEvent, TransactionId};
use crate::error::LedgerError;
use crate::validation::PendingViolation;
use chrono::{DateTime, Utc};
use cleancredit_core::{Account, AccountId, Points, ScoringPolicy, WasteCategory};
use serde::Serialize;
use uuid::Uuid;

/// Records produced by one settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementResult {
    pub scan_event: ScanEvent,
    pub credit: LedgerEntry,
    pub debit: LedgerEntry,
}

impl SettlementResult {
    pub fn transaction_id(&self) -> TransactionId {
        self.scan_event.transaction_id
    }
}

/// Everything a settlement changes, computed before anything is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub reporter_id: AccountId,
    pub reported_id: AccountId,
    pub reporter_balance: Points,
    pub reporter_report_count: u32,
    pub reported_balance: Points,
    pub violation_note: String,
    pub result: SettlementResult,
}

impl SettlementPlan {
    /// Plan a settlement against the current state of both parties.
    ///
    /// `reporter` and `reported` must be the accounts named by `pending`.
    pub fn build(
        pending: &PendingViolation,
        policy: &ScoringPolicy,
        reporter: &Account,
        reported: &Account,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        ensure_same(&pending.reporter_id, &reporter.id)?;
        ensure_same(&pending.reported_id, &reported.id)?;
        if reporter.id == reported.id {
            return Err(LedgerError::SelfSettlement(reporter.id.clone()));
        }

        let reward = policy.reward_for(pending.is_classified())?;
        if reward.is_zero() {
            return Err(LedgerError::ZeroReward);
        }
        let reporter_balance = reporter.balance.checked_add(reward)?;
        let reporter_report_count = reporter.report_count.saturating_add(1);

        let reported_balance = reported.balance.saturating_sub(policy.penalty);
        let deducted = reported.balance.saturating_sub(reported_balance);

        let transaction_id = TransactionId::new();
        let category = pending.waste_category.clone();

        let scan_event = ScanEvent {
            transaction_id,
            timestamp: now,
            reporter_id: reporter.id.clone(),
            reported_id: reported.id.clone(),
            waste_category: category.clone(),
            reward,
            penalty: policy.penalty,
            raw_scanned_value: pending.raw_scanned_value.clone(),
            description: pending.description.clone(),
        };

        let credit = LedgerEntry {
            entry_id: Uuid::new_v4(),
            timestamp: now,
            account_id: reporter.id.clone(),
            direction: Direction::Credit,
            amount: reward,
            reason: format!("Reported {} for littering", reported.id),
            counterparty_id: reported.id.clone(),
            waste_category: category.clone(),
            transaction_id,
        };

        let debit = LedgerEntry {
            entry_id: Uuid::new_v4(),
            timestamp: now,
            account_id: reported.id.clone(),
            direction: Direction::Debit,
            amount: deducted,
            reason: format!("Littering penalty reported by {}", reporter.id),
            counterparty_id: reporter.id.clone(),
            waste_category: category.clone(),
            transaction_id,
        };

        Ok(Self {
            reporter_id: reporter.id.clone(),
            reported_id: reported.id.clone(),
            reporter_balance,
            reporter_report_count,
            reported_balance,
            violation_note: format_violation_note(
                category.as_ref(),
                pending.description.as_deref(),
                now,
            ),
            result: SettlementResult {
                scan_event,
                credit,
                debit,
            },
        })
    }

    /// Apply the planned state to in-memory copies of both accounts
    pub fn apply(&self, reporter: &mut Account, reported: &mut Account) -> Result<(), LedgerError> {
        ensure_same(&self.reporter_id, &reporter.id)?;
        ensure_same(&self.reported_id, &reported.id)?;

        reporter.balance = self.reporter_balance;
        reporter.report_count = self.reporter_report_count;
        reported.balance = self.reported_balance;
        reported.violation_notes.push(self.violation_note.clone());
        Ok(())
    }
}

fn ensure_same(expected: &AccountId, actual: &AccountId) -> Result<(), LedgerError> {
    if expected == actual {
        Ok(())
    } else {
        Err(LedgerError::AccountMismatch {
            expected: expected.clone(),
            actual: actual.clone(),
        })
    }
}

/// Note appended to the reported account's history:
/// `"{category} left at {HH:MM:SS} UTC"`, with `": {description}"` when given.
pub fn format_violation_note(
    category: Option<&WasteCategory>,
    description: Option<&str>,
    at: DateTime<Utc>,
) -> String {
    let what = category.map(WasteCategory::as_str).unwrap_or("Trash");
    let mut note = format!("{} left at {} UTC", what, at.format("%H:%M:%S"));
    if let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) {
        note.push_str(": ");
        note.push_str(description);
    }
    note
}
