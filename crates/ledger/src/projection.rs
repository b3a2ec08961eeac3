//! Per-account ledger projection

use crate::entry::{Direction, LedgerEntry};
use cleancredit_core::{AccountId, Points};
use serde::Serialize;

/// Totals and recent history for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerProjection {
    pub account_id: AccountId,
    pub total_credits: Points,
    pub total_debits: Points,
    /// Most recent first
    pub recent_entries: Vec<LedgerEntry>,
}

impl LedgerProjection {
    /// Balance implied by the ledger on top of a seed, `None` if it would be negative
    pub fn implied_balance(&self, seed: Points) -> Option<Points> {
        let gross = seed.value().checked_add(self.total_credits.value())?;
        gross.checked_sub(self.total_debits.value()).map(Points::new)
    }
}

/// Project the account's entries out of the full ledger.
///
/// Entries with equal timestamps keep reverse insertion order.
pub fn project(entries: &[LedgerEntry], account_id: &AccountId, recent_limit: usize) -> LedgerProjection {
    let mut total_credits: u64 = 0;
    let mut total_debits: u64 = 0;
    let mut mine: Vec<&LedgerEntry> = Vec::new();

    for entry in entries.iter().filter(|e| &e.account_id == account_id) {
        match entry.direction {
            Direction::Credit => total_credits = total_credits.saturating_add(entry.amount.value()),
            Direction::Debit => total_debits = total_debits.saturating_add(entry.amount.value()),
        }
        mine.push(entry);
    }

    mine.reverse();
    mine.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    LedgerProjection {
        account_id: account_id.clone(),
        total_credits: Points::new(total_credits),
        total_debits: Points::new(total_debits),
        recent_entries: mine.into_iter().take(recent_limit).cloned().collect(),
    }
}
