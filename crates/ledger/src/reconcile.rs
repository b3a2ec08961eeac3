//! Reconciliation - check cached balances against the ledger
//!
//! For every account: `seed + Σcredits − Σdebits == balance`. Also flags
//! entries naming unknown accounts and transactions that are not exactly one
//! credit plus one debit.

use crate::entry::{Direction, LedgerEntry, TransactionId};
use cleancredit_core::{Account, AccountId, Points};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// One account whose cached balance disagrees with its ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub account_id: AccountId,
    /// `None` when no seed was recorded for the account
    pub seed: Option<Points>,
    pub total_credits: Points,
    pub total_debits: Points,
    pub expected: i128,
    pub cached: Points,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.seed {
            Some(seed) => write!(
                f,
                "{}: seed {} + credits {} - debits {} = {}, cached {}",
                self.account_id, seed, self.total_credits, self.total_debits, self.expected, self.cached
            ),
            None => write!(f, "{}: no seed recorded, cached {}", self.account_id, self.cached),
        }
    }
}

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub accounts_checked: usize,
    pub entries_checked: usize,
    pub divergences: Vec<Divergence>,
    /// Entries whose account is not in the pool
    pub orphan_entries: Vec<AccountId>,
    /// Transactions that are not one credit plus one debit
    pub unbalanced_transactions: Vec<TransactionId>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.divergences.is_empty()
            && self.orphan_entries.is_empty()
            && self.unbalanced_transactions.is_empty()
    }
}

impl fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} divergent accounts, {} orphan entries, {} unbalanced transactions",
            self.divergences.len(),
            self.orphan_entries.len(),
            self.unbalanced_transactions.len()
        )
    }
}

/// Reconcile every account against the full ledger
pub fn reconcile(
    accounts: &[Account],
    seeds: &BTreeMap<AccountId, Points>,
    entries: &[LedgerEntry],
) -> ReconciliationReport {
    let mut totals: HashMap<&AccountId, (u64, u64)> = HashMap::new();
    let mut legs: BTreeMap<TransactionId, (u32, u32)> = BTreeMap::new();

    for entry in entries {
        let (credits, debits) = totals.entry(&entry.account_id).or_default();
        let (credit_legs, debit_legs) = legs.entry(entry.transaction_id).or_default();
        match entry.direction {
            Direction::Credit => {
                *credits = credits.saturating_add(entry.amount.value());
                *credit_legs += 1;
            }
            Direction::Debit => {
                *debits = debits.saturating_add(entry.amount.value());
                *debit_legs += 1;
            }
        }
    }

    let mut report = ReconciliationReport {
        accounts_checked: accounts.len(),
        entries_checked: entries.len(),
        ..Default::default()
    };

    for account in accounts {
        let (credits, debits) = totals.remove(&account.id).unwrap_or((0, 0));
        let seed = seeds.get(&account.id).copied();
        let expected = i128::from(seed.unwrap_or(Points::ZERO).value()) + i128::from(credits)
            - i128::from(debits);

        if seed.is_none() || expected != i128::from(account.balance.value()) {
            tracing::warn!(
                account = %account.id,
                expected = %expected,
                cached = %account.balance,
                "Balance diverges from ledger"
            );
            report.divergences.push(Divergence {
                account_id: account.id.clone(),
                seed,
                total_credits: Points::new(credits),
                total_debits: Points::new(debits),
                expected,
                cached: account.balance,
            });
        }
    }

    let mut orphans: Vec<AccountId> = totals.into_keys().cloned().collect();
    orphans.sort();
    report.orphan_entries = orphans;

    report.unbalanced_transactions = legs
        .into_iter()
        .filter(|(_, legs)| *legs != (1, 1))
        .map(|(id, _)| id)
        .collect();

    report
}
