//! The store capability every backend implements

use crate::error::StoreResult;
use crate::feed::SnapshotReceiver;
use async_trait::async_trait;
use cleancredit_core::{Account, AccountId, Points, ScoringPolicy};
use cleancredit_ledger::{LedgerEntry, PendingViolation, ScanEvent, SettlementResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Full store contents at one revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Increments on every commit
    pub revision: u64,
    /// Ordered by id
    pub accounts: Vec<Account>,
    /// Newest first
    pub scan_events: Vec<ScanEvent>,
    /// Append order
    pub ledger_entries: Vec<LedgerEntry>,
}

impl Snapshot {
    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| &a.id == id)
    }
}

/// Transactional store for accounts, scan events and ledger entries.
///
/// `settle` is the only operation that moves points. It applies the
/// settlement atomically: either every effect is committed or none is.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert the initial slot pool and record each balance as its seed.
    ///
    /// Fails with `AlreadyProvisioned` on a non-empty store.
    async fn provision(&self, accounts: Vec<Account>) -> StoreResult<usize>;

    /// All accounts ordered by id
    async fn accounts(&self) -> StoreResult<Vec<Account>>;

    async fn account(&self, id: &AccountId) -> StoreResult<Account>;

    /// Set or change a display name. Never touches points.
    async fn claim(&self, id: &AccountId, display_name: &str) -> StoreResult<Account>;

    /// Settle a confirmed violation
    async fn settle(
        &self,
        pending: &PendingViolation,
        policy: &ScoringPolicy,
    ) -> StoreResult<SettlementResult>;

    /// All ledger entries in append order
    async fn ledger_entries(&self) -> StoreResult<Vec<LedgerEntry>>;

    /// All scan events, newest first
    async fn scan_events(&self) -> StoreResult<Vec<ScanEvent>>;

    /// Balances recorded at provisioning
    async fn seed_balances(&self) -> StoreResult<BTreeMap<AccountId, Points>>;

    async fn snapshot(&self) -> StoreResult<Snapshot>;

    /// Receive a full snapshot after every commit
    fn subscribe(&self) -> SnapshotReceiver;
}
