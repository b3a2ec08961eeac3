//! In-memory store
//!
//! Each account sits behind its own mutex. A settlement locks exactly its two
//! accounts, always in id order, so settlements on unrelated accounts run in
//! parallel and settlements sharing an account serialize. A commit gate keeps
//! snapshots from observing a half-applied settlement.

use crate::error::{StoreError, StoreResult};
use crate::feed::{ChangeFeed, SnapshotReceiver};
use crate::traits::{LedgerStore, Snapshot};
use async_trait::async_trait;
use chrono::Utc;
use cleancredit_core::{Account, AccountId, Points, ScoringPolicy};
use cleancredit_ledger::{
    LedgerEntry, PendingViolation, ScanEvent, SettlementPlan, SettlementResult,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

type Slot = Arc<Mutex<Account>>;

#[derive(Default)]
struct Log {
    revision: u64,
    scan_events: Vec<ScanEvent>,
    ledger_entries: Vec<LedgerEntry>,
}

/// Store holding everything in process memory
pub struct MemoryStore {
    slots: RwLock<BTreeMap<AccountId, Slot>>,
    seeds: RwLock<BTreeMap<AccountId, Points>>,
    log: Mutex<Log>,
    /// Settlements hold it shared, snapshots exclusive
    commit_gate: RwLock<()>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(BTreeMap::new()),
            seeds: RwLock::new(BTreeMap::new()),
            log: Mutex::new(Log::default()),
            commit_gate: RwLock::new(()),
            feed: ChangeFeed::new(),
        }
    }

    fn slot(&self, id: &AccountId) -> StoreResult<Option<Slot>> {
        Ok(read(&self.slots)?.get(id).cloned())
    }

    fn bump_revision(&self) -> StoreResult<()> {
        lock(&self.log)?.revision += 1;
        Ok(())
    }

    fn collect_snapshot(&self) -> StoreResult<Snapshot> {
        let _gate = write(&self.commit_gate)?;
        let accounts = read(&self.slots)?
            .values()
            .map(|slot| lock(slot).map(|a| a.clone()))
            .collect::<StoreResult<Vec<_>>>()?;
        let log = lock(&self.log)?;

        Ok(Snapshot {
            revision: log.revision,
            accounts,
            scan_events: log.scan_events.iter().rev().cloned().collect(),
            ledger_entries: log.ledger_entries.clone(),
        })
    }

    fn publish(&self) -> StoreResult<()> {
        let snapshot = self.collect_snapshot()?;
        self.feed.publish(snapshot);
        Ok(())
    }

    fn settle_locked(
        &self,
        pending: &PendingViolation,
        policy: &ScoringPolicy,
    ) -> StoreResult<SettlementResult> {
        let _gate = read(&self.commit_gate)?;

        let reporter_slot = self
            .slot(&pending.reporter_id)?
            .ok_or_else(|| StoreError::account_missing(&pending.reporter_id))?;
        let reported_slot = self
            .slot(&pending.reported_id)?
            .ok_or_else(|| StoreError::account_missing(&pending.reported_id))?;
        if Arc::ptr_eq(&reporter_slot, &reported_slot) {
            return Err(cleancredit_ledger::LedgerError::SelfSettlement(
                pending.reporter_id.clone(),
            )
            .into());
        }

        // Lock order: ascending account id
        let (mut reporter, mut reported) = if pending.reporter_id < pending.reported_id {
            let reporter = lock(&reporter_slot)?;
            let reported = lock(&reported_slot)?;
            (reporter, reported)
        } else {
            let reported = lock(&reported_slot)?;
            let reporter = lock(&reporter_slot)?;
            (reporter, reported)
        };

        let plan = SettlementPlan::build(pending, policy, &reporter, &reported, Utc::now())?;

        let mut log = lock(&self.log)?;
        plan.apply(&mut reporter, &mut reported)?;
        log.scan_events.push(plan.result.scan_event.clone());
        log.ledger_entries.push(plan.result.credit.clone());
        log.ledger_entries.push(plan.result.debit.clone());
        log.revision += 1;

        Ok(plan.result)
    }

    #[cfg(test)]
    fn remove(&self, id: &AccountId) -> StoreResult<()> {
        write(&self.slots)?.remove(id);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> StoreResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn provision(&self, accounts: Vec<Account>) -> StoreResult<usize> {
        {
            let mut slots = write(&self.slots)?;
            if !slots.is_empty() {
                return Err(StoreError::AlreadyProvisioned(slots.len()));
            }
            let mut seeds = write(&self.seeds)?;
            for account in accounts {
                seeds.insert(account.id.clone(), account.balance);
                slots.insert(account.id.clone(), Arc::new(Mutex::new(account)));
            }
            info!(count = slots.len(), "Provisioned account pool");
        }
        self.bump_revision()?;
        self.publish()?;
        Ok(read(&self.slots)?.len())
    }

    async fn accounts(&self) -> StoreResult<Vec<Account>> {
        read(&self.slots)?
            .values()
            .map(|slot| lock(slot).map(|a| a.clone()))
            .collect()
    }

    async fn account(&self, id: &AccountId) -> StoreResult<Account> {
        let slot = self
            .slot(id)?
            .ok_or_else(|| StoreError::not_found("Account", id.as_str()))?;
        let account = lock(&slot)?.clone();
        Ok(account)
    }

    async fn claim(&self, id: &AccountId, display_name: &str) -> StoreResult<Account> {
        let slot = self
            .slot(id)?
            .ok_or_else(|| StoreError::not_found("Account", id.as_str()))?;
        let (account, changed) = {
            let _gate = read(&self.commit_gate)?;
            let mut account = lock(&slot)?;
            let changed = account.claim(display_name)?;
            (account.clone(), changed)
        };

        if changed {
            info!(account = %id, name = %account.display_name, "Account claimed");
            self.bump_revision()?;
            self.publish()?;
        }
        Ok(account)
    }

    async fn settle(
        &self,
        pending: &PendingViolation,
        policy: &ScoringPolicy,
    ) -> StoreResult<SettlementResult> {
        let result = self.settle_locked(pending, policy)?;
        info!(
            tx = %result.transaction_id(),
            reporter = %pending.reporter_id,
            reported = %pending.reported_id,
            reward = %result.credit.amount,
            penalty = %result.debit.amount,
            "Settlement committed"
        );
        self.publish()?;
        Ok(result)
    }

    async fn ledger_entries(&self) -> StoreResult<Vec<LedgerEntry>> {
        Ok(lock(&self.log)?.ledger_entries.clone())
    }

    async fn scan_events(&self) -> StoreResult<Vec<ScanEvent>> {
        Ok(lock(&self.log)?.scan_events.iter().rev().cloned().collect())
    }

    async fn seed_balances(&self) -> StoreResult<BTreeMap<AccountId, Points>> {
        Ok(read(&self.seeds)?.clone())
    }

    async fn snapshot(&self) -> StoreResult<Snapshot> {
        self.collect_snapshot()
    }

    fn subscribe(&self) -> SnapshotReceiver {
        self.feed.subscribe()
    }
}
