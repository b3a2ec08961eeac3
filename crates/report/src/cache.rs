//! Read-only account cache kept current by the store's change feed
//!
//! Serves the resolver and the read views. It is never the system of
//! record: settlement re-reads both accounts inside its own transaction.

use cleancredit_core::Account;
use cleancredit_store::{LedgerStore, Snapshot, StoreResult};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct AccountCache {
    current: watch::Receiver<Arc<Snapshot>>,
    task: JoinHandle<()>,
}

impl AccountCache {
    /// Load the current snapshot and follow the store's change feed
    pub async fn start<S>(store: Arc<S>) -> StoreResult<Self>
    where
        S: LedgerStore + ?Sized + 'static,
    {
        // Subscribe first so no commit slips between load and follow
        let mut feed = store.subscribe();
        let initial = Arc::new(store.snapshot().await?);
        let (tx, rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(snapshot) => publish_if_newer(&tx, snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Account cache lagged, reloading");
                        match store.snapshot().await {
                            Ok(snapshot) => publish_if_newer(&tx, Arc::new(snapshot)),
                            Err(e) => warn!(error = %e, "Account cache reload failed"),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Account cache feed closed");
        });

        Ok(Self { current: rx, task })
    }

    /// Latest snapshot seen
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.borrow().clone()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.current.borrow().accounts.clone()
    }

    pub fn revision(&self) -> u64 {
        self.current.borrow().revision
    }

    /// Wait until the cache holds at least `revision`
    pub async fn wait_for(&self, revision: u64) -> Arc<Snapshot> {
        let mut rx = self.current.clone();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.revision >= revision || rx.changed().await.is_err() {
                return snapshot;
            }
        }
    }
}

impl Drop for AccountCache {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn publish_if_newer(tx: &watch::Sender<Arc<Snapshot>>, snapshot: Arc<Snapshot>) {
    tx.send_if_modified(|current| {
        if snapshot.revision >= current.revision {
            *current = snapshot;
            true
        } else {
            false
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleancredit_core::{AccountId, IdentityCode, Points};
    use cleancredit_store::MemoryStore;

    #[tokio::test]
    async fn test_cache_follows_commits() {
        let store = Arc::new(MemoryStore::new());
        store
            .provision(vec![Account::unclaimed(
                AccountId::new("TAG_001").unwrap(),
                IdentityCode::new("8472910384").unwrap(),
                Points::new(1000),
            )])
            .await
            .unwrap();

        let cache = AccountCache::start(Arc::clone(&store)).await.unwrap();
        assert_eq!(cache.accounts().len(), 1);
        let before = cache.revision();

        store
            .claim(&AccountId::new("TAG_001").unwrap(), "Asha")
            .await
            .unwrap();

        let snapshot = cache.wait_for(before + 1).await;
        assert_eq!(snapshot.accounts[0].display_name, "Asha");
    }
}
