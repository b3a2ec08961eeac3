//! Change feed - push full store contents to subscribers after every commit

use crate::traits::Snapshot;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Receiver type for snapshots
pub type SnapshotReceiver = broadcast::Receiver<Arc<Snapshot>>;

/// Default number of snapshots buffered per subscriber
pub const FEED_CAPACITY: usize = 64;

/// In-memory change feed using a tokio broadcast channel
pub struct ChangeFeed {
    tx: broadcast::Sender<Arc<Snapshot>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::with_capacity(FEED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }

    /// Publish a snapshot; returns how many subscribers received it
    pub fn publish(&self, snapshot: Snapshot) -> usize {
        let revision = snapshot.revision;
        match self.tx.send(Arc::new(snapshot)) {
            Ok(count) => count,
            Err(_) => {
                debug!(revision, "Snapshot published with no subscribers");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
