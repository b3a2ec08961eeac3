//! CleanCredit Store - Transactional persistence for the points ledger
//!
//! ## Backends
//!
//! - [`SqliteStore`]: SQLite file via sqlx, optimistic settlement transactions
//!   with bounded retry
//! - [`MemoryStore`]: per-account locks in process memory
//!
//! Both implement [`LedgerStore`] and publish a full [`Snapshot`] on their
//! [`ChangeFeed`] after every commit.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cleancredit_store::{LedgerStore, SqliteStore};
//!
//! let store = SqliteStore::open("data/cleancredit.db", &config.store).await?;
//! let result = store.settle(&pending, &config.scoring).await?;
//! ```

pub mod error;
pub mod export;
pub mod feed;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use export::{export_audit, file_digest, ExportSummary};
pub use feed::{ChangeFeed, SnapshotReceiver};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{LedgerStore, Snapshot};
