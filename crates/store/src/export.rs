//! JSONL audit export
//!
//! Writes every scan event followed by its ledger entries, oldest first, one
//! JSON object per line. The SHA-256 digest of the written bytes lets an
//! auditor verify the file later.

use crate::error::StoreResult;
use crate::traits::LedgerStore;
use cleancredit_ledger::{LedgerEntry, ScanEvent, TransactionId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum AuditRecord<'a> {
    ScanEvent(&'a ScanEvent),
    LedgerEntry(&'a LedgerEntry),
}

/// What an export wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub scan_events: usize,
    pub ledger_entries: usize,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Export the full audit trail of `store` to `path`, replacing any existing file
pub async fn export_audit<S>(store: &S, path: impl AsRef<Path>) -> StoreResult<ExportSummary>
where
    S: LedgerStore + ?Sized,
{
    let path = path.as_ref();
    let snapshot = store.snapshot().await?;

    let mut by_transaction: HashMap<TransactionId, Vec<&LedgerEntry>> = HashMap::new();
    for entry in &snapshot.ledger_entries {
        by_transaction.entry(entry.transaction_id).or_default().push(entry);
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let mut hasher = Sha256::new();
    let mut write_line = |record: AuditRecord<'_>| -> StoreResult<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        hasher.update(line.as_bytes());
        writer.write_all(line.as_bytes())?;
        Ok(())
    };

    let mut entries_written = 0;
    for event in snapshot.scan_events.iter().rev() {
        write_line(AuditRecord::ScanEvent(event))?;
        for entry in by_transaction.remove(&event.transaction_id).unwrap_or_default() {
            write_line(AuditRecord::LedgerEntry(entry))?;
            entries_written += 1;
        }
    }

    // Entries without a scan event still belong in the audit trail
    let mut leftovers: Vec<&LedgerEntry> = by_transaction.into_values().flatten().collect();
    leftovers.sort_by_key(|e| e.timestamp);
    for entry in leftovers {
        write_line(AuditRecord::LedgerEntry(entry))?;
        entries_written += 1;
    }

    writer.flush()?;
    let summary = ExportSummary {
        path: path.to_path_buf(),
        scan_events: snapshot.scan_events.len(),
        ledger_entries: entries_written,
        sha256: hex::encode(hasher.finalize()),
    };
    info!(
        path = %path.display(),
        scan_events = summary.scan_events,
        ledger_entries = summary.ledger_entries,
        "Audit export written"
    );
    Ok(summary)
}

/// SHA-256 of a file, hex encoded
pub fn file_digest(path: impl AsRef<Path>) -> StoreResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
