//! CLI commands

use anyhow::Context;
use chrono::Utc;
use cleancredit_core::{earned_badges, Account, AccountId};
use cleancredit_ledger::{
    project, reconcile as reconcile_ledger, PendingViolation, ReconciliationReport,
    SettlementResult,
};
use cleancredit_report::{
    leaderboard as leaderboard_rows, registry as registry_rows, scan_trend, success_message,
    Frame, ReportInput,
};
use cleancredit_store::{export_audit, ExportSummary, StoreError};
use std::path::Path;
use tracing::info;

use crate::context::AppContext;

fn parse_id(raw: &str) -> Result<AccountId, anyhow::Error> {
    AccountId::new(raw).with_context(|| format!("Invalid account id '{}'", raw))
}

/// Provision the identity slot pool; returns how many slots were created
pub async fn init(ctx: &AppContext) -> Result<usize, anyhow::Error> {
    let provisioning = &ctx.config.provisioning;
    let pool = Account::provision_pool(
        &provisioning.id_prefix,
        provisioning.slot_count,
        provisioning.initial_balance,
        &mut rand::thread_rng(),
    )?;

    match ctx.store().provision(pool).await {
        Ok(count) => {
            println!(
                "✅ Provisioned {} slots with {} PTS each",
                count, provisioning.initial_balance
            );
            Ok(count)
        }
        Err(StoreError::AlreadyProvisioned(existing)) => {
            info!(slots = existing, "Slot pool already provisioned");
            println!("Ledger already provisioned ({} slots), nothing to do", existing);
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

/// List every slot
pub async fn accounts(ctx: &AppContext) -> Result<Vec<Account>, anyhow::Error> {
    let accounts = ctx.store().accounts().await?;
    if accounts.is_empty() {
        println!("No accounts. Run `cleancredit init` first.");
    }
    for account in &accounts {
        println!("{}", account);
    }
    Ok(accounts)
}

/// Attach a display name to a slot
pub async fn claim(ctx: &AppContext, id: &str, name: &str) -> Result<Account, anyhow::Error> {
    let id = parse_id(id)?;
    let account = ctx.store().claim(&id, name).await?;
    println!("✅ {} is now {}", account.id, account.label());
    Ok(account)
}

/// Report a scanned value.
///
/// `confirm` sees the pending violation and decides whether to settle it;
/// returns `None` when the reporter declines.
pub async fn scan<F>(
    ctx: &AppContext,
    reporter: &str,
    raw: &str,
    input: ReportInput,
    confirm: F,
) -> Result<Option<SettlementResult>, anyhow::Error>
where
    F: FnOnce(&PendingViolation) -> Result<bool, anyhow::Error>,
{
    let reporter = parse_id(reporter)?;
    let service = ctx.report_service().await?;
    let mut session = service.session(&reporter)?;

    let pending = service.propose(&mut session, &Frame::manual(raw), &input)?;
    if !confirm(&pending)? {
        session.cancel()?;
        println!("Report against {} cancelled", pending.reported_label);
        return Ok(None);
    }

    let result = service.confirm(&mut session).await?;
    println!("✅ {}", success_message(&pending.reported_label, &result));
    println!("   tx: {}", result.transaction_id());
    Ok(Some(result))
}

/// Show an account's ledger history
pub async fn ledger(ctx: &AppContext, id: &str, limit: usize) -> Result<(), anyhow::Error> {
    let id = parse_id(id)?;
    let store = ctx.store();
    let account = store.account(&id).await?;
    let entries = store.ledger_entries().await?;
    let projection = project(&entries, &id, limit);

    println!("{}", account);
    println!(
        "Credits: {}  Debits: {}",
        projection.total_credits, projection.total_debits
    );
    if !account.violation_notes.is_empty() {
        println!("Violations:");
        for note in &account.violation_notes {
            println!("  - {}", note);
        }
    }
    if projection.recent_entries.is_empty() {
        println!("No ledger entries");
    }
    for entry in &projection.recent_entries {
        println!("  {}", entry);
    }
    Ok(())
}

/// Rank claimed accounts by balance
pub async fn leaderboard(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let accounts = ctx.store().accounts().await?;
    let rows = leaderboard_rows(&accounts);
    if rows.is_empty() {
        println!("No claimed accounts yet");
    }
    for row in rows {
        let badges: Vec<String> = row.badges.iter().map(ToString::to_string).collect();
        println!(
            "{:>3}. {:<20} {:>6} PTS  {:>3} reports  {}",
            row.rank,
            row.name,
            row.balance,
            row.report_count,
            badges.join(", ")
        );
    }
    Ok(())
}

/// Print each slot's code and QR payload
pub async fn registry(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let accounts = ctx.store().accounts().await?;
    for row in registry_rows(&accounts) {
        println!(
            "{:<10} {:<20} {}  {}",
            row.account_id.as_str(),
            row.label,
            row.code,
            row.payload
        );
    }
    Ok(())
}

/// List the badges an account holds
pub async fn badges(ctx: &AppContext, id: &str) -> Result<(), anyhow::Error> {
    let id = parse_id(id)?;
    let account = ctx.store().account(&id).await?;
    let badges = earned_badges(&account);
    if badges.is_empty() {
        println!("{} has no badges yet", account.label());
    }
    for badge in badges {
        println!("🏅 {} - {}", badge.kind, badge.description);
    }
    Ok(())
}

/// Daily scan counts for the configured window
pub async fn trend(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let events = ctx.store().scan_events().await?;
    let today = Utc::now().date_naive();
    for point in scan_trend(&events, ctx.config.views.trend_days, today) {
        println!("{}  {:>4}  {}", point.date, point.scans, "#".repeat(point.scans));
    }
    Ok(())
}

/// Check cached balances against the ledger
pub async fn reconcile(ctx: &AppContext) -> Result<ReconciliationReport, anyhow::Error> {
    let snapshot = ctx.store().snapshot().await?;
    let seeds = ctx.store().seed_balances().await?;
    let report = reconcile_ledger(&snapshot.accounts, &seeds, &snapshot.ledger_entries);

    println!(
        "Checked {} accounts, {} entries",
        report.accounts_checked, report.entries_checked
    );
    for divergence in &report.divergences {
        println!("❌ {}", divergence);
    }
    for account in &report.orphan_entries {
        println!("❌ Entries reference unknown account {}", account);
    }
    for tx in &report.unbalanced_transactions {
        println!("❌ Transaction {} is not a credit/debit pair", tx);
    }
    if report.is_consistent() {
        println!("✅ Ledger is consistent");
    }
    Ok(report)
}

/// Write the audit trail as JSON lines
pub async fn export(ctx: &AppContext, path: &Path) -> Result<ExportSummary, anyhow::Error> {
    let summary = export_audit(ctx.store().as_ref(), path).await?;
    println!(
        "✅ Exported {} scan events and {} ledger entries to {}",
        summary.scan_events,
        summary.ledger_entries,
        summary.path.display()
    );
    println!("   sha256: {}", summary.sha256);
    Ok(summary)
}
