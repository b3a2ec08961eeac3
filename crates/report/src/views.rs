//! Read views over a snapshot: leaderboard, QR registry and scan trend

use chrono::{Duration, NaiveDate};
use cleancredit_core::{earned_badges, Account, AccountId, BadgeKind, Points};
use cleancredit_ledger::ScanEvent;
use serde::Serialize;

/// One leaderboard line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub account_id: AccountId,
    pub name: String,
    pub balance: Points,
    pub report_count: u32,
    pub badges: Vec<BadgeKind>,
}

/// Claimed accounts by balance, highest first; ties by id
pub fn leaderboard(accounts: &[Account]) -> Vec<LeaderboardRow> {
    let mut claimed: Vec<&Account> = accounts.iter().filter(|a| a.is_claimed()).collect();
    claimed.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.id.cmp(&b.id)));

    claimed
        .into_iter()
        .enumerate()
        .map(|(i, account)| LeaderboardRow {
            rank: i + 1,
            account_id: account.id.clone(),
            name: account.display_name.clone(),
            balance: account.balance,
            report_count: account.report_count,
            badges: earned_badges(account).into_iter().map(|b| b.kind).collect(),
        })
        .collect()
}

#[derive(Serialize)]
struct QrPayload<'a> {
    #[serde(rename = "accountId")]
    account_id: &'a str,
    code: &'a str,
}

/// Payload encoded into an account's QR artifact
pub fn qr_payload(account: &Account) -> String {
    let payload = QrPayload {
        account_id: account.id.as_str(),
        code: account.identity_code.as_str(),
    };
    // Two string fields cannot fail to serialize
    serde_json::to_string(&payload).unwrap_or_default()
}

/// One registry line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryRow {
    pub account_id: AccountId,
    pub label: String,
    pub claimed: bool,
    pub code: String,
    pub payload: String,
}

/// Claimed accounts alphabetically by name, then unclaimed slots by id
pub fn registry(accounts: &[Account]) -> Vec<RegistryRow> {
    let mut rows: Vec<&Account> = accounts.iter().collect();
    rows.sort_by(|a, b| {
        b.is_claimed()
            .cmp(&a.is_claimed())
            .then_with(|| {
                a.display_name
                    .to_lowercase()
                    .cmp(&b.display_name.to_lowercase())
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    rows.into_iter()
        .map(|account| RegistryRow {
            account_id: account.id.clone(),
            label: account.label().to_string(),
            claimed: account.is_claimed(),
            code: account.identity_code.to_string(),
            payload: qr_payload(account),
        })
        .collect()
}

/// Scans on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub scans: usize,
}

/// Daily scan counts for the `days` days ending at `today`, oldest first
pub fn scan_trend(events: &[ScanEvent], days: u32, today: NaiveDate) -> Vec<TrendPoint> {
    (0..i64::from(days))
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let scans = events
                .iter()
                .filter(|e| e.timestamp.date_naive() == date)
                .count();
            TrendPoint { date, scans }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use cleancredit_core::IdentityCode;
    use cleancredit_ledger::{resolve, MatchedBy, TransactionId};

    fn account(id: &str, code: &str, name: &str, balance: u64) -> Account {
        let mut account = Account::unclaimed(
            AccountId::new(id).unwrap(),
            IdentityCode::new(code).unwrap(),
            Points::new(balance),
        );
        if !name.is_empty() {
            account.claim(name).unwrap();
        }
        account
    }

    fn pool() -> Vec<Account> {
        vec![
            account("TAG_001", "8472910384", "Asha", 1030),
            account("TAG_002", "2948571039", "Rahul", 950),
            account("TAG_003", "5019283746", "", 1200),
            account("TAG_004", "3847562910", "bea", 1030),
        ]
    }

    #[test]
    fn test_leaderboard_claimed_only() {
        let rows = leaderboard(&pool());
        let ids: Vec<_> = rows.iter().map(|r| r.account_id.as_str()).collect();

        assert_eq!(ids, vec!["TAG_001", "TAG_004", "TAG_002"]);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[2].balance, Points::new(950));
    }

    #[test]
    fn test_registry_order_and_payload() {
        let accounts = pool();
        let rows = registry(&accounts);
        let labels: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Asha", "bea", "Rahul", "Unclaimed Tag"]);

        assert_eq!(
            rows[0].payload,
            r#"{"accountId":"TAG_001","code":"8472910384"}"#
        );

        // Every payload resolves back to its own account
        for row in &rows {
            let resolved = resolve(&row.payload, &accounts).unwrap();
            assert_eq!(resolved.account.id, row.account_id);
            assert_eq!(resolved.matched_by, MatchedBy::Payload);
        }
    }

    #[test]
    fn test_scan_trend_counts_days() {
        let at = |day: u32, hour: u32| Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap();
        let event = |timestamp| ScanEvent {
            transaction_id: TransactionId::new(),
            timestamp,
            reporter_id: AccountId::new("TAG_001").unwrap(),
            reported_id: AccountId::new("TAG_002").unwrap(),
            waste_category: None,
            reward: Points::new(20),
            penalty: Points::new(50),
            raw_scanned_value: "2948571039".to_string(),
            description: None,
        };
        let events = vec![event(at(14, 9)), event(at(14, 17)), event(at(12, 8)), event(at(1, 8))];

        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let trend = scan_trend(&events, 7, today);

        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, NaiveDate::from_ymd_opt(2026, 3, 8).unwrap());
        assert_eq!(trend[6].scans, 2);
        assert_eq!(trend[4].scans, 1);
        assert_eq!(trend.iter().map(|p| p.scans).sum::<usize>(), 3);
    }
}
