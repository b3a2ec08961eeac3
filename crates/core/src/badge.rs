//! Achievement badges derived from an account's reports and balance

use crate::account::Account;
use crate::points::Points;
use serde::Serialize;
use strum_macros::{Display, EnumIter};

/// What a badge threshold is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumIter)]
pub enum BadgeKind {
    #[strum(serialize = "Eagle Eye")]
    EagleEye,
    #[strum(serialize = "Campus Guardian")]
    CampusGuardian,
    #[strum(serialize = "Waste Warrior")]
    WasteWarrior,
    #[strum(serialize = "Eco Legend")]
    EcoLegend,
}

/// A badge definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub kind: BadgeKind,
    pub description: &'static str,
    pub threshold: u64,
}

impl BadgeKind {
    pub fn badge(self) -> Badge {
        match self {
            BadgeKind::EagleEye => Badge {
                kind: self,
                description: "Report 1 litterer",
                threshold: 1,
            },
            BadgeKind::CampusGuardian => Badge {
                kind: self,
                description: "Report 5 litterers",
                threshold: 5,
            },
            BadgeKind::WasteWarrior => Badge {
                kind: self,
                description: "Report 10 litterers",
                threshold: 10,
            },
            BadgeKind::EcoLegend => Badge {
                kind: self,
                description: "Maintain 1200 points or more",
                threshold: 1200,
            },
        }
    }
}

impl Badge {
    pub fn is_earned_by(&self, account: &Account) -> bool {
        match self.kind {
            BadgeKind::EcoLegend => account.balance >= Points::new(self.threshold),
            _ => u64::from(account.report_count) >= self.threshold,
        }
    }
}

/// Badges the account currently holds, in catalogue order
pub fn earned_badges(account: &Account) -> Vec<Badge> {
    use strum::IntoEnumIterator;

    BadgeKind::iter()
        .map(BadgeKind::badge)
        .filter(|badge| badge.is_earned_by(account))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountId, IdentityCode};

    fn account(balance: u64, reports: u32) -> Account {
        let mut account = Account::unclaimed(
            AccountId::new("TAG_001").unwrap(),
            IdentityCode::new("8472910384").unwrap(),
            Points::new(balance),
        );
        account.report_count = reports;
        account
    }

    #[test]
    fn test_no_badges_for_fresh_slot() {
        assert!(earned_badges(&account(1000, 0)).is_empty());
    }

    #[test]
    fn test_report_badges() {
        let kinds: Vec<_> = earned_badges(&account(1000, 5))
            .into_iter()
            .map(|b| b.kind)
            .collect();
        assert_eq!(kinds, vec![BadgeKind::EagleEye, BadgeKind::CampusGuardian]);
    }

    #[test]
    fn test_eco_legend_uses_balance() {
        let kinds: Vec<_> = earned_badges(&account(1200, 0))
            .into_iter()
            .map(|b| b.kind)
            .collect();
        assert_eq!(kinds, vec![BadgeKind::EcoLegend]);
        assert_eq!(BadgeKind::EcoLegend.to_string(), "Eco Legend");
    }
}
