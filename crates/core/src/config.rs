//! CleanCredit configuration
//!
//! Every value has a default; a JSON file only needs to name what it overrides.

use crate::error::{CoreError, CoreResult};
use crate::points::Points;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanCreditConfig {
    #[serde(default)]
    pub scoring: ScoringPolicy,

    #[serde(default)]
    pub provisioning: ProvisioningConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub views: ViewConfig,
}

/// Reward and penalty amounts applied by settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Credited to the reporter for every settled report
    #[serde(default = "default_reward_base")]
    pub reward_base: Points,

    /// Extra credit when the report carries a waste classification
    #[serde(default = "default_sorting_bonus")]
    pub sorting_bonus: Points,

    /// Debited from the reported party, floored at zero
    #[serde(default = "default_penalty")]
    pub penalty: Points,
}

/// Initial slot pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default = "default_slot_count")]
    pub slot_count: u32,

    #[serde(default = "default_initial_balance")]
    pub initial_balance: Points,

    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

/// SQLite store tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long SQLite waits on a locked database before reporting busy
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Attempts for one settlement before giving up with a conflict
    #[serde(default = "default_max_settle_attempts")]
    pub max_settle_attempts: u32,

    /// Linear backoff step between settlement attempts
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Read-side view settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_recent_entries")]
    pub recent_entries: usize,

    #[serde(default = "default_trend_days")]
    pub trend_days: u32,
}

fn default_reward_base() -> Points {
    Points::new(20)
}

fn default_sorting_bonus() -> Points {
    Points::new(10)
}

fn default_penalty() -> Points {
    Points::new(50)
}

fn default_slot_count() -> u32 {
    10
}

fn default_initial_balance() -> Points {
    Points::new(1000)
}

fn default_id_prefix() -> String {
    "TAG".to_string()
}

fn default_max_connections() -> u32 {
    4
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_max_settle_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    20
}

fn default_recent_entries() -> usize {
    10
}

fn default_trend_days() -> u32 {
    7
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            reward_base: default_reward_base(),
            sorting_bonus: default_sorting_bonus(),
            penalty: default_penalty(),
        }
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            initial_balance: default_initial_balance(),
            id_prefix: default_id_prefix(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
            max_settle_attempts: default_max_settle_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            recent_entries: default_recent_entries(),
            trend_days: default_trend_days(),
        }
    }
}

impl ScoringPolicy {
    pub fn new(reward_base: u64, sorting_bonus: u64, penalty: u64) -> Self {
        Self {
            reward_base: Points::new(reward_base),
            sorting_bonus: Points::new(sorting_bonus),
            penalty: Points::new(penalty),
        }
    }

    /// Reward for a report, with the bonus only when it was classified
    pub fn reward_for(&self, classified: bool) -> CoreResult<Points> {
        if classified {
            self.reward_base.checked_add(self.sorting_bonus)
        } else {
            Ok(self.reward_base)
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Delay before the given (1-based) retry
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

impl CleanCreditConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Reject settings the system cannot run with
    pub fn validate(&self) -> CoreResult<()> {
        if self.provisioning.slot_count == 0 {
            return Err(CoreError::InvalidConfig(
                "provisioning.slot_count must be at least 1".to_string(),
            ));
        }
        if self.provisioning.slot_count > 999_999 {
            return Err(CoreError::InvalidConfig(
                "provisioning.slot_count is too large".to_string(),
            ));
        }
        if self.provisioning.id_prefix.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "provisioning.id_prefix cannot be empty".to_string(),
            ));
        }
        if self.scoring.reward_base.is_zero() {
            return Err(CoreError::InvalidConfig(
                "scoring.reward_base must be at least 1".to_string(),
            ));
        }
        if self.scoring.penalty.is_zero() {
            return Err(CoreError::InvalidConfig(
                "scoring.penalty must be at least 1".to_string(),
            ));
        }
        if self.store.max_settle_attempts == 0 {
            return Err(CoreError::InvalidConfig(
                "store.max_settle_attempts must be at least 1".to_string(),
            ));
        }
        if self.store.max_connections == 0 {
            return Err(CoreError::InvalidConfig(
                "store.max_connections must be at least 1".to_string(),
            ));
        }
        if self.views.trend_days == 0 {
            return Err(CoreError::InvalidConfig(
                "views.trend_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CleanCreditConfig::default();

        assert_eq!(config.scoring.reward_base, Points::new(20));
        assert_eq!(config.scoring.sorting_bonus, Points::new(10));
        assert_eq!(config.scoring.penalty, Points::new(50));
        assert_eq!(config.provisioning.slot_count, 10);
        assert_eq!(config.provisioning.initial_balance, Points::new(1000));
        assert_eq!(config.provisioning.id_prefix, "TAG");
        assert_eq!(config.store.max_settle_attempts, 5);
        assert_eq!(config.views.recent_entries, 10);
        assert_eq!(config.views.trend_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reward_for() {
        let policy = ScoringPolicy::default();
        assert_eq!(policy.reward_for(true).unwrap(), Points::new(30));
        assert_eq!(policy.reward_for(false).unwrap(), Points::new(20));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "scoring": { "penalty": 75 }, "provisioning": { "slot_count": 25 } }"#;
        let config: CleanCreditConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.scoring.penalty, Points::new(75));
        assert_eq!(config.scoring.reward_base, Points::new(20));
        assert_eq!(config.provisioning.slot_count, 25);
        assert_eq!(config.provisioning.initial_balance, Points::new(1000));
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "views": {{ "trend_days": 14 }} }}"#).unwrap();

        let config = CleanCreditConfig::from_file(file.path()).unwrap();
        assert_eq!(config.views.trend_days, 14);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let err = CleanCreditConfig::from_file(bad.path()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = CleanCreditConfig::default();
        config.provisioning.slot_count = 0;
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let mut config = CleanCreditConfig::default();
        config.store.max_settle_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = CleanCreditConfig::default();
        config.scoring.reward_base = Points::ZERO;
        assert!(config.validate().is_err());

        let mut config = CleanCreditConfig::default();
        config.scoring.penalty = Points::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_backoff_is_linear() {
        let store = StoreConfig::default();
        assert_eq!(store.retry_backoff(1), Duration::from_millis(20));
        assert_eq!(store.retry_backoff(3), Duration::from_millis(60));
    }
}
