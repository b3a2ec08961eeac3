//! Violation validation
//!
//! Turns a resolution outcome into either a [`PendingViolation`] awaiting
//! confirmation or a [`Rejection`] carrying a user-facing message. Nothing
//! here touches balances.

use crate::resolver::decode_scan_value;
use chrono::{DateTime, Utc};
use cleancredit_core::{Account, AccountId, WasteCategory};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the reporter supplied alongside the scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDetails {
    pub raw_scanned_value: String,
    pub description: Option<String>,
    pub waste_category: Option<WasteCategory>,
}

impl ReportDetails {
    pub fn new(raw_scanned_value: impl Into<String>) -> Self {
        Self {
            raw_scanned_value: raw_scanned_value.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_waste_category(mut self, category: Option<&str>) -> Self {
        self.waste_category = WasteCategory::parse(category);
        self
    }
}

/// A validated report awaiting explicit confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingViolation {
    pub reporter_id: AccountId,
    pub reported_id: AccountId,
    /// Label of the reported account when the report was proposed
    pub reported_label: String,
    pub raw_scanned_value: String,
    pub description: Option<String>,
    pub waste_category: Option<WasteCategory>,
    pub proposed_at: DateTime<Utc>,
}

impl PendingViolation {
    pub fn is_classified(&self) -> bool {
        self.waste_category.is_some()
    }
}

/// Why a report was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("ID Code {code} is not recognized in the campus database.")]
    UnknownCode { code: String },

    #[error("Accountability Paradox: You cannot report your own pre-assigned tag.")]
    SelfReportNotAllowed { account_id: AccountId },
}

/// Check a resolved report against the reporter.
///
/// `resolved` is the account the scan resolved to, if any.
pub fn validate(
    reporter_id: &AccountId,
    resolved: Option<&Account>,
    details: ReportDetails,
) -> Result<PendingViolation, Rejection> {
    let Some(reported) = resolved else {
        let code = decode_scan_value(&details.raw_scanned_value)
            .trim()
            .to_string();
        tracing::warn!(reporter = %reporter_id, code = %code, "Report rejected: unknown code");
        return Err(Rejection::UnknownCode { code });
    };

    if &reported.id == reporter_id {
        tracing::warn!(reporter = %reporter_id, "Report rejected: self report");
        return Err(Rejection::SelfReportNotAllowed {
            account_id: reporter_id.clone(),
        });
    }

    Ok(PendingViolation {
        reporter_id: reporter_id.clone(),
        reported_id: reported.id.clone(),
        reported_label: reported.label().to_string(),
        raw_scanned_value: details.raw_scanned_value,
        description: details.description,
        waste_category: details.waste_category,
        proposed_at: Utc::now(),
    })
}
