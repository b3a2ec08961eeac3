//! Waste classification attached to a report

use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-empty, trimmed waste classification ("Plastic", "Paper", ...).
///
/// Classification is free text. Its presence is what earns the sorting bonus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WasteCategory(String);

impl WasteCategory {
    /// Returns `None` for missing or blank input
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
