//! Account - Pre-provisioned identity slots
//!
//! Every slot exists from provisioning onwards. A slot is "unclaimed" while its
//! display name is empty; claiming only sets the name.

use crate::error::{CoreError, CoreResult};
use crate::points::Points;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Codes printed on the first ten identity tags.
pub const DEFAULT_IDENTITY_CODES: [&str; 10] = [
    "8472910384",
    "2948571039",
    "5019283746",
    "3847562910",
    "1029384756",
    "9384756102",
    "4756102938",
    "7561029384",
    "6102938475",
    "2039485716",
];

/// Stable slot identifier (TAG_001, TAG_002, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap an existing identifier. Surrounding whitespace is removed.
    pub fn new(id: impl Into<String>) -> CoreResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidAccountId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Generate the identifier for the n-th slot
    pub fn generate(prefix: &str, counter: u32) -> Self {
        Self(format!("{}_{:03}", prefix, counter))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The 10-digit code embedded in a slot's QR artifact.
///
/// # Invariant
/// Always exactly ten ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityCode(String);

impl IdentityCode {
    pub const LEN: usize = 10;

    pub fn new(code: impl Into<String>) -> CoreResult<Self> {
        let code = code.into();
        if code.len() == Self::LEN && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code))
        } else {
            Err(CoreError::InvalidIdentityCode(code))
        }
    }

    /// Draw a random code with a non-zero leading digit
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let value: u64 = rng.gen_range(1_000_000_000..=9_999_999_999);
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdentityCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdentityCode> for String {
    fn from(code: IdentityCode) -> Self {
        code.0
    }
}

impl fmt::Display for IdentityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An identity slot.
///
/// Serialized with the persisted field names:
/// `{id, name, code, points, violationHistory[], scanCount}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Slot identifier, never reused
    pub id: AccountId,

    /// Empty until the slot is claimed
    #[serde(rename = "name")]
    pub display_name: String,

    /// Code printed on the tag
    #[serde(rename = "code")]
    pub identity_code: IdentityCode,

    /// Cached balance: seed + credits - debits
    #[serde(rename = "points")]
    pub balance: Points,

    /// Violations this account has reported
    #[serde(rename = "scanCount")]
    pub report_count: u32,

    /// One note per violation charged to this account, oldest first
    #[serde(rename = "violationHistory", default)]
    pub violation_notes: Vec<String>,
}

impl Account {
    /// Create an unclaimed slot
    pub fn unclaimed(id: AccountId, identity_code: IdentityCode, balance: Points) -> Self {
        Self {
            id,
            display_name: String::new(),
            identity_code,
            balance,
            report_count: 0,
            violation_notes: Vec::new(),
        }
    }

    pub fn is_claimed(&self) -> bool {
        !self.display_name.is_empty()
    }

    /// Set the display name.
    ///
    /// Returns `true` when the stored name changed. Claiming again with a
    /// different name renames the slot; claiming with the same name is a no-op.
    pub fn claim(&mut self, name: &str) -> CoreResult<bool> {
        let name = normalize_display_name(name)?;
        if self.display_name == name {
            return Ok(false);
        }
        self.display_name = name;
        Ok(true)
    }

    /// Name for display, falling back for unclaimed slots
    pub fn label(&self) -> &str {
        if self.is_claimed() {
            &self.display_name
        } else {
            "Unclaimed Tag"
        }
    }

    /// Build the initial slot pool.
    ///
    /// The first ten slots use `DEFAULT_IDENTITY_CODES`; further slots draw
    /// unique random codes.
    pub fn provision_pool<R: Rng + ?Sized>(
        prefix: &str,
        count: u32,
        initial_balance: Points,
        rng: &mut R,
    ) -> CoreResult<Vec<Account>> {
        let mut seen: HashSet<IdentityCode> = HashSet::new();
        let mut accounts = Vec::with_capacity(count as usize);

        for counter in 1..=count {
            let code = match DEFAULT_IDENTITY_CODES.get(counter as usize - 1) {
                Some(code) => IdentityCode::new(*code)?,
                None => loop {
                    let candidate = IdentityCode::random(rng);
                    if !seen.contains(&candidate) {
                        break candidate;
                    }
                },
            };
            if !seen.insert(code.clone()) {
                return Err(CoreError::DuplicateIdentityCode(code.to_string()));
            }
            accounts.push(Account::unclaimed(
                AccountId::generate(prefix, counter),
                code,
                initial_balance,
            ));
        }

        Ok(accounts)
    }
}

/// Trim a requested display name, rejecting blank input
pub fn normalize_display_name(name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::EmptyDisplayName);
    }
    Ok(trimmed.to_string())
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} ({} pts, {} reports)",
            self.id,
            self.identity_code,
            self.label(),
            self.balance,
            self.report_count
        )
    }
}
