//! CleanCredit Core - Domain types shared by every crate
//!
//! # Key Types
//! - `Points`: Non-negative integer point amount
//! - `AccountId` / `IdentityCode`: Slot identifier and the 10-digit code printed on its tag
//! - `Account`: A pre-provisioned identity slot with its cached balance
//! - `WasteCategory`: Optional classification attached to a report
//! - `CleanCreditConfig`: Scoring, provisioning, store and view settings

pub mod account;
pub mod badge;
pub mod config;
pub mod error;
pub mod points;
pub mod waste;

pub use account::{Account, AccountId, IdentityCode, DEFAULT_IDENTITY_CODES};
pub use badge::{earned_badges, Badge, BadgeKind};
pub use config::{
    CleanCreditConfig, ProvisioningConfig, ScoringPolicy, StoreConfig, ViewConfig,
};
pub use error::{CoreError, CoreResult};
pub use points::Points;
pub use waste::WasteCategory;
