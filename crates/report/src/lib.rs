//! CleanCredit Report - The reporting flow around the ledger
//!
//! A frame is decoded by a [`DecoderChain`], resolved against the
//! [`AccountCache`], validated into a pending violation by a
//! [`ReportSession`] and only settled after explicit confirmation.
//! [`views`] renders leaderboard, QR registry and trend data from snapshots.

pub mod cache;
pub mod decoder;
pub mod error;
pub mod service;
pub mod session;
pub mod views;

pub use cache::AccountCache;
pub use decoder::{DecodeFailure, Decoded, DecoderChain, FnDecoder, Frame, ManualEntryDecoder, ScanDecoder};
pub use error::{ReportError, ReportResult};
pub use service::{success_message, ReportInput, ReportService};
pub use session::{ReportSession, SessionState};
pub use views::{
    leaderboard, qr_payload, registry, scan_trend, LeaderboardRow, RegistryRow, TrendPoint,
};
