//! CleanCredit CLI - command orchestration
//!
//! This crate provides the `cleancredit` binary and the commands it runs.

pub mod commands;
pub mod context;

pub use context::AppContext;
