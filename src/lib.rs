//! Billing cycle and risk engine for vehicle-lease rent collection.
//!
//! The heart of it is [`billing::compute_status`]: a pure function of a
//! [`models::DriverRecord`], a [`models::HighlightRule`] and a reference
//! date, returning a [`models::RiskStatus`]. Everything else here is the
//! plumbing that feeds records in and ranks, filters and reports on what
//! comes out.

pub mod billing;
pub mod cache;
pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod ranking;
pub mod report;
pub mod search;

pub use billing::{compute_billing_anchor, compute_status, expected_due_amount, rank_score};
pub use models::{DriverRecord, HighlightRule, LeaseMode, RiskLevel, RiskStatus};
