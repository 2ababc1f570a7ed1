//! Data models representing database entities and API payloads.
//!
//! Status columns are stored as `TEXT` and decoded into enums through
//! `TryFrom<String>`, so an unexpected value surfaces as a decode error
//! instead of silently passing through.

/// Report lifecycle and pricing
pub mod report;
/// Gateway-order bookkeeping rows and payment history views
pub mod transaction;
/// Order creation and client verification request/response bodies
pub mod payment;
/// Inbound gateway webhook envelope and audit log rows
pub mod webhook;

/// A status column held a value this build does not know about.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} status: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}
