//! Transaction data models and payment history views.
//!
//! This module defines:
//! - `Transaction`: one row per gateway order, keyed uniquely by `razorpay_order_id`
//! - Inputs for the two write paths (order creation and payment confirmation)
//! - `PaymentHistoryEntry` and `ReceiptResponse` returned to clients

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::UnknownStatus;
use super::report::ReportStatus;

/// Transaction status.
///
/// `pending` is written at order creation. `success` is written by whichever
/// confirmation path reaches the store first; the other path rewrites the same
/// values. `failed` is terminal and never written by the confirmation paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            _ => Err(UnknownStatus {
                kind: "transaction",
                value,
            }),
        }
    }
}

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Each transaction:
/// - Belongs to exactly one gateway order (unique `razorpay_order_id`)
/// - References the report being paid for
/// - Stores amount in paise (never floats!)
/// - Carries a payment id whenever its status is `success`
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_id: Uuid,
    pub razorpay_order_id: String,

    /// Set once the gateway reports a captured payment
    pub razorpay_payment_id: Option<String>,

    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,

    /// Amount in paise
    pub amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pending transaction recorded right after a gateway order is created.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub report_id: Uuid,
    pub razorpay_order_id: String,
    pub amount: i64,
    pub currency: String,
}

/// A verified payment, written as an upsert keyed by the gateway order id.
#[derive(Debug, Clone)]
pub struct SuccessfulPayment {
    pub user_id: Uuid,
    pub report_id: Uuid,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub amount: i64,
    pub currency: String,
}

/// Report fields shown next to a transaction in the payment history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub status: ReportStatus,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub assessment_id: Option<Uuid>,
}

/// One entry of `GET /api/payments`.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "770e8400-e29b-41d4-a716-446655440002",
///   "amount": 49900,
///   "currency": "INR",
///   "status": "success",
///   "created_at": "2025-12-21T16:00:00Z",
///   "razorpay_order_id": "order_Nx1",
///   "razorpay_payment_id": "pay_Nx1",
///   "report": {
///     "id": "550e8400-e29b-41d4-a716-446655440000",
///     "status": "paid_ready_to_view",
///     "price": 49900,
///     "created_at": "2025-12-21T15:59:00Z",
///     "assessment_id": null
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentHistoryEntry {
    pub id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: Option<String>,
    pub report: Option<ReportSummary>,
}

/// Flat row produced by joining `transactions` with `reports`.
#[derive(Debug, sqlx::FromRow)]
pub struct PaymentHistoryRow {
    pub id: Uuid,
    pub amount: i64,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: Option<String>,
    pub report_id: Option<Uuid>,
    pub report_status: Option<String>,
    pub report_price: Option<i64>,
    pub report_created_at: Option<DateTime<Utc>>,
    pub report_assessment_id: Option<Uuid>,
}

impl TryFrom<PaymentHistoryRow> for PaymentHistoryEntry {
    type Error = UnknownStatus;

    fn try_from(row: PaymentHistoryRow) -> Result<Self, Self::Error> {
        let report = match (
            row.report_id,
            row.report_status,
            row.report_price,
            row.report_created_at,
        ) {
            (Some(id), Some(status), Some(price), Some(created_at)) => Some(ReportSummary {
                id,
                status: ReportStatus::try_from(status)?,
                price,
                created_at,
                assessment_id: row.report_assessment_id,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id,
            amount: row.amount,
            currency: row.currency,
            status: row.status,
            created_at: row.created_at,
            razorpay_order_id: row.razorpay_order_id,
            razorpay_payment_id: row.razorpay_payment_id,
            report,
        })
    }
}

/// Body of `GET /api/payments`.
#[derive(Debug, Serialize)]
pub struct PaymentHistoryResponse {
    pub payments: Vec<PaymentHistoryEntry>,
}

/// Receipt data for a single successful transaction.
#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub transaction_id: Uuid,
    pub payment_id: String,
    pub product: String,
    pub customer_email: String,
    pub amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}
