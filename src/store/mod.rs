//! Persistent store for reports, transactions and webhook logs.
//!
//! Every method is one statement against the backing store. There are no
//! multi-statement transactions: the payment flows stay correct because each
//! write is a filtered update or an upsert on a unique key, so concurrent
//! writers converge on the same row values.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::report::{Report, ReportStatus};
use crate::models::transaction::{
    NewTransaction, PaymentHistoryEntry, SuccessfulPayment, Transaction,
};
use crate::models::webhook::{NewWebhookLog, WebhookLogOutcome};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend could not serve the request (used by non-SQL backends).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Cheapest possible round trip, used by the health check.
    async fn ping(&self) -> StoreResult<()>;

    /// Most recent report of `user_id` that is still `unpaid` or `pending_payment`.
    async fn find_reusable_report(&self, user_id: Uuid) -> StoreResult<Option<Report>>;

    /// Inserts a new `unpaid` report.
    async fn insert_report(&self, user_id: Uuid, price: i64) -> StoreResult<Report>;

    async fn get_report(&self, report_id: Uuid) -> StoreResult<Option<Report>>;

    /// Moves a report to `target` if its current status ranks at or below
    /// `target`. `paid_at` only fills an empty column. Returns rows affected.
    async fn advance_report(
        &self,
        report_id: Uuid,
        target: ReportStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> StoreResult<u64>;

    /// Records a `pending` transaction for a freshly created gateway order.
    async fn insert_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction>;

    /// Insert-or-update keyed by gateway order id, ending in `success`.
    async fn upsert_successful_transaction(
        &self,
        payment: SuccessfulPayment,
    ) -> StoreResult<Transaction>;

    async fn find_transaction_by_order(&self, order_id: &str) -> StoreResult<Option<Transaction>>;

    /// Marks the transaction of `order_id` as `success`. Returns rows affected.
    async fn mark_transaction_success(&self, order_id: &str, payment_id: &str)
    -> StoreResult<u64>;

    /// The user's transactions joined with their reports, newest first.
    async fn list_payments(&self, user_id: Uuid) -> StoreResult<Vec<PaymentHistoryEntry>>;

    async fn get_transaction_for_user(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Transaction>>;

    /// Inserts an unprocessed audit row and returns its id.
    async fn insert_webhook_log(&self, log: NewWebhookLog) -> StoreResult<Uuid>;

    async fn finish_webhook_log(&self, log_id: Uuid, outcome: &WebhookLogOutcome)
    -> StoreResult<()>;
}
