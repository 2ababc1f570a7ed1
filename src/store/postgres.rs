//! PostgreSQL-backed store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{PaymentStore, StoreError, StoreResult};
use crate::db::DbPool;
use crate::models::report::{Report, ReportStatus};
use crate::models::transaction::{
    NewTransaction, PaymentHistoryEntry, PaymentHistoryRow, SuccessfulPayment, Transaction,
    TransactionStatus,
};
use crate::models::webhook::{NewWebhookLog, WebhookLogOutcome};

const REPORT_COLUMNS: &str = "id, user_id, price, status, created_at, paid_at, assessment_id";

const TRANSACTION_COLUMNS: &str = "id, user_id, report_id, razorpay_order_id, razorpay_payment_id, \
     status, amount, currency, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_reusable_report(&self, user_id: Uuid) -> StoreResult<Option<Report>> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE user_id = $1 AND status IN ('unpaid', 'pending_payment')
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    async fn insert_report(&self, user_id: Uuid, price: i64) -> StoreResult<Report> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            INSERT INTO reports (user_id, price, status)
            VALUES ($1, $2, 'unpaid')
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(price)
        .fetch_one(&self.pool)
        .await?;

        Ok(report)
    }

    async fn get_report(&self, report_id: Uuid) -> StoreResult<Option<Report>> {
        let report =
            sqlx::query_as::<_, Report>(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"))
                .bind(report_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(report)
    }

    async fn advance_report(
        &self,
        report_id: Uuid,
        target: ReportStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        // The status filter keeps the write forward-only
        let affected = sqlx::query(
            r#"
            UPDATE reports
            SET status = $2,
                paid_at = COALESCE(paid_at, $3)
            WHERE id = $1 AND status = ANY($4)
            "#,
        )
        .bind(report_id)
        .bind(target.as_str())
        .bind(paid_at)
        .bind(target.advanceable_from())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (user_id, report_id, razorpay_order_id, status, amount, currency)
            VALUES ($1, $2, $3, 'pending', $4, $5)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction.user_id)
        .bind(transaction.report_id)
        .bind(&transaction.razorpay_order_id)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .fetch_one(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn upsert_successful_transaction(
        &self,
        payment: SuccessfulPayment,
    ) -> StoreResult<Transaction> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (
                user_id,
                report_id,
                razorpay_order_id,
                razorpay_payment_id,
                status,
                amount,
                currency
            )
            VALUES ($1, $2, $3, $4, 'success', $5, $6)
            ON CONFLICT (razorpay_order_id) DO UPDATE
            SET razorpay_payment_id = EXCLUDED.razorpay_payment_id,
                status = 'success',
                amount = EXCLUDED.amount,
                updated_at = NOW()
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(payment.user_id)
        .bind(payment.report_id)
        .bind(&payment.razorpay_order_id)
        .bind(&payment.razorpay_payment_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .fetch_one(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn find_transaction_by_order(&self, order_id: &str) -> StoreResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE razorpay_order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn mark_transaction_success(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> StoreResult<u64> {
        let affected = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $3,
                razorpay_payment_id = $2,
                updated_at = NOW()
            WHERE razorpay_order_id = $1
            "#,
        )
        .bind(order_id)
        .bind(payment_id)
        .bind(TransactionStatus::Success.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    async fn list_payments(&self, user_id: Uuid) -> StoreResult<Vec<PaymentHistoryEntry>> {
        let rows = sqlx::query_as::<_, PaymentHistoryRow>(
            r#"
            SELECT
                t.id,
                t.amount,
                t.currency,
                t.status,
                t.created_at,
                t.razorpay_order_id,
                t.razorpay_payment_id,
                r.id AS report_id,
                r.status AS report_status,
                r.price AS report_price,
                r.created_at AS report_created_at,
                r.assessment_id AS report_assessment_id
            FROM transactions t
            LEFT JOIN reports r ON r.id = t.report_id
            WHERE t.user_id = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                PaymentHistoryEntry::try_from(row)
                    .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
            })
            .collect()
    }

    async fn get_transaction_for_user(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Transaction>> {
        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1 AND user_id = $2"
        ))
        .bind(transaction_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(transaction)
    }

    async fn insert_webhook_log(&self, log: NewWebhookLog) -> StoreResult<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_logs (event, raw_body, payload, signature, processed)
            VALUES ($1, $2, $3, $4, false)
            RETURNING id
            "#,
        )
        .bind(&log.event)
        .bind(&log.raw_body)
        .bind(&log.payload)
        .bind(&log.signature)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn finish_webhook_log(
        &self,
        log_id: Uuid,
        outcome: &WebhookLogOutcome,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE webhook_logs
            SET status_code = $2,
                processed = $3,
                error_message = $4,
                transaction_id = $5
            WHERE id = $1
            "#,
        )
        .bind(log_id)
        .bind(i32::from(outcome.status_code))
        .bind(outcome.processed)
        .bind(&outcome.error_message)
        .bind(outcome.transaction_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
