//! In-process store with the same key and filter semantics as the SQL schema.
//!
//! Each method takes the lock once, which mirrors the per-statement
//! consistency the SQL backend gives and nothing more.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{PaymentStore, StoreError, StoreResult};
use crate::models::report::{Report, ReportStatus};
use crate::models::transaction::{
    NewTransaction, PaymentHistoryEntry, ReportSummary, SuccessfulPayment, Transaction,
    TransactionStatus,
};
use crate::models::webhook::{NewWebhookLog, WebhookLog, WebhookLogOutcome};

#[derive(Debug, Default)]
struct Tables {
    reports: Vec<Report>,
    transactions: Vec<Transaction>,
    webhook_logs: Vec<WebhookLog>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Snapshot of every report row, in insertion order.
    pub fn reports(&self) -> Vec<Report> {
        self.lock().map(|t| t.reports.clone()).unwrap_or_default()
    }

    /// Snapshot of every transaction row, in insertion order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock()
            .map(|t| t.transactions.clone())
            .unwrap_or_default()
    }

    /// Snapshot of every webhook log row, in insertion order.
    pub fn webhook_logs(&self) -> Vec<WebhookLog> {
        self.lock()
            .map(|t| t.webhook_logs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.lock().map(|_| ())
    }

    async fn find_reusable_report(&self, user_id: Uuid) -> StoreResult<Option<Report>> {
        let tables = self.lock()?;
        let report = tables
            .reports
            .iter()
            .enumerate()
            .filter(|(_, r)| r.user_id == user_id && r.status.is_reusable())
            .max_by_key(|(position, r)| (r.created_at, *position))
            .map(|(_, r)| r.clone());

        Ok(report)
    }

    async fn insert_report(&self, user_id: Uuid, price: i64) -> StoreResult<Report> {
        let report = Report {
            id: Uuid::new_v4(),
            user_id,
            price,
            status: ReportStatus::Unpaid,
            created_at: Utc::now(),
            paid_at: None,
            assessment_id: None,
        };
        self.lock()?.reports.push(report.clone());

        Ok(report)
    }

    async fn get_report(&self, report_id: Uuid) -> StoreResult<Option<Report>> {
        let tables = self.lock()?;
        Ok(tables.reports.iter().find(|r| r.id == report_id).cloned())
    }

    async fn advance_report(
        &self,
        report_id: Uuid,
        target: ReportStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        let mut tables = self.lock()?;
        let mut affected = 0;
        for report in tables
            .reports
            .iter_mut()
            .filter(|r| r.id == report_id && r.status.rank() <= target.rank())
        {
            report.status = target;
            report.paid_at = report.paid_at.or(paid_at);
            affected += 1;
        }

        Ok(affected)
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction> {
        let mut tables = self.lock()?;
        if tables
            .transactions
            .iter()
            .any(|t| t.razorpay_order_id == transaction.razorpay_order_id)
        {
            return Err(StoreError::Unavailable(format!(
                "duplicate key value violates unique constraint on razorpay_order_id ({})",
                transaction.razorpay_order_id
            )));
        }
        if !tables.reports.iter().any(|r| r.id == transaction.report_id) {
            return Err(StoreError::Unavailable(format!(
                "foreign key violation: report {} does not exist",
                transaction.report_id
            )));
        }

        let now = Utc::now();
        let row = Transaction {
            id: Uuid::new_v4(),
            user_id: transaction.user_id,
            report_id: transaction.report_id,
            razorpay_order_id: transaction.razorpay_order_id,
            razorpay_payment_id: None,
            status: TransactionStatus::Pending,
            amount: transaction.amount,
            currency: transaction.currency,
            created_at: now,
            updated_at: now,
        };
        tables.transactions.push(row.clone());

        Ok(row)
    }

    async fn upsert_successful_transaction(
        &self,
        payment: SuccessfulPayment,
    ) -> StoreResult<Transaction> {
        let mut tables = self.lock()?;
        let now = Utc::now();

        if let Some(existing) = tables
            .transactions
            .iter_mut()
            .find(|t| t.razorpay_order_id == payment.razorpay_order_id)
        {
            existing.razorpay_payment_id = Some(payment.razorpay_payment_id);
            existing.status = TransactionStatus::Success;
            existing.amount = payment.amount;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        if !tables.reports.iter().any(|r| r.id == payment.report_id) {
            return Err(StoreError::Unavailable(format!(
                "foreign key violation: report {} does not exist",
                payment.report_id
            )));
        }

        let row = Transaction {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            report_id: payment.report_id,
            razorpay_order_id: payment.razorpay_order_id,
            razorpay_payment_id: Some(payment.razorpay_payment_id),
            status: TransactionStatus::Success,
            amount: payment.amount,
            currency: payment.currency,
            created_at: now,
            updated_at: now,
        };
        tables.transactions.push(row.clone());

        Ok(row)
    }

    async fn find_transaction_by_order(&self, order_id: &str) -> StoreResult<Option<Transaction>> {
        let tables = self.lock()?;
        Ok(tables
            .transactions
            .iter()
            .find(|t| t.razorpay_order_id == order_id)
            .cloned())
    }

    async fn mark_transaction_success(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> StoreResult<u64> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        let mut affected = 0;
        for transaction in tables
            .transactions
            .iter_mut()
            .filter(|t| t.razorpay_order_id == order_id)
        {
            transaction.status = TransactionStatus::Success;
            transaction.razorpay_payment_id = Some(payment_id.to_string());
            transaction.updated_at = now;
            affected += 1;
        }

        Ok(affected)
    }

    async fn list_payments(&self, user_id: Uuid) -> StoreResult<Vec<PaymentHistoryEntry>> {
        let tables = self.lock()?;
        let mut owned: Vec<(usize, &Transaction)> = tables
            .transactions
            .iter()
            .enumerate()
            .filter(|(_, t)| t.user_id == user_id)
            .collect();
        owned.sort_by(|(pa, a), (pb, b)| (b.created_at, pb).cmp(&(a.created_at, pa)));

        let entries = owned
            .into_iter()
            .map(|(_, t)| PaymentHistoryEntry {
                id: t.id,
                amount: t.amount,
                currency: t.currency.clone(),
                status: t.status,
                created_at: t.created_at,
                razorpay_order_id: t.razorpay_order_id.clone(),
                razorpay_payment_id: t.razorpay_payment_id.clone(),
                report: tables
                    .reports
                    .iter()
                    .find(|r| r.id == t.report_id)
                    .map(|r| ReportSummary {
                        id: r.id,
                        status: r.status,
                        price: r.price,
                        created_at: r.created_at,
                        assessment_id: r.assessment_id,
                    }),
            })
            .collect();

        Ok(entries)
    }

    async fn get_transaction_for_user(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Transaction>> {
        let tables = self.lock()?;
        Ok(tables
            .transactions
            .iter()
            .find(|t| t.id == transaction_id && t.user_id == user_id)
            .cloned())
    }

    async fn insert_webhook_log(&self, log: NewWebhookLog) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        self.lock()?.webhook_logs.push(WebhookLog {
            id,
            event: log.event,
            raw_body: log.raw_body,
            payload: log.payload,
            signature: log.signature,
            processed: false,
            status_code: None,
            error_message: None,
            transaction_id: None,
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn finish_webhook_log(
        &self,
        log_id: Uuid,
        outcome: &WebhookLogOutcome,
    ) -> StoreResult<()> {
        let mut tables = self.lock()?;
        if let Some(log) = tables.webhook_logs.iter_mut().find(|l| l.id == log_id) {
            log.status_code = Some(i32::from(outcome.status_code));
            log.processed = outcome.processed;
            log.error_message = outcome.error_message.clone();
            log.transaction_id = outcome.transaction_id;
        }

        Ok(())
    }
}
