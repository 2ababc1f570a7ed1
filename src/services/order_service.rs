//! Order creation service.
//!
//! # Process
//!
//! 1. Reuse the caller's latest `unpaid`/`pending_payment` report, or create one
//! 2. Create a gateway order carrying `{user_id, report_id}` in its notes
//! 3. Move the report to `pending_payment`
//! 4. Record a `pending` transaction for the order
//!
//! Each step is its own store round trip. A failure after step 2 leaves a
//! dangling gateway order; that is tolerated because the webhook reads the
//! report id from the order notes, not from local state.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::payment::CreateOrderResponse;
use crate::models::report::{REPORT_CURRENCY, REPORT_PRICE_PAISE, ReportStatus};
use crate::models::transaction::NewTransaction;
use crate::services::gateway::{OrderRequest, PaymentGateway};
use crate::store::PaymentStore;

/// Create a gateway order for the caller's report.
///
/// # Errors
///
/// Every failure becomes `OrderCreation` with a human-readable detail.
/// The gateway call is never retried here: it is billable.
pub async fn create_order(
    store: &dyn PaymentStore,
    gateway: &dyn PaymentGateway,
    key_id: &str,
    user_id: Uuid,
) -> Result<CreateOrderResponse, AppError> {
    let report = match store
        .find_reusable_report(user_id)
        .await
        .map_err(|e| failure("Failed to look up existing reports", e))?
    {
        Some(report) => {
            tracing::info!(report_id = %report.id, "Reusing unpaid report");
            report
        }
        None => {
            let report = store
                .insert_report(user_id, REPORT_PRICE_PAISE)
                .await
                .map_err(|e| failure("Failed to create report", e))?;
            tracing::info!(report_id = %report.id, "Created unpaid report");
            report
        }
    };

    let request = OrderRequest::for_report(user_id, report.id, REPORT_PRICE_PAISE, REPORT_CURRENCY);
    let order = gateway
        .create_order(&request)
        .await
        .map_err(|e| failure("Gateway order creation failed", e))?;
    tracing::info!(order_id = %order.id, report_id = %report.id, "Gateway order created");

    let moved = store
        .advance_report(report.id, ReportStatus::PendingPayment, None)
        .await
        .map_err(|e| {
            tracing::error!(
                order_id = %order.id,
                report_id = %report.id,
                "Gateway order created but report status update failed"
            );
            failure("Failed to update report status", e)
        })?;
    if moved == 0 {
        // Someone paid for the report in the meantime
        tracing::warn!(report_id = %report.id, "Report already past pending_payment");
    }

    store
        .insert_transaction(NewTransaction {
            user_id,
            report_id: report.id,
            razorpay_order_id: order.id.clone(),
            amount: REPORT_PRICE_PAISE,
            currency: REPORT_CURRENCY.to_string(),
        })
        .await
        .map_err(|e| {
            tracing::error!(
                order_id = %order.id,
                report_id = %report.id,
                "Gateway order created but pending transaction was not recorded"
            );
            failure("Failed to record transaction", e)
        })?;

    Ok(CreateOrderResponse {
        order_id: order.id,
        amount: order.amount,
        currency: order.currency,
        report_id: report.id,
        key_id: key_id.to_string(),
    })
}

fn failure(step: &str, error: impl std::fmt::Display) -> AppError {
    tracing::error!("Error creating payment order: {}: {}", step, error);
    AppError::OrderCreation(format!("{step}: {error}"))
}
