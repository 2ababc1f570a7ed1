//! Client-side payment verification.
//!
//! Called by the browser right after the checkout modal reports success.
//! The webhook is the authoritative path; this one exists so the user sees
//! the report unlocked without waiting for the gateway's delivery.

use chrono::Utc;

use crate::error::AppError;
use crate::models::payment::{VerifyPaymentRequest, VerifyPaymentResponse};
use crate::models::report::{REPORT_CURRENCY, ReportStatus};
use crate::models::transaction::SuccessfulPayment;
use crate::services::signature::SignatureVerifier;
use crate::store::PaymentStore;

/// Verify a checkout result and mark the report paid.
///
/// # Process
///
/// 1. Check `HMAC(key_secret, "{order_id}|{payment_id}")` against the signature
/// 2. Load the report
/// 3. Refuse if the order is already recorded against another report
/// 4. Move the report to `paid`
/// 5. Upsert the transaction to `success`, keyed by order id
///
/// Steps 1-3 write nothing. A failure in step 5 is logged and swallowed:
/// the report is already paid and the webhook reconciles the transaction.
/// Repeating the call with the same payload rewrites the same values.
pub async fn verify_payment(
    store: &dyn PaymentStore,
    verifier: &SignatureVerifier,
    request: VerifyPaymentRequest,
) -> Result<VerifyPaymentResponse, AppError> {
    if let Err(e) = verifier.verify_order_signature(
        &request.razorpay_order_id,
        &request.razorpay_payment_id,
        &request.razorpay_signature,
    ) {
        tracing::warn!(
            order_id = %request.razorpay_order_id,
            payment_id = %request.razorpay_payment_id,
            "Payment signature verification failed: {}",
            e
        );
        return Err(AppError::InvalidSignature);
    }

    let report = store
        .get_report(request.report_id)
        .await?
        .ok_or(AppError::ReportNotFound)?;

    if let Some(existing) = store
        .find_transaction_by_order(&request.razorpay_order_id)
        .await?
    {
        if existing.report_id != report.id {
            tracing::warn!(
                order_id = %request.razorpay_order_id,
                report_id = %report.id,
                recorded_report_id = %existing.report_id,
                "Signed order belongs to a different report"
            );
            return Err(AppError::OrderReportMismatch);
        }
    }

    store
        .advance_report(report.id, ReportStatus::Paid, Some(Utc::now()))
        .await
        .map_err(|e| {
            tracing::error!(report_id = %report.id, "Failed to update report: {}", e);
            AppError::ReportUpdate(e)
        })?;

    let upsert = store
        .upsert_successful_transaction(SuccessfulPayment {
            user_id: report.user_id,
            report_id: report.id,
            razorpay_order_id: request.razorpay_order_id.clone(),
            razorpay_payment_id: request.razorpay_payment_id.clone(),
            amount: report.price,
            currency: REPORT_CURRENCY.to_string(),
        })
        .await;
    if let Err(e) = upsert {
        tracing::warn!(
            order_id = %request.razorpay_order_id,
            report_id = %report.id,
            "Report marked paid but transaction upsert failed: {}",
            e
        );
    }

    tracing::info!(
        order_id = %request.razorpay_order_id,
        payment_id = %request.razorpay_payment_id,
        report_id = %report.id,
        "Payment verified"
    );

    Ok(VerifyPaymentResponse::verified())
}
