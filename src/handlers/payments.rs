//! Payment HTTP handlers.
//!
//! This module implements the browser-facing payment endpoints:
//! - POST /api/razorpay/verify - Confirm a checkout result
//! - GET /api/payments - List the caller's payments
//! - GET /api/payments/receipt/:id - Receipt for one successful payment

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::payment::{VerifyPaymentRequest, VerifyPaymentResponse},
    models::report::REPORT_PRODUCT_NAME,
    models::transaction::{PaymentHistoryResponse, ReceiptResponse, TransactionStatus},
    services::verification_service,
    state::AppState,
};

/// Verify the checkout modal's result.
///
/// # Request Body
///
/// ```json
/// {
///   "razorpay_order_id": "order_Nx1",
///   "razorpay_payment_id": "pay_Nx1",
///   "razorpay_signature": "5f2c...",
///   "reportId": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// { "success": true, "message": "Payment verified, report marked paid, and transaction recorded" }
/// ```
///
/// Malformed or incomplete bodies are 400, as is a bad signature.
/// No session is required: the signature proves the checkout happened.
pub async fn verify_payment(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let response =
        verification_service::verify_payment(state.store.as_ref(), &state.verifier, request)
            .await?;

    Ok(Json(response))
}

/// List the caller's transactions with their reports, newest first.
///
/// # Response (200)
///
/// ```json
/// { "payments": [ { "id": "...", "amount": 49900, "status": "success", "report": { ... } } ] }
/// ```
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<PaymentHistoryResponse>, AppError> {
    let payments = state.store.list_payments(auth.user_id).await.map_err(|e| {
        tracing::error!(user_id = %auth.user_id, "Failed to load payments: {}", e);
        AppError::PaymentHistory(e)
    })?;

    Ok(Json(PaymentHistoryResponse { payments }))
}

/// Receipt for one of the caller's successful transactions.
///
/// # Security
///
/// Returns 404 if the transaction does not exist, belongs to someone else,
/// or has not succeeded.
pub async fn get_receipt(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ReceiptResponse>, AppError> {
    let transaction = state
        .store
        .get_transaction_for_user(transaction_id, auth.user_id)
        .await?
        .filter(|t| t.status == TransactionStatus::Success)
        .ok_or(AppError::TransactionNotFound)?;

    let payment_id = transaction
        .razorpay_payment_id
        .ok_or(AppError::TransactionNotFound)?;

    Ok(Json(ReceiptResponse {
        transaction_id: transaction.id,
        payment_id,
        product: REPORT_PRODUCT_NAME.to_string(),
        customer_email: auth.email.unwrap_or_else(|| "N/A".to_string()),
        amount: transaction.amount,
        currency: transaction.currency,
        created_at: transaction.created_at,
    }))
}
