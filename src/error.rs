//! Error types and HTTP error response handling.
//!
//! This module defines the errors the JSON endpoints can return and how they
//! are converted into HTTP responses. The webhook endpoint does not use it:
//! the gateway gets plain-text bodies with the status codes it retries on.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::store::StoreError;

/// Application-wide error type for browser-facing endpoints.
///
/// # Error Categories
///
/// - **Input Errors**: missing session, malformed body, bad signature
/// - **Not Found Errors**: unknown report or transaction
/// - **Upstream Errors**: gateway or store failures during order creation
/// - **Persistence Errors**: any other store failure
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Store operation failed.
    ///
    /// Returns HTTP 500 without exposing the underlying error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No valid session.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Unauthorized")]
    Unauthorized,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Checkout signature did not verify.
    ///
    /// Returns HTTP 400 Bad Request. Nothing has been written.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The signed order is already recorded against a different report.
    ///
    /// Returns HTTP 400 Bad Request. Nothing has been written.
    #[error("Order does not belong to this report")]
    OrderReportMismatch,

    /// Returns HTTP 404 Not Found.
    #[error("Report not found")]
    ReportNotFound,

    /// Returns HTTP 404 Not Found.
    #[error("Transaction not found")]
    TransactionNotFound,

    /// Any step of order creation failed.
    ///
    /// Returns HTTP 500 with the details, so the user can retry manually.
    #[error("Failed to create payment order")]
    OrderCreation(String),

    /// Marking the report paid failed during client verification.
    #[error("Report update failed")]
    ReportUpdate(#[source] StoreError),

    /// Loading the payment history failed.
    #[error("Failed to load payments")]
    PaymentHistory(#[source] StoreError),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": "Human-readable summary",
///   "code": "error_type",
///   "details": "Only present for order creation failures"
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::InvalidSignature => (StatusCode::BAD_REQUEST, "invalid_signature", None),
            AppError::OrderReportMismatch => {
                (StatusCode::BAD_REQUEST, "order_report_mismatch", None)
            }
            AppError::ReportNotFound => (StatusCode::NOT_FOUND, "report_not_found", None),
            AppError::TransactionNotFound => {
                (StatusCode::NOT_FOUND, "transaction_not_found", None)
            }
            AppError::OrderCreation(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "order_creation_failed",
                Some(details.clone()),
            ),
            AppError::ReportUpdate(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "report_update_failed",
                None,
            ),
            AppError::PaymentHistory(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "payment_history_failed",
                None,
            ),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
        };

        let message = match &self {
            AppError::Store(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}
