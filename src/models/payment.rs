//! Request and response bodies for order creation and client verification.
//!
//! Field names follow what the browser checkout script sends and expects,
//! which is why some are camelCase and some carry the gateway's prefixes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response of `POST /api/razorpay/order`.
///
/// # JSON Example
///
/// ```json
/// {
///   "orderId": "order_Nx1",
///   "amount": 49900,
///   "currency": "INR",
///   "reportId": "550e8400-e29b-41d4-a716-446655440000",
///   "keyId": "rzp_test_123"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,

    /// Amount in paise, as echoed by the gateway
    pub amount: i64,
    pub currency: String,
    pub report_id: Uuid,

    /// Public gateway key the checkout modal is opened with
    pub key_id: String,
}

/// Body of `POST /api/razorpay/verify`, sent by the checkout success callback.
///
/// # JSON Example
///
/// ```json
/// {
///   "razorpay_order_id": "order_Nx1",
///   "razorpay_payment_id": "pay_Nx1",
///   "razorpay_signature": "5f1c...",
///   "reportId": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,

    #[serde(rename = "reportId")]
    pub report_id: Uuid,
}

/// Response of a successful client verification.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
}

impl VerifyPaymentResponse {
    pub fn verified() -> Self {
        Self {
            success: true,
            message: "Payment verified, report marked paid, and transaction recorded".to_string(),
        }
    }
}
