//! Gateway webhook receiver.
//!
//! - POST /api/razorpay/webhook - Payment events pushed by the gateway
//!
//! The body is taken as raw bytes: the signature covers the exact bytes
//! sent, so the JSON is only parsed after they have been captured.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::services::webhook_service::{self, SIGNATURE_HEADER};
use crate::state::AppState;

/// Receive one webhook delivery.
///
/// # Responses
///
/// Plain text. 400 when the signature header or webhook secret is missing,
/// 403 on a bad signature, 500 when a capture update fails (the gateway
/// retries), and 200 for everything else.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    // Non-ASCII bytes still count as a signature and fail the comparison
    let signature = headers
        .get(SIGNATURE_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    let disposition = webhook_service::process_delivery(
        state.store.as_ref(),
        &state.verifier,
        &body,
        signature.as_deref(),
    )
    .await;

    (disposition.status(), disposition.response_body())
}
