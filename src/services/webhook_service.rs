//! Gateway webhook reconciliation.
//!
//! This is the authoritative path to `paid`. Every delivery is logged before
//! its signature is checked and the log row is finalized exactly once.
//!
//! # Delivery State Machine
//!
//! ```text
//! RECEIVED -> LOGGED -> MISSING_CONFIGURATION (400)
//!                    -> SIGNATURE_INVALID (403)
//!                    -> NO_PAYMENT_ENTITY (200)
//!                    -> MISSING_IDS (200)
//!                    -> IGNORED (200)
//!                    -> CAPTURED (200)
//!                    -> UPDATE_FAILED (500, gateway retries)
//! ```
//!
//! Only `UPDATE_FAILED` asks the gateway for a retry. Payloads the service
//! does not act on still get 200 so they are not redelivered forever.

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::models::report::ReportStatus;
use crate::models::webhook::{NewWebhookLog, WebhookEnvelope, WebhookLogOutcome};
use crate::services::signature::{SignatureError, SignatureVerifier};
use crate::store::{PaymentStore, StoreError};

/// Header carrying the hex HMAC of the raw body.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Terminal state of one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookDisposition {
    /// No signature header, or no webhook secret configured
    MissingConfiguration,
    InvalidSignature,
    NoPaymentEntity,
    MissingIds,
    /// Signed and well-formed, but not a capture
    Ignored,
    /// Capture applied. `report_matched` is false when the report id from
    /// the notes matched no row.
    Captured { report_matched: bool },
    /// A capture update failed; the gateway should retry
    UpdateFailed(String),
}

impl WebhookDisposition {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookDisposition::MissingConfiguration => StatusCode::BAD_REQUEST,
            WebhookDisposition::InvalidSignature => StatusCode::FORBIDDEN,
            WebhookDisposition::UpdateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }

    pub fn processed(&self) -> bool {
        matches!(self, WebhookDisposition::Captured { .. })
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            WebhookDisposition::MissingConfiguration => {
                Some("Missing signature header or webhook secret".to_string())
            }
            WebhookDisposition::InvalidSignature => Some("Invalid Razorpay signature".to_string()),
            WebhookDisposition::NoPaymentEntity => Some("No payment entity found".to_string()),
            WebhookDisposition::MissingIds => {
                Some("Missing report_id, order_id or payment_id".to_string())
            }
            WebhookDisposition::Captured {
                report_matched: false,
            } => Some("no report matched report_id".to_string()),
            WebhookDisposition::UpdateFailed(message) => Some(message.clone()),
            WebhookDisposition::Ignored | WebhookDisposition::Captured { .. } => None,
        }
    }

    /// Plain-text body returned to the gateway.
    pub fn response_body(&self) -> &'static str {
        match self {
            WebhookDisposition::MissingConfiguration => "Missing webhook configuration",
            WebhookDisposition::InvalidSignature => "Invalid signature",
            WebhookDisposition::NoPaymentEntity => "No payment entity",
            WebhookDisposition::MissingIds => "Missing data",
            WebhookDisposition::Ignored => "Event received and ignored",
            WebhookDisposition::Captured { .. } => "OK",
            WebhookDisposition::UpdateFailed(_) => "Internal error",
        }
    }
}

/// Handle one webhook delivery end to end.
///
/// `body` must be the bytes exactly as received; the signature is computed
/// over them, never over a re-serialized parse.
pub async fn process_delivery(
    store: &dyn PaymentStore,
    verifier: &SignatureVerifier,
    body: &[u8],
    signature: Option<&str>,
) -> WebhookDisposition {
    let (event, parsed) = describe(body);

    // Logged before verification so forged deliveries stay auditable
    let log_id = match store
        .insert_webhook_log(NewWebhookLog {
            event: event.clone(),
            raw_body: body.to_vec(),
            payload: parsed.as_ref().filter(|value| !contains_nul(value)).cloned(),
            signature: signature.map(str::to_string),
        })
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::warn!(event = %event, "Failed to insert webhook log: {}", e);
            None
        }
    };

    let (disposition, transaction_id) =
        reconcile(store, verifier, body, signature, &event, parsed.as_ref()).await;

    match &disposition {
        WebhookDisposition::Captured { .. } | WebhookDisposition::Ignored => {
            tracing::info!(event = %event, outcome = ?disposition, "Webhook handled")
        }
        WebhookDisposition::UpdateFailed(message) => {
            tracing::error!(event = %event, "Webhook capture update failed: {}", message)
        }
        other => tracing::warn!(event = %event, outcome = ?other, "Webhook rejected"),
    }

    if let Some(log_id) = log_id {
        let outcome = WebhookLogOutcome {
            status_code: disposition.status().as_u16(),
            processed: disposition.processed(),
            error_message: disposition.error_message(),
            transaction_id,
        };
        if let Err(e) = store.finish_webhook_log(log_id, &outcome).await {
            tracing::warn!(log_id = %log_id, "Failed to update webhook log: {}", e);
        }
    }

    disposition
}

/// Best-effort parse: the event name for the audit row and the JSON body,
/// if it is JSON at all. The event is `"unverified"` when the JSON has no
/// string `event` and `"unknown"` when the body is not JSON.
fn describe(body: &[u8]) -> (String, Option<Value>) {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => {
            let event = WebhookEnvelope::new(&value)
                .event()
                .unwrap_or("unverified")
                // Postgres text columns cannot hold NUL
                .replace('\0', "\u{FFFD}");
            (event, Some(value))
        }
        Err(_) => ("unknown".to_string(), None),
    }
}

/// Whether any string or key holds a NUL, which `JSONB` rejects.
fn contains_nul(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains('\0'),
        Value::Array(items) => items.iter().any(contains_nul),
        Value::Object(map) => map.iter().any(|(k, v)| k.contains('\0') || contains_nul(v)),
        _ => false,
    }
}

async fn reconcile(
    store: &dyn PaymentStore,
    verifier: &SignatureVerifier,
    body: &[u8],
    signature: Option<&str>,
    event: &str,
    parsed: Option<&Value>,
) -> (WebhookDisposition, Option<Uuid>) {
    match verifier.verify_webhook_signature(body, signature) {
        Ok(()) => {}
        Err(SignatureError::MissingSecret | SignatureError::MissingSignature) => {
            return (WebhookDisposition::MissingConfiguration, None);
        }
        Err(SignatureError::Mismatch) => return (WebhookDisposition::InvalidSignature, None),
    }

    let Some(payment) = parsed.and_then(|value| WebhookEnvelope::new(value).payment()) else {
        return (WebhookDisposition::NoPaymentEntity, None);
    };

    // Ids come from the gateway's own payload, never from local session state
    let (Some(order_id), Some(payment_id), Some(report_id)) =
        (payment.order_id(), payment.payment_id(), payment.report_id())
    else {
        return (WebhookDisposition::MissingIds, None);
    };

    // Context for the audit row only
    let transaction_id = match store.find_transaction_by_order(order_id).await {
        Ok(found) => found.map(|t| t.id),
        Err(e) => {
            tracing::warn!(order_id = %order_id, "Transaction lookup failed: {}", e);
            None
        }
    };

    if !payment.is_captured(event) {
        return (WebhookDisposition::Ignored, transaction_id);
    }

    let disposition = match apply_capture(store, order_id, payment_id, report_id).await {
        Ok(report_matched) => {
            if !report_matched {
                tracing::warn!(report_id = %report_id, order_id = %order_id, "Capture matched no report");
            } else {
                tracing::info!(report_id = %report_id, order_id = %order_id, "Payment captured");
            }
            WebhookDisposition::Captured { report_matched }
        }
        Err(e) => WebhookDisposition::UpdateFailed(e.to_string()),
    };

    (disposition, transaction_id)
}

/// Writes the captured state. Both updates are attempted even if the first
/// fails; both are plain assignments on unique keys, so a full retry is safe.
///
/// Returns whether the report update matched a row.
async fn apply_capture(
    store: &dyn PaymentStore,
    order_id: &str,
    payment_id: &str,
    report_id: Uuid,
) -> Result<bool, StoreError> {
    let transaction_update = store.mark_transaction_success(order_id, payment_id).await;
    let report_update = store
        .advance_report(report_id, ReportStatus::PaidReadyToView, Some(Utc::now()))
        .await;

    if let Ok(0) = transaction_update {
        tracing::warn!(order_id = %order_id, "Capture matched no transaction");
    }

    transaction_update?;
    Ok(report_update? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_extracts_event_name() {
        let (event, payload) = describe(br#"{"event":"payment.captured"}"#);

        assert_eq!(event, "payment.captured");
        assert_eq!(payload.unwrap()["event"], "payment.captured");
    }

    #[test]
    fn test_describe_without_event_field() {
        let (event, _) = describe(br#"{"payload":{},"event":5}"#);

        assert_eq!(event, "unverified");
    }

    #[test]
    fn test_describe_non_json_body() {
        let (event, payload) = describe(b"\x00\xffnot json at all");

        assert_eq!(event, "unknown");
        assert_eq!(payload, None);
    }

    #[test]
    fn test_describe_strips_nul_from_event_name() {
        let (event, payload) = describe(br#"{"event":"payment\u0000captured"}"#);

        assert!(!event.contains('\0'));
        assert!(payload.is_some());
    }

    #[test]
    fn test_nul_anywhere_in_json_is_detected() {
        assert!(!contains_nul(&json!({"a": ["b", {"c": 1}]})));
        assert!(contains_nul(&json!({"a": ["b", {"c": "x\u{0}y"}]})));
        assert!(contains_nul(&json!({"k\u{0}": 1})));
    }

    #[test]
    fn test_disposition_status_codes() {
        assert_eq!(
            WebhookDisposition::MissingConfiguration.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookDisposition::InvalidSignature.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(WebhookDisposition::NoPaymentEntity.status(), StatusCode::OK);
        assert_eq!(WebhookDisposition::MissingIds.status(), StatusCode::OK);
        assert_eq!(WebhookDisposition::Ignored.status(), StatusCode::OK);
        assert_eq!(
            WebhookDisposition::Captured {
                report_matched: false
            }
            .status(),
            StatusCode::OK
        );
        assert_eq!(
            WebhookDisposition::UpdateFailed("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_only_captures_are_processed() {
        assert!(
            WebhookDisposition::Captured {
                report_matched: true
            }
            .processed()
        );
        assert!(!WebhookDisposition::Ignored.processed());
        assert!(!WebhookDisposition::UpdateFailed("boom".to_string()).processed());
    }

    #[test]
    fn test_unmatched_report_is_distinguishable_in_audit() {
        assert_eq!(
            WebhookDisposition::Captured {
                report_matched: true
            }
            .error_message(),
            None
        );
        assert_eq!(
            WebhookDisposition::Captured {
                report_matched: false
            }
            .error_message()
            .as_deref(),
            Some("no report matched report_id")
        );
    }
}
