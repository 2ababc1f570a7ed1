//! Inbound gateway webhook models.
//!
//! This module defines:
//! - `WebhookEnvelope`: a read-only view over the gateway's parsed JSON
//! - `WebhookLog`: the audit row written for every delivery
//! - `NewWebhookLog` / `WebhookLogOutcome`: the insert and the single final update
//!
//! # Payload Shape
//!
//! ```json
//! {
//!   "event": "payment.captured",
//!   "payload": {
//!     "payment": {
//!       "entity": {
//!         "id": "pay_Nx1",
//!         "order_id": "order_Nx1",
//!         "status": "captured",
//!         "notes": { "report_id": "550e8400-e29b-41d4-a716-446655440000" }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Nothing about this shape is trusted. Each field is looked up on its own,
//! so a malformed sibling never hides a well-formed one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Event name the gateway sends when a payment is captured.
pub const PAYMENT_CAPTURED_EVENT: &str = "payment.captured";

/// Payment entity status meaning the funds were captured.
pub const PAYMENT_CAPTURED_STATUS: &str = "captured";

/// Top-level webhook body.
#[derive(Debug, Clone, Copy)]
pub struct WebhookEnvelope<'a> {
    body: &'a Value,
}

impl<'a> WebhookEnvelope<'a> {
    pub fn new(body: &'a Value) -> Self {
        Self { body }
    }

    /// `event`, when it is a string.
    pub fn event(&self) -> Option<&'a str> {
        self.body.get("event").and_then(Value::as_str)
    }

    /// `payload.payment.entity`, when every level is present and the entity
    /// is an object.
    pub fn payment(&self) -> Option<PaymentEntity<'a>> {
        let entity = self
            .body
            .get("payload")?
            .get("payment")?
            .get("entity")
            .filter(|entity| entity.is_object())?;

        Some(PaymentEntity { entity })
    }
}

/// The gateway's payment object.
#[derive(Debug, Clone, Copy)]
pub struct PaymentEntity<'a> {
    entity: &'a Value,
}

impl<'a> PaymentEntity<'a> {
    fn text(&self, key: &str) -> Option<&'a str> {
        self.entity
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Report id stamped into the order notes at order creation. The gateway
    /// sends `notes` as `[]` when an order has none.
    pub fn report_id(&self) -> Option<Uuid> {
        self.entity
            .get("notes")?
            .get("report_id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }

    pub fn order_id(&self) -> Option<&'a str> {
        self.text("order_id")
    }

    pub fn payment_id(&self) -> Option<&'a str> {
        self.text("id")
    }

    pub fn status(&self) -> Option<&'a str> {
        self.text("status")
    }

    /// Gateways disagree on whether the event name or the entity status is
    /// authoritative, so either one counts.
    pub fn is_captured(&self, event: &str) -> bool {
        event == PAYMENT_CAPTURED_EVENT || self.status() == Some(PAYMENT_CAPTURED_STATUS)
    }
}

/// Webhook delivery audit record.
///
/// # Database Table
///
/// Maps to the `webhook_logs` table. A row is inserted before the signature
/// is checked and updated exactly once with the final outcome.
///
/// `raw_body` holds the bytes exactly as received, so the signature can be
/// re-checked offline. `payload` is a queryable copy, present only when the
/// body is JSON that Postgres can store as `JSONB`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct WebhookLog {
    pub id: Uuid,
    pub event: String,
    pub raw_body: Vec<u8>,
    pub payload: Option<Value>,
    pub signature: Option<String>,
    pub processed: bool,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Audit row inserted when a delivery arrives.
#[derive(Debug, Clone)]
pub struct NewWebhookLog {
    pub event: String,
    pub raw_body: Vec<u8>,
    pub payload: Option<Value>,
    pub signature: Option<String>,
}

/// Final outcome written back onto the audit row.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookLogOutcome {
    pub status_code: u16,
    pub processed: bool,
    pub error_message: Option<String>,
    pub transaction_id: Option<Uuid>,
}
