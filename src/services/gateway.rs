//! Payment gateway client.
//!
//! Only order creation is needed server-side: checkout happens in the
//! gateway's own modal and confirmation arrives through the verify endpoint
//! and the webhook.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Order request sent to the gateway.
///
/// # JSON Example
///
/// ```json
/// {
///   "amount": 49900,
///   "currency": "INR",
///   "receipt": "rpt_550e8400-e29b-41d4-a716-446655440000",
///   "payment_capture": 1,
///   "notes": {
///     "user_id": "660e8400-e29b-41d4-a716-446655440001",
///     "report_id": "550e8400-e29b-41d4-a716-446655440000"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    /// Amount in paise
    pub amount: i64,
    pub currency: String,
    pub receipt: String,

    /// 1 = capture automatically once authorized
    pub payment_capture: u8,

    /// Copied by the gateway onto every payment of the order, which is how
    /// the webhook finds the report without any local state.
    pub notes: OrderNotes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderNotes {
    pub user_id: Uuid,
    pub report_id: Uuid,
}

impl OrderRequest {
    pub fn for_report(user_id: Uuid, report_id: Uuid, amount: i64, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
            receipt: format!("rpt_{report_id}"),
            payment_capture: 1,
            notes: OrderNotes { user_id, report_id },
        }
    }
}

/// Order as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway rejected the request ({status}): {code} - {description}")]
    Api {
        status: u16,
        code: String,
        description: String,
    },

    #[error("invalid gateway base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a billable order. Callers must not retry this blindly.
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError>;
}

/// Razorpay Orders API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: reqwest::Client,
    orders_url: Url,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    /// Builds a client for `api_base` (e.g. `https://api.razorpay.com/v1`).
    ///
    /// # Timeout
    ///
    /// 10 seconds per request
    pub fn new(
        api_base: &str,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            orders_url: orders_url(api_base)?,
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn orders_url(api_base: &str) -> Result<Url, url::ParseError> {
    let base = if api_base.ends_with('/') {
        Url::parse(api_base)?
    } else {
        Url::parse(&format!("{api_base}/"))?
    };
    base.join("orders")
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        let response = self
            .client
            .post(self.orders_url.clone())
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = %status, "Gateway create_order response");

        if status.is_success() {
            let order: GatewayOrder = serde_json::from_str(&body).map_err(|e| GatewayError::Api {
                status: status.as_u16(),
                code: "MALFORMED_RESPONSE".to_string(),
                description: e.to_string(),
            })?;
            return Ok(order);
        }

        let detail = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error)
            .unwrap_or_else(|_| ErrorDetail {
                code: "UNKNOWN".to_string(),
                description: body,
            });
        tracing::error!(
            status = %status,
            code = %detail.code,
            description = %detail.description,
            "Gateway order creation failed"
        );

        Err(GatewayError::Api {
            status: status.as_u16(),
            code: detail.code,
            description: detail.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_request_carries_report_context() {
        let user_id = Uuid::new_v4();
        let report_id = Uuid::new_v4();

        let request = OrderRequest::for_report(user_id, report_id, 49_900, "INR");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "amount": 49900,
                "currency": "INR",
                "receipt": format!("rpt_{report_id}"),
                "payment_capture": 1,
                "notes": {
                    "user_id": user_id.to_string(),
                    "report_id": report_id.to_string()
                }
            })
        );
    }

    #[test]
    fn test_orders_url_keeps_version_segment() {
        assert_eq!(
            orders_url("https://api.razorpay.com/v1").unwrap().as_str(),
            "https://api.razorpay.com/v1/orders"
        );
        assert_eq!(
            orders_url("https://api.razorpay.com/v1/").unwrap().as_str(),
            "https://api.razorpay.com/v1/orders"
        );
        assert!(orders_url("not a url").is_err());
    }

    #[test]
    fn test_gateway_order_ignores_extra_fields() {
        let order: GatewayOrder = serde_json::from_value(json!({
            "id": "order_Nx1",
            "entity": "order",
            "amount": 49900,
            "amount_paid": 0,
            "currency": "INR",
            "receipt": "rpt_1",
            "status": "created",
            "attempts": 0,
            "notes": [],
            "created_at": 1700000000
        }))
        .unwrap();

        assert_eq!(order.id, "order_Nx1");
        assert_eq!(order.amount, 49_900);
    }
}
