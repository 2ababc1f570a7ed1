//! Test utilities and fixtures for the payment integration tests.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`. The
//! store is a `MemoryStore` behind a wrapper that can fail on demand, and
//! the gateway and identity provider are fakes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

pub use report_payment_server::models::report::{Report, ReportStatus};
pub use report_payment_server::models::transaction::{
    NewTransaction, PaymentHistoryEntry, SuccessfulPayment, Transaction, TransactionStatus,
};
pub use report_payment_server::models::webhook::{NewWebhookLog, WebhookLog, WebhookLogOutcome};
use report_payment_server::routes;
use report_payment_server::services::gateway::{
    GatewayError, GatewayOrder, OrderRequest, PaymentGateway,
};
use report_payment_server::services::identity::{IdentityError, IdentityProvider, IdentityUser};
use report_payment_server::services::signature::{SignatureVerifier, order_signature, sign};
use report_payment_server::state::AppState;
use report_payment_server::store::{MemoryStore, PaymentStore, StoreError, StoreResult};

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

pub const USER_TOKEN: &str = "user-token";
pub const OTHER_TOKEN: &str = "other-token";
pub const USER_EMAIL: &str = "user@example.com";

pub fn user_id() -> Uuid {
    Uuid::from_u128(0x1111_1111_1111_1111_1111_1111_1111_1111)
}

pub fn other_user_id() -> Uuid {
    Uuid::from_u128(0x2222_2222_2222_2222_2222_2222_2222_2222)
}

// ------------------------------------------------------------------------
// Fakes
// ------------------------------------------------------------------------

/// Gateway that hands out sequential order ids and records every request.
#[derive(Default)]
pub struct FakeGateway {
    created: AtomicUsize,
    pub fail: AtomicBool,
    pub requests: Mutex<Vec<OrderRequest>>,
}

impl FakeGateway {
    pub fn orders_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<GatewayOrder, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 400,
                code: "BAD_REQUEST_ERROR".to_string(),
                description: "Authentication failed".to_string(),
            });
        }

        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_test_{n}"),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_string()),
        })
    }
}

/// Identity provider backed by a fixed token table.
pub struct StaticIdentity {
    users: HashMap<String, IdentityUser>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(
            USER_TOKEN.to_string(),
            IdentityUser {
                id: user_id(),
                email: Some(USER_EMAIL.to_string()),
            },
        );
        users.insert(
            OTHER_TOKEN.to_string(),
            IdentityUser {
                id: other_user_id(),
                email: None,
            },
        );
        Self { users }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        self.users
            .get(access_token)
            .cloned()
            .ok_or(IdentityError::Rejected)
    }
}

/// Memory store with switchable failures per operation.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_advance_report: AtomicBool,
    pub fail_insert_transaction: AtomicBool,
    pub fail_upsert: AtomicBool,
    pub fail_mark_success: AtomicBool,
    pub fail_list_payments: AtomicBool,
    pub fail_webhook_log: AtomicBool,
}

fn injected(flag: &AtomicBool, operation: &str) -> StoreResult<()> {
    if flag.load(Ordering::SeqCst) {
        Err(StoreError::Unavailable(format!("injected {operation} failure")))
    } else {
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for FlakyStore {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn find_reusable_report(&self, user_id: Uuid) -> StoreResult<Option<Report>> {
        self.inner.find_reusable_report(user_id).await
    }

    async fn insert_report(&self, user_id: Uuid, price: i64) -> StoreResult<Report> {
        self.inner.insert_report(user_id, price).await
    }

    async fn get_report(&self, report_id: Uuid) -> StoreResult<Option<Report>> {
        self.inner.get_report(report_id).await
    }

    async fn advance_report(
        &self,
        report_id: Uuid,
        target: ReportStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> StoreResult<u64> {
        injected(&self.fail_advance_report, "advance_report")?;
        self.inner.advance_report(report_id, target, paid_at).await
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction> {
        injected(&self.fail_insert_transaction, "insert_transaction")?;
        self.inner.insert_transaction(transaction).await
    }

    async fn upsert_successful_transaction(
        &self,
        payment: SuccessfulPayment,
    ) -> StoreResult<Transaction> {
        injected(&self.fail_upsert, "upsert")?;
        self.inner.upsert_successful_transaction(payment).await
    }

    async fn find_transaction_by_order(&self, order_id: &str) -> StoreResult<Option<Transaction>> {
        self.inner.find_transaction_by_order(order_id).await
    }

    async fn mark_transaction_success(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> StoreResult<u64> {
        injected(&self.fail_mark_success, "mark_transaction_success")?;
        self.inner.mark_transaction_success(order_id, payment_id).await
    }

    async fn list_payments(&self, user_id: Uuid) -> StoreResult<Vec<PaymentHistoryEntry>> {
        injected(&self.fail_list_payments, "list_payments")?;
        self.inner.list_payments(user_id).await
    }

    async fn get_transaction_for_user(
        &self,
        transaction_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<Transaction>> {
        self.inner
            .get_transaction_for_user(transaction_id, user_id)
            .await
    }

    async fn insert_webhook_log(&self, log: NewWebhookLog) -> StoreResult<Uuid> {
        injected(&self.fail_webhook_log, "insert_webhook_log")?;
        self.inner.insert_webhook_log(log).await
    }

    async fn finish_webhook_log(
        &self,
        log_id: Uuid,
        outcome: &WebhookLogOutcome,
    ) -> StoreResult<()> {
        self.inner.finish_webhook_log(log_id, outcome).await
    }
}

// ------------------------------------------------------------------------
// App harness
// ------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub store: Arc<FlakyStore>,
    pub gateway: Arc<FakeGateway>,
}

/// App with both gateway secrets configured.
pub fn spawn_app() -> TestApp {
    spawn_app_with_webhook_secret(Some(WEBHOOK_SECRET))
}

pub fn spawn_app_with_webhook_secret(webhook_secret: Option<&str>) -> TestApp {
    let store = Arc::new(FlakyStore::default());
    let gateway = Arc::new(FakeGateway::default());

    let state = AppState {
        store: store.clone(),
        gateway: gateway.clone(),
        identity: Arc::new(StaticIdentity::new()),
        verifier: Arc::new(SignatureVerifier::new(
            KEY_SECRET,
            webhook_secret.map(str::to_string),
        )),
        gateway_key_id: KEY_ID.to_string(),
    };

    TestApp {
        router: routes::router(state),
        store,
        gateway,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn create_order(&self, token: &str) -> (StatusCode, Value) {
        self.send_json(
            Request::builder()
                .method("POST")
                .uri("/api/razorpay/order")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn verify(&self, body: &Value) -> (StatusCode, Value) {
        self.send_json(
            Request::builder()
                .method("POST")
                .uri("/api/razorpay/verify")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn webhook(&self, body: &[u8], signature: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/razorpay/webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("x-razorpay-signature", signature);
        }

        let (status, bytes) = self
            .send(builder.body(Body::from(body.to_vec())).unwrap())
            .await;
        (status, String::from_utf8(bytes).unwrap())
    }

    /// Sends a correctly signed webhook delivery.
    pub async fn signed_webhook(&self, body: &[u8]) -> (StatusCode, String) {
        let signature = sign(WEBHOOK_SECRET, body);
        self.webhook(body, Some(&signature)).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send_json(builder.body(Body::empty()).unwrap()).await
    }

    pub fn report(&self, report_id: Uuid) -> Report {
        self.store
            .inner
            .reports()
            .into_iter()
            .find(|r| r.id == report_id)
            .unwrap()
    }

    pub fn transaction(&self, order_id: &str) -> Option<Transaction> {
        self.store
            .inner
            .transactions()
            .into_iter()
            .find(|t| t.razorpay_order_id == order_id)
    }

    pub fn webhook_logs(&self) -> Vec<WebhookLog> {
        self.store.inner.webhook_logs()
    }

    /// Runs order creation for the default user and returns `(order_id, report_id)`.
    pub async fn checkout(&self) -> (String, Uuid) {
        let (status, body) = self.create_order(USER_TOKEN).await;
        assert_eq!(status, StatusCode::OK, "order creation failed: {body}");
        let order_id = body["orderId"].as_str().unwrap().to_string();
        let report_id = body["reportId"].as_str().unwrap().parse().unwrap();
        (order_id, report_id)
    }
}

// ------------------------------------------------------------------------
// Payload builders
// ------------------------------------------------------------------------

/// Verify request body signed with the test key secret.
pub fn verify_body(order_id: &str, payment_id: &str, report_id: Uuid) -> Value {
    json!({
        "razorpay_order_id": order_id,
        "razorpay_payment_id": payment_id,
        "razorpay_signature": order_signature(KEY_SECRET, order_id, payment_id),
        "reportId": report_id,
    })
}

/// Raw bytes of a webhook delivery for one payment entity.
pub fn webhook_body(event: &str, order_id: &str, payment_id: &str, report_id: Uuid) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "entity": "event",
        "event": event,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "entity": "payment",
                    "amount": 49900,
                    "currency": "INR",
                    "status": if event == "payment.captured" { "captured" } else { "authorized" },
                    "order_id": order_id,
                    "notes": { "report_id": report_id.to_string(), "user_id": user_id().to_string() }
                }
            }
        },
        "created_at": 1_700_000_000
    }))
    .unwrap()
}

pub fn captured_webhook(order_id: &str, payment_id: &str, report_id: Uuid) -> Vec<u8> {
    webhook_body("payment.captured", order_id, payment_id, report_id)
}
