//! HTTP router assembly.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Largest webhook body accepted. Payment events are a few KiB.
pub const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

/// Build the application router.
///
/// # Routes
///
/// Public:
/// - `GET /health`
/// - `POST /api/razorpay/verify` (the checkout signature is the credential)
/// - `POST /api/razorpay/webhook` (the body signature is the credential)
///
/// Session required:
/// - `POST /api/razorpay/order`
/// - `GET /api/payments`
/// - `GET /api/payments/receipt/{id}`
pub fn router(state: AppState) -> Router {
    // Create authenticated routes
    let session_routes = Router::new()
        .route("/api/razorpay/order", post(handlers::orders::create_order))
        .route("/api/payments", get(handlers::payments::list_payments))
        .route(
            "/api/payments/receipt/{id}",
            get(handlers::payments::get_receipt),
        )
        // Apply session middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Public routes (no session required)
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/razorpay/verify",
            post(handlers::payments::verify_payment),
        )
        .route(
            "/api/razorpay/webhook",
            post(handlers::webhooks::receive_webhook)
                .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT)),
        )
        .merge(session_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
