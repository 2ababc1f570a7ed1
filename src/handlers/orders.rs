//! Order creation endpoint.
//!
//! - POST /api/razorpay/order - Create a gateway order for the caller's report

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError, middleware::auth::AuthContext, models::payment::CreateOrderResponse,
    services::order_service, state::AppState,
};

/// Create a checkout order.
///
/// The request has no body; the user comes from the session.
///
/// # Response (200)
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
///
/// # Response (500)
///
/// `order_creation_failed` with a `details` string naming the failed step.
pub async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let order = order_service::create_order(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &state.gateway_key_id,
        auth.user_id,
    )
    .await?;

    Ok(Json(order))
}
