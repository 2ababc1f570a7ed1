//! Shared handler state.

use std::sync::Arc;

use crate::services::gateway::PaymentGateway;
use crate::services::identity::IdentityProvider;
use crate::services::signature::SignatureVerifier;
use crate::store::PaymentStore;

/// Everything a handler may need, injected through axum's `State`.
///
/// Holds no mutable data of its own; all coordination between requests
/// happens through the store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PaymentStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    pub verifier: Arc<SignatureVerifier>,

    /// Public gateway key returned to the browser with each order
    pub gateway_key_id: String,
}
