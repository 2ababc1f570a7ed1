//! Session authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the access token from the Authorization header or session cookie
//! 2. Resolve it to a user through the identity provider
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Cookie the web client stores its access token in.
pub const SESSION_COOKIE: &str = "sb-access-token";

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Identity provider user id
    ///
    /// Used to scope every report and transaction query to the caller
    pub user_id: Uuid,

    /// Email on file with the identity provider, if any
    pub email: Option<String>,
}

/// Session authentication middleware function.
///
/// # Flow
///
/// 1. Take the token from `Authorization: Bearer <token>`, else from the session cookie
/// 2. Ask the identity provider who the token belongs to
/// 3. If resolved: inject `AuthContext` into request, call next handler
/// 4. Otherwise: return 401 Unauthorized
///
/// Identity provider outages also end in 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = access_token(request.headers()).ok_or(AppError::Unauthorized)?;

    let user = state.identity.resolve(&token).await.map_err(|e| {
        tracing::warn!("Authentication failed: {}", e);
        AppError::Unauthorized
    })?;

    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(AuthContext {
        user_id: user.id,
        email: user.email,
    });

    Ok(next.run(request).await)
}

fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
