//! Identity provider client.
//!
//! Sessions are issued by the hosted auth service; this module only turns an
//! access token back into the user it belongs to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;
use uuid::Uuid;

/// User as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdentityUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("access token rejected")]
    Rejected,

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("invalid identity provider URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, access_token: &str) -> Result<IdentityUser, IdentityError>;
}

/// Resolves tokens through the auth service's `GET /auth/v1/user` endpoint.
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    user_url: Url,
    anon_key: String,
}

impl SupabaseIdentity {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        let user_url = Url::parse(base_url)?.join("/auth/v1/user")?;

        Ok(Self {
            client,
            user_url,
            anon_key: anon_key.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn resolve(&self, access_token: &str) -> Result<IdentityUser, IdentityError> {
        let response = self
            .client
            .get(self.user_url.clone())
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<IdentityUser>().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Rejected),
            status => Err(IdentityError::UnexpectedStatus(status.as_u16())),
        }
    }
}
