//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

use crate::services::signature::SignatureVerifier;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `RAZORPAY_KEY_ID` (required): public gateway key, handed to the checkout modal
/// - `RAZORPAY_KEY_SECRET` (required): gateway API secret, also signs checkout results
/// - `RAZORPAY_WEBHOOK_SECRET` (optional): webhook body secret; without it every delivery is rejected
/// - `RAZORPAY_API_BASE` (optional): defaults to `https://api.razorpay.com/v1`
/// - `SUPABASE_URL` (required): identity provider base URL
/// - `SUPABASE_ANON_KEY` (required): identity provider public key
#[derive(Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub razorpay_key_id: String,

    pub razorpay_key_secret: String,

    #[serde(default)]
    pub razorpay_webhook_secret: Option<String>,

    #[serde(default = "default_razorpay_api_base")]
    pub razorpay_api_base: String,

    pub supabase_url: String,

    pub supabase_anon_key: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_razorpay_api_base() -> String {
    "https://api.razorpay.com/v1".to_string()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .field("server_port", &self.server_port)
            .field("razorpay_key_id", &self.razorpay_key_id)
            .field("razorpay_key_secret", &"<redacted>")
            .field(
                "razorpay_webhook_secret",
                &self.razorpay_webhook_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("razorpay_api_base", &self.razorpay_api_base)
            .field("supabase_url", &self.supabase_url)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: razorpay_key_id -> RAZORPAY_KEY_ID
        envy::from_env::<Config>()
    }

    /// Verifier holding both gateway secrets.
    pub fn signature_verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(
            self.razorpay_key_secret.clone(),
            self.razorpay_webhook_secret.clone(),
        )
    }
}
