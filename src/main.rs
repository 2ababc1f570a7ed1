//! Report Payment Service - Main Application Entry Point
//!
//! This is a REST API server that sells the detailed career risk report. It creates gateway orders, verifies checkout results and reconciles gateway webhooks.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Payment Gateway**: Razorpay over its REST API
//! - **Authentication**: Supabase session tokens
//! - **Format**: JSON requests/responses, plain text for the webhook
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the gateway and identity clients
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

use std::sync::Arc;

use report_payment_server::{
    config::Config,
    db, routes,
    services::{gateway::RazorpayClient, identity::SupabaseIdentity},
    state::AppState,
    store::PgStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration from environment variables
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    if config.razorpay_webhook_secret.is_none() {
        tracing::warn!("RAZORPAY_WEBHOOK_SECRET is not set; every webhook delivery will be rejected");
    }

    // Create database connection pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Run pending migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let gateway = RazorpayClient::new(
        &config.razorpay_api_base,
        config.razorpay_key_id.clone(),
        config.razorpay_key_secret.clone(),
    )?;
    let identity = SupabaseIdentity::new(&config.supabase_url, config.supabase_anon_key.clone())?;

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        gateway: Arc::new(gateway),
        identity: Arc::new(identity),
        verifier: Arc::new(config.signature_verifier()),
        gateway_key_id: config.razorpay_key_id.clone(),
    };

    let app = routes::router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
