//! PostgreSQL pool and schema migrations.
//!
//! Only `PgStore` talks to the pool; everything else goes through the
//! `PaymentStore` trait.

use std::time::Duration;

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// Create the connection pool.
///
/// # Configuration
///
/// - Maximum connections: 5
/// - Acquire timeout: 5 seconds, so a saturated pool fails a request
///   instead of stalling a webhook delivery until the gateway times out
///
/// # Errors
///
/// Returns an error if the URL is invalid or the server cannot be reached.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Apply the SQL files in `migrations/` that have not run yet.
///
/// Applied migrations are tracked in `_sqlx_migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
