//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! insights-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `WEBHOOK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Webhook migrations: `crates/webhooks/migrations/`
//!
//! ```text
//! migrations/
//! ├── 20261015000000_create_webhook_tables.sql
//! └── ...
//! ```

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run webhook database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing, the database is
/// unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = database_url()?;

    tracing::info!("Connecting to webhook database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running webhook migrations...");
    sqlx::migrate!("../webhooks/migrations").run(&pool).await?;

    tracing::info!("Webhook migrations complete!");
    Ok(())
}

fn database_url() -> Result<SecretString, MigrationError> {
    std::env::var("WEBHOOK_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("WEBHOOK_DATABASE_URL"))
}
