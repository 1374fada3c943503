//! Session table migration.
//!
//! # Usage
//!
//! ```bash
//! ap-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the
//!   session store (falls back to `DATABASE_URL`)

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Create the `tower_sessions` schema and table if they do not exist.
///
/// Safe to run on every deploy.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session store migrations complete!");
    Ok(())
}
