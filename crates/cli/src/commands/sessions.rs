//! Session store maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Delete sessions past their expiry
//! ap-cli sessions prune
//!
//! # Show how many sessions are stored
//! ap-cli sessions count
//! ```

use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Delete every expired session row.
///
/// Carts, favorites and tokens live in the session, so this is the only
/// cleanup the storefront's data needs.
pub async fn prune() -> Result<(), CommandError> {
    let pool = connect().await?;
    let before = count_rows(&pool).await?;

    PostgresStore::new(pool.clone()).delete_expired().await?;

    let after = count_rows(&pool).await?;
    tracing::info!(
        removed = before.saturating_sub(after),
        remaining = after,
        "Expired sessions pruned"
    );
    Ok(())
}

/// Log the number of stored and live sessions.
pub async fn count() -> Result<(), CommandError> {
    let pool = connect().await?;
    let total = count_rows(&pool).await?;
    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tower_sessions.session WHERE expiry_date > NOW()",
    )
    .fetch_one(&pool)
    .await?;

    tracing::info!(total, live, "Session store");
    Ok(())
}

async fn count_rows(pool: &sqlx::PgPool) -> Result<i64, CommandError> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM tower_sessions.session")
            .fetch_one(pool)
            .await?,
    )
}
