//! One-shot notifications carried across a redirect.
//!
//! A form handler pushes a message and redirects; the next full page takes
//! the queue and renders it as toasts.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::stores::StoreError;

const SESSION_KEY: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "toast-success",
            Self::Info => "toast-info",
            Self::Error => "toast-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Queue a message for the next page view.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn push(
    session: &Session,
    level: FlashLevel,
    message: impl Into<String>,
) -> Result<(), StoreError> {
    let mut queue: Vec<Flash> = session.get(SESSION_KEY).await?.unwrap_or_default();
    queue.push(Flash {
        level,
        message: message.into(),
    });
    session.insert(SESSION_KEY, queue).await?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn success(session: &Session, message: impl Into<String>) -> Result<(), StoreError> {
    push(session, FlashLevel::Success, message).await
}

/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn error(session: &Session, message: impl Into<String>) -> Result<(), StoreError> {
    push(session, FlashLevel::Error, message).await
}

/// Drain the queue. Unreadable queues are dropped.
pub async fn take(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(SESSION_KEY).await {
        Ok(queue) => queue.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping unreadable flash queue");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_push_then_take_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        success(&session, "Added to cart").await.unwrap();
        error(&session, "Payment failed").await.unwrap();

        let taken = take(&session).await;
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].level, FlashLevel::Success);
        assert_eq!(taken[1].message, "Payment failed");

        assert!(take(&session).await.is_empty());
    }
}
