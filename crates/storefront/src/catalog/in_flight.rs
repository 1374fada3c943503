//! Guard against fetching the same page twice at once.
//!
//! Infinite scroll fires a request when the sentinel comes into view; a fast
//! scroll can fire it again before the first response lands. The load-more
//! handler takes a guard keyed by visitor and page, and a second request for
//! the same key gets nothing back instead of a duplicate page.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Registry of keys with a fetch in progress.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` when a fetch for it is already running.
    #[must_use]
    pub fn try_begin(&self, key: impl Into<String>) -> Option<InFlightGuard> {
        let key = key.into();
        let inserted = self
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());

        inserted.then(|| InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    /// Whether a fetch for `key` is running.
    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Releases its key when dropped, including on early return or panic.
#[derive(Debug)]
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_refused() {
        let in_flight = InFlight::new();
        let guard = in_flight.try_begin("session-1:page-2");
        assert!(guard.is_some());
        assert!(in_flight.try_begin("session-1:page-2").is_none());
        assert!(in_flight.try_begin("session-2:page-2").is_some());
    }

    #[test]
    fn test_drop_releases() {
        let in_flight = InFlight::new();
        {
            let _guard = in_flight.try_begin("k");
            assert!(in_flight.is_active("k"));
        }
        assert!(!in_flight.is_active("k"));
        assert!(in_flight.try_begin("k").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_get_one_guard() {
        const TASKS: usize = 8;
        let in_flight = InFlight::new();
        let claimed_all = Arc::new(tokio::sync::Barrier::new(TASKS));
        let mut handles = Vec::new();
        for _ in 0..TASKS {
            let in_flight = in_flight.clone();
            let claimed_all = Arc::clone(&claimed_all);
            handles.push(tokio::spawn(async move {
                let guard = in_flight.try_begin("page-3");
                let claimed = guard.is_some();
                // Nobody releases until every task has tried.
                claimed_all.wait().await;
                drop(guard);
                claimed
            }));
        }

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
        assert!(!in_flight.is_active("page-3"));
    }
}
