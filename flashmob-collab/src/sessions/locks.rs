use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per session, so read-check-write sequences on the same session run one at a time
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive access to a session. The entry is dropped from the map once nobody holds or waits for it.
pub struct SessionGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a SessionLocks,
    session_id: String,
}

impl SessionLocks {
    /// Waits for exclusive access to a session
    pub async fn lock(&self, session_id: &str) -> SessionGuard<'_> {
        // The map entry must be released before waiting
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();

        SessionGuard {
            guard: Some(lock.lock_owned().await),
            locks: self,
            session_id: session_id.to_string(),
        }
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        // New lockers clone under the shard lock, so the count can't grow while this runs
        self.locks
            .locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::SessionLocks;

    #[tokio::test]
    async fn test_same_session_is_exclusive() {
        let locks = SessionLocks::default();
        let _guard = locks.lock("S20260001").await;

        let second = tokio::time::timeout(Duration::from_millis(20), locks.lock("S20260001")).await;
        assert!(second.is_err(), "second lock should wait");

        let other = tokio::time::timeout(Duration::from_millis(20), locks.lock("S20260002")).await;
        assert!(other.is_ok(), "other sessions are independent");
    }

    #[tokio::test]
    async fn test_unused_entries_are_dropped() {
        let locks = SessionLocks::default();

        drop(locks.lock("S20260001").await);
        assert!(locks.locks.is_empty());

        let first = locks.lock("S20260001").await;
        let (done, waiting) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                drop(first);
                locks.locks.contains_key("S20260001")
            },
            locks.lock("S20260001"),
        );
        assert!(done, "the entry stays while someone waits on it");

        drop(waiting);
        assert!(locks.locks.is_empty());
    }
}
