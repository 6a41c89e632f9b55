//! Per-user turn serialization.
//!
//! Only one turn runs per user at a time. A second message arriving while a
//! turn is in flight waits for the permit.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Each user id maps to a `Semaphore(1)`. Holding the permit grants
/// exclusive access to that user's session for one turn.
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for the turn lock of `user_id`. The permit releases on drop.
    pub async fn acquire(&self, user_id: &str) -> Result<OwnedSemaphorePermit, SessionBusy> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(user_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await.map_err(|_| SessionBusy {
            user_id: user_id.to_owned(),
        })
    }

    /// Number of tracked users (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop locks nobody holds or waits on.
    ///
    /// Permits and waiters each keep a clone of the semaphore, so a strong
    /// count of one means the map holds the only reference.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1);
    }
}

/// The user's turn lock was torn down while waiting.
#[derive(Debug, thiserror::Error)]
#[error("turn lock for user {user_id} was closed")]
pub struct SessionBusy {
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();

        let permit1 = map.acquire("u1").await.unwrap();
        drop(permit1);

        let permit2 = map.acquire("u1").await.unwrap();
        drop(permit2);
    }

    #[tokio::test]
    async fn different_users_concurrent() {
        let map = Arc::new(SessionLockMap::new());

        let p1 = map.acquire("u1").await.unwrap();
        let p2 = map.acquire("u2").await.unwrap();

        assert_eq!(map.session_count(), 2);

        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_user_waits() {
        let map = Arc::new(SessionLockMap::new());
        let map2 = map.clone();

        let p1 = map.acquire("u1").await.unwrap();

        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire("u1").await.unwrap();
            42
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        drop(p1);

        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let map = SessionLockMap::new();
        let held = map.acquire("busy").await.unwrap();
        drop(map.acquire("idle").await.unwrap());

        map.prune_idle();
        assert_eq!(map.session_count(), 1);

        drop(held);
        map.prune_idle();
        assert_eq!(map.session_count(), 0);
    }
}
