use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per user id. A service that reads, rewrites and stores a
/// per-user document holds the user's guard for the whole cycle.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on are only referenced by the map.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Users with a held or awaited lock.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn given_held_lock_when_same_user_locks_then_waits_until_release() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.lock("ada").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("ada").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn given_held_lock_when_other_user_locks_then_proceeds() {
        let locks = UserLocks::new();
        let _ada = locks.lock("ada").await;
        let _grace = tokio::time::timeout(Duration::from_millis(100), locks.lock("grace"))
            .await
            .unwrap();
        assert_eq!(locks.active(), 2);
    }
}
