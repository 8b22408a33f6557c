//! Per-connector serialization
//!
//! One async mutex per (station, connector) key. The guard is held
//! across the whole mutating operation, including its database awaits;
//! that is what makes the per-connector total order real rather than
//! advisory. Locks for different connectors are independent.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of per-connector mutexes, created lazily on first use.
pub struct ConnectorLockMap {
    locks: DashMap<(String, u32), Arc<Mutex<()>>>,
}

impl ConnectorLockMap {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the exclusive lock for a connector key. The returned
    /// guard keeps the lock until dropped.
    pub async fn lock(&self, station_id: &str, connector_id: u32) -> OwnedMutexGuard<()> {
        let key = (station_id.to_string(), connector_id);
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Number of distinct connector keys seen so far.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Default for ConnectorLockMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_connector_is_serialized() {
        let locks = Arc::new(ConnectorLockMap::new());
        let in_critical = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_critical = in_critical.clone();
            let max_seen = max_seen.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock("CP-001", 1).await;
                let now = in_critical.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_critical.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn different_connectors_are_independent() {
        let locks = ConnectorLockMap::new();
        let guard_a = locks.lock("CP-001", 1).await;
        // Must not deadlock: a different key has its own mutex.
        let guard_b = tokio::time::timeout(Duration::from_millis(100), locks.lock("CP-001", 2))
            .await
            .expect("different connector must not block");
        drop(guard_a);
        drop(guard_b);
        assert_eq!(locks.len(), 2);
    }
}
