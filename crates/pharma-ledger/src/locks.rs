//! # Per-Key Lock Registry
//!
//! Serializes writers that touch the same logical key while leaving
//! unrelated keys fully concurrent.
//!
//! ## Why Not Rely on SQLite Alone
//! SQLite serializes at the whole-database level, so two sales against
//! different medicines would still contend and one would surface as
//! `Busy`. Taking a per-(store, medicine) lock first keeps the
//! read-plan-write sequence of one ledger atomic without funneling all
//! traffic through a single mutex, and turns most `Busy` collisions
//! into ordinary lock waits.
//!
//! ## Deadlock Avoidance
//! Multi-key operations (a sale with several lines) must acquire their
//! guards through [`KeyLocks::lock_many`], which sorts and dedups the
//! keys so every writer takes them in the same order.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

// =============================================================================
// Key Locks
// =============================================================================

/// A registry of async mutexes, one per logical key.
///
/// Lock entries are created on first use and kept for the lifetime of
/// the registry; the key space (stores x medicines actually traded) is
/// small enough that eviction is not worth the complexity.
#[derive(Debug, Default)]
pub struct KeyLocks<K> {
    entries: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> KeyLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        KeyLocks {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.entry(key.clone()).or_default().clone()
    }

    /// Acquires the guard for one key, waiting if another task holds it.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        self.entry(key).lock_owned().await
    }

    /// Acquires guards for several keys in a canonical (sorted, deduped)
    /// order. Holding all returned guards serializes against any other
    /// writer that shares at least one key.
    pub async fn lock_many(&self, keys: &[K]) -> Vec<OwnedMutexGuard<()>> {
        let mut ordered: Vec<K> = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in &ordered {
            guards.push(self.entry(key).lock_owned().await);
        }
        guards
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(KeyLocks::new());
        let counter = Arc::new(AtomicI64::new(0));
        let peak = Arc::new(AtomicI64::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&(1i64, 7i64)).await;
                let in_flight = counter.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(in_flight, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = Arc::new(KeyLocks::new());

        let _first = locks.lock(&1i64).await;
        // A second key must be acquirable while the first is held
        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock(&2i64)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_lock_many_dedups() {
        let locks: KeyLocks<i64> = KeyLocks::new();
        let guards = locks.lock_many(&[3, 1, 3, 2, 1]).await;
        assert_eq!(guards.len(), 3);
    }
}
