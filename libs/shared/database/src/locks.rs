use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::StoreError;

const PRUNE_THRESHOLD: usize = 1024;

/// Per-key mutual exclusion for booking-affecting writes.
///
/// Keys are always acquired in ascending order, so two callers asking for
/// overlapping key sets cannot deadlock. Acquisition of the whole set is
/// bounded by the configured timeout.
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

/// Guards for every key of one acquisition; released on drop.
#[derive(Debug)]
pub struct LockSet<K> {
    keys: Vec<K>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl<K> LockSet<K> {
    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

impl<K> KeyedLocks<K>
where
    K: Ord + Hash + Clone + Debug,
{
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub async fn acquire<I>(&self, keys: I) -> Result<LockSet<K>, StoreError>
    where
        I: IntoIterator<Item = K>,
    {
        let ordered: Vec<K> = keys.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let mutexes: Vec<Arc<AsyncMutex<()>>> = ordered.iter().map(|key| self.slot(key)).collect();

        let acquisition = async move {
            let mut guards = Vec::with_capacity(mutexes.len());
            for mutex in mutexes {
                guards.push(mutex.lock_owned().await);
            }
            guards
        };

        match tokio::time::timeout(self.timeout, acquisition).await {
            Ok(guards) => {
                debug!("Acquired {} lock(s): {:?}", ordered.len(), ordered);
                Ok(LockSet {
                    keys: ordered,
                    _guards: guards,
                })
            }
            Err(_) => {
                warn!("Timed out acquiring locks {:?}", ordered);
                Err(StoreError::LockTimeout {
                    keys: format!("{:?}", ordered),
                })
            }
        }
    }

    fn slot(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if slots.len() > PRUNE_THRESHOLD {
            slots.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        }

        slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disjoint_keys_do_not_block() {
        let locks: KeyedLocks<u32> = KeyedLocks::new(Duration::from_millis(50));
        let first = locks.acquire([1, 2]).await.unwrap();
        let second = locks.acquire([3]).await.unwrap();
        assert_eq!(first.keys(), &[1, 2]);
        assert_eq!(second.keys(), &[3]);
    }

    #[tokio::test]
    async fn test_held_key_times_out() {
        let locks: KeyedLocks<u32> = KeyedLocks::new(Duration::from_millis(20));
        let _held = locks.acquire([5]).await.unwrap();

        let err = locks.acquire([4, 5]).await.unwrap_err();
        assert!(matches!(err, StoreError::LockTimeout { .. }));

        // Partially acquired key 4 must have been released.
        assert!(locks.acquire([4]).await.is_ok());
    }

    #[tokio::test]
    async fn test_release_on_drop() {
        let locks: KeyedLocks<&'static str> = KeyedLocks::new(Duration::from_millis(20));
        {
            let _guard = locks.acquire(["vet"]).await.unwrap();
        }
        assert!(locks.acquire(["vet", "vet"]).await.is_ok());
    }
}
