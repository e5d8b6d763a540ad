use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tokio::sync::RwLock;
use tracing::debug;

use crate::StoreError;

/// Async in-memory table standing in for the persistence store.
///
/// Readers get cloned snapshots; writers go through [`InMemoryTable::modify`],
/// which applies a fallible mutation to a copy of the row and only commits it
/// when the mutation succeeds.
pub struct InMemoryTable<K, V> {
    name: &'static str,
    rows: RwLock<HashMap<K, V>>,
}

impl<K, V> InMemoryTable<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.rows.read().await.get(key).cloned()
    }

    pub async fn contains(&self, key: &K) -> bool {
        self.rows.read().await.contains_key(key)
    }

    pub async fn insert(&self, key: K, value: V) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                table: self.name,
                key: format!("{:?}", key),
            });
        }
        debug!("Inserting row {:?} into {}", key, self.name);
        rows.insert(key, value);
        Ok(())
    }

    /// Runs `f` against a copy of the row stored under `key` and writes the
    /// copy back only if `f` returns `Ok`. Returns `None` when the key is unknown.
    pub async fn modify<R, E, F>(&self, key: &K, f: F) -> Option<Result<R, E>>
    where
        F: FnOnce(&mut V) -> Result<R, E>,
    {
        let mut rows = self.rows.write().await;
        let current = rows.get(key)?;
        let mut draft = current.clone();

        let outcome = f(&mut draft);
        if outcome.is_ok() {
            debug!("Updating row {:?} in {}", key, self.name);
            rows.insert(key.clone(), draft);
        }
        Some(outcome)
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        let removed = self.rows.write().await.remove(key);
        if removed.is_some() {
            debug!("Removed row {:?} from {}", key, self.name);
        }
        removed
    }

    pub async fn scan<F>(&self, predicate: F) -> Vec<V>
    where
        F: Fn(&V) -> bool,
    {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}
