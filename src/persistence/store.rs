//! Asynchronous key-value store seam.
//!
//! The whole crate persists through this trait: the session log, the filter toggles and the
//! completion-popup preference are each one JSON value under a string key.

use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Capacity of the change-notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A key written through [`KeyValueStore::set`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub new_value: Value,
}

/// Durable mapping from string key to JSON value
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError>;

    /// Write every entry of `items`
    async fn set(&self, items: Map<String, Value>) -> Result<(), StoreError>;

    /// Subscribe to writes made through this store
    fn changes(&self) -> broadcast::Receiver<StoreChange>;

    /// Fetch one key
    async fn get_one(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let mut found = self.get(&[key]).await?;
        Ok(found.remove(key))
    }

    /// Write one key
    async fn set_one(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut items = Map::new();
        items.insert(key.to_string(), value);
        self.set(items).await
    }
}

/// Publish one change per written key; nobody listening is fine
pub(crate) fn publish_changes(tx: &broadcast::Sender<StoreChange>, items: &Map<String, Value>) {
    for (key, value) in items {
        let _ = tx.send(StoreChange {
            key: key.clone(),
            new_value: value.clone(),
        });
    }
}

/// In-memory store, optionally failing every call to simulate an unavailable backend
pub struct MemoryStore {
    data: Mutex<Map<String, Value>>,
    available: AtomicBool,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            data: Mutex::new(Map::new()),
            available: AtomicBool::new(true),
            changes,
        }
    }

    /// Seed the store without publishing change notifications
    pub fn with_value(self, key: &str, value: Value) -> Self {
        self.lock().insert(key.to_string(), value);
        self
    }

    /// Make subsequent calls fail with [`StoreError::Unavailable`]
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Current contents, bypassing availability
    pub fn snapshot(&self) -> Map<String, Value> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Map<String, Value>> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store switched off".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
        self.check_available()?;
        let data = self.lock();
        Ok(keys
            .iter()
            .filter_map(|k| data.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, items: Map<String, Value>) -> Result<(), StoreError> {
        self.check_available()?;
        {
            let mut data = self.lock();
            for (key, value) in &items {
                data.insert(key.clone(), value.clone());
            }
        }
        publish_changes(&self.changes, &items);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_get_set() {
        let store = MemoryStore::new();
        store.set_one("a", json!(1)).await.unwrap();
        store.set_one("b", json!({"x": true})).await.unwrap();

        let got = store.get(&["a", "missing"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!(1));
        assert_eq!(store.get_one("b").await.unwrap(), Some(json!({"x": true})));
        assert_eq!(store.get_one("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_unavailable() {
        let store = MemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.get_one("a").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.set_one("a", json!(1)).await.is_err());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_publishes_changes() {
        let store = MemoryStore::new();
        let mut rx = store.changes();
        store.set_one("pref", json!(false)).await.unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, "pref");
        assert_eq!(change.new_value, json!(false));
    }
}
