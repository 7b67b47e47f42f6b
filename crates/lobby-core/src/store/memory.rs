//! In-process channel store
//!
//! Keeps set semantics per key, the same as the Redis-backed store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

use crate::traits::ChannelStore;
use crate::LobbyResult;

/// Channel store held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn key_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check whether `value` is stored under `key`
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|values| values.contains(value))
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn add(&self, key: &str, value: &str) -> LobbyResult<()> {
        self.entries
            .lock()
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str, value: &str) -> LobbyResult<()> {
        let mut entries = self.entries.lock();
        if let Some(values) = entries.get_mut(key) {
            values.remove(value);
            if values.is_empty() {
                entries.remove(key);
            }
        }
        Ok(())
    }

    async fn remove_all(&self, key: &str) -> LobbyResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn load(&self, key: &str) -> LobbyResult<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .get(key)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_semantics() {
        let store = MemoryStore::new();
        store.add("channel:front-1", "a").await.unwrap();
        store.add("channel:front-1", "a").await.unwrap();
        store.add("channel:front-1", "b").await.unwrap();

        assert_eq!(
            store.load("channel:front-1").await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        store.remove("channel:front-1", "a").await.unwrap();
        store.remove("channel:front-1", "b").await.unwrap();
        assert_eq!(store.key_count(), 0);
        assert!(store.load("channel:front-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_remove_all() {
        let store = MemoryStore::new();
        store.add("k", "1").await.unwrap();
        store.add("k", "2").await.unwrap();

        store.remove_all("k").await.unwrap();
        assert!(!store.contains("k", "1"));
        assert_eq!(store.key_count(), 0);
    }
}
