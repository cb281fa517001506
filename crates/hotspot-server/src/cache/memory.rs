//! In-memory cache backend

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// HashMap-backed cache for single-process deployments and tests
///
/// Uses `tokio::sync::RwLock`; expired entries are filtered on read and
/// reaped by `cleanup_expired`.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    store: Arc<RwLock<HashMap<String, Entry>>>,
}

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    expires_at: Option<SystemTime>,
}

impl Entry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        Entry {
            data,
            expires_at: ttl.map(|ttl| SystemTime::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|at| SystemTime::now() > at)
            .unwrap_or(false)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries; call periodically on long-lived processes
    pub async fn cleanup_expired(&self) {
        let mut store = self.store.write().await;
        store.retain(|_, entry| !entry.is_expired());
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let store = self.store.read().await;
        Ok(store
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.data.clone()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        store.insert(key.to_string(), Entry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut store = self.store.write().await;
        store.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut store = self.store.write().await;

        let (current, expires_at) = match store.get(key) {
            Some(entry) if !entry.is_expired() => {
                let text = std::str::from_utf8(&entry.data)
                    .map_err(|e| CacheError::InvalidValue(e.to_string()))?;
                let value = text
                    .parse::<i64>()
                    .map_err(|e| CacheError::InvalidValue(e.to_string()))?;
                (value, entry.expires_at)
            }
            _ => (0, None),
        };

        let next = current + 1;
        store.insert(
            key.to_string(),
            Entry {
                data: next.to_string().into_bytes(),
                // counters keep whatever expiry they were seeded with
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut store = self.store.write().await;
        match store.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.expires_at = Some(SystemTime::now() + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
