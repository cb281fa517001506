//! Valkey/Redis cache backend

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Valkey (or Redis) backed cache
///
/// `ConnectionManager` multiplexes one connection and reconnects on loss.
/// All keys are namespaced under a configurable prefix so several services
/// can share one instance.
///
/// Accepted URLs: `redis://host:port`, `redis://host:port/db`,
/// `rediss://host:port`, `unix:///path/to/socket`.
#[derive(Clone)]
pub struct ValkeyCache {
    conn: ConnectionManager,
    prefix: String,
}

impl ValkeyCache {
    /// Connect to the cache service
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client =
            Client::open(url).map_err(|e| CacheError::Connection(format!("Invalid cache URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(format!("Cache unreachable: {}", e)))?;

        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheBackend for ValkeyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(self.key(key)).await?)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => Ok(conn
                .set_ex(self.key(key), value, ttl.as_secs().max(1))
                .await?),
            None => Ok(conn.set(self.key(key), value).await?),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.del(self.key(key)).await?)
    }

    async fn incr(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(self.key(key), 1).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        Ok(conn
            .expire(self.key(key), ttl.as_secs().max(1) as i64)
            .await?)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        Ok(redis::cmd("PING").query_async(&mut conn).await?)
    }
}

impl std::fmt::Debug for ValkeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyCache")
            .field("prefix", &self.prefix)
            .finish()
    }
}
