//! Pluggable TTL'd key/value cache
//!
//! OTP codes, attempt counters, per-phone tokens, and admin lockout state
//! all live in an external cache, never in process memory shared across
//! requests. The backend trait keeps the engine testable against the
//! in-memory implementation while production runs against Valkey/Redis.
//!
//! Key namespace:
//!
//! ```text
//! sms:code:<session>            one-time code            (TTL 300s)
//! sms:attempts:<session>        wrong-code counter       (TTL 300s)
//! sms:sended:<session>          resend cooldown flag     (TTL 60s)
//! auth:token:<phone>            per-phone RADIUS token
//! admin:login:attempts:<id>     operator login counter
//! admin:login:lockout:<id>      operator lockout-until timestamp
//! employee:<phone>              cached directory answer
//! ```

mod error;
mod memory;
mod valkey;

pub use error::CacheError;
pub use memory::MemoryCache;
pub use valkey::ValkeyCache;

use async_trait::async_trait;
use std::time::Duration;

/// Cache backend contract
///
/// `incr` must be atomic and must preserve an existing TTL; everything else
/// is last-write-wins, which the engine accepts for OTP state.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Value by key; `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value, optionally expiring after `ttl`
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Remove a key; succeeds whether or not it existed
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Atomic increment, creating the counter at 0 first if absent.
    /// Returns the new value.
    async fn incr(&self, key: &str) -> Result<i64, CacheError>;

    /// Set an expiry on an existing key; `false` when the key is absent
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Connectivity check
    async fn ping(&self) -> Result<(), CacheError>;

    /// Value decoded as UTF-8; invalid bytes surface as `InvalidValue`
    async fn get_string(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.get(key).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| CacheError::InvalidValue(e.to_string())),
            None => Ok(None),
        }
    }
}
