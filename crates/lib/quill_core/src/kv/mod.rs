//! Key-value store port.
//!
//! Backs both the refresh-token liveness entries and the article cache.
//! Two adapters exist: [`RedisStore`] for the shared instance and
//! [`MemoryStore`] for single-process runs and tests.

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically read and delete `key`.
    ///
    /// Of any number of concurrent callers for the same key, at most one
    /// observes `Some`.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete every key matching a glob `pattern` (`*` wildcard). Returns the count.
    async fn delete_matching(&self, pattern: &str) -> Result<u64, StoreError>;
}
