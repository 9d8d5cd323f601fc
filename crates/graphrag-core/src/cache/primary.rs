//! The primary (distributed) cache tier's contract. Kept as a trait object
//! so the two-tier cache doesn't depend on any particular backend; the
//! reference deployment talks to a networked cache service over HTTP, but
//! nothing in this crate hard-codes that.

use std::time::Duration;

use async_trait::async_trait;

/// Distributed cache backend. Implementations own their own connection
/// pooling and per-op timeout (documented contract: ≤ 1s).
#[async_trait]
pub trait PrimaryCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, String>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), String>;
    async fn invalidate(&self, key: &str) -> Result<(), String>;
}

/// A primary tier that always misses. Used when no distributed cache is
/// configured (`Config::primary_cache_url` is `None`); the two-tier cache
/// then behaves as a pure in-process LRU.
pub struct NullPrimaryCache;

#[async_trait]
impl PrimaryCache for NullPrimaryCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, String> {
        Ok(None)
    }
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), String> {
        Ok(())
    }
    async fn invalidate(&self, _key: &str) -> Result<(), String> {
        Ok(())
    }
}
