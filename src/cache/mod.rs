//! Key/value cache with per-key expiry.
//!
//! Services receive an `Arc<dyn Cache>` so the backend can be swapped for a
//! shared store without touching them. Values are JSON text.

mod in_memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use in_memory::InMemoryCache;

#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns `None` on a miss or when the entry has expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Reads and decodes a JSON value. Undecodable entries count as a miss.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> Result<Option<T>> {
    let Some(raw) = cache.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
            Ok(None)
        }
    }
}

pub async fn set_json<T: Serialize>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, raw, ttl).await
}

/// Cache key identifying a whole request: method, path and raw query string.
pub fn request_key(method: &str, path: &str, query: Option<&str>) -> String {
    format!("{}:{}?{}", method, path, query.unwrap_or(""))
}
