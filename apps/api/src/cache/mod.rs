//! Response cache shared by the public read endpoints and the CV builder.
//!
//! Values are stored as JSON strings behind a [`CacheStore`] so the same
//! code path serves the in-memory store (development) and Redis (production).
//! Cache failures are never surfaced to clients: they are logged and the
//! request proceeds as a miss.

pub mod memory;
pub mod redis_store;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Lists and details of content items.
pub const CONTENT_TTL: Duration = Duration::from_secs(300);
/// Lookups that change rarely: languages, categories, tags, profile, CV JSON.
pub const LOOKUP_TTL: Duration = Duration::from_secs(600);
/// Assembled CV documents.
pub const CV_TTL: Duration = Duration::from_secs(3600);

const CONTENT_PREFIXES: &[&str] = &["/api/", "cv:"];

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    /// Removes every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
    fn backend_name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Connects to Redis when a URL is given, falling back to the in-memory
    /// store when Redis is unset or unreachable.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let Some(url) = redis_url else {
            info!("Cache configured with in-memory store");
            return Self::in_memory();
        };
        match RedisStore::connect(url).await {
            Ok(store) => {
                info!("Cache configured with Redis");
                Self::new(Arc::new(store))
            }
            Err(e) => {
                warn!("Redis unavailable ({e}), falling back to in-memory cache");
                Self::in_memory()
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!("Cache HIT: {key}");
                    Some(value)
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {key}: {e}");
                    None
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {key}");
                None
            }
            Err(e) => {
                warn!("Cache read failed for {key}: {e}");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let result = match serde_json::to_string(value) {
            Ok(raw) => self.store.set(key, raw, ttl).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Cache write failed for {key}: {e}");
        }
    }

    /// Returns the cached value for `key`, or runs `load`, caches its
    /// successful result for `ttl` and returns it. Errors from `load` are
    /// returned unchanged and never cached.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get_json(key).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.set_json(key, &value, ttl).await;
        Ok(value)
    }

    /// Drops every cached content response and assembled CV. Called after
    /// each successful admin write.
    pub async fn invalidate_content(&self) {
        let mut removed = 0;
        for prefix in CONTENT_PREFIXES {
            match self.store.delete_prefix(prefix).await {
                Ok(n) => removed += n,
                Err(e) => warn!("Failed to invalidate cache prefix {prefix}: {e}"),
            }
        }
        info!("Invalidated {removed} cached content entries");
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.clear().await?;
        info!("Cleared all cache entries ({})", self.backend_name());
        Ok(())
    }

    /// Writes and reads back a sentinel key.
    pub async fn is_healthy(&self) -> bool {
        let key = "health_check";
        if let Err(e) = self
            .store
            .set(key, "\"ok\"".to_string(), Duration::from_secs(10))
            .await
        {
            warn!("Cache health check failed: {e}");
            return false;
        }
        matches!(self.store.get(key).await, Ok(Some(v)) if v == "\"ok\"")
    }
}

/// Key for endpoints whose output depends on language and list filters.
/// Missing filters are spelled `all` so equivalent requests share an entry.
pub fn lang_key(path: &str, lang: &str, kind: Option<&str>, category: Option<&str>) -> String {
    format!(
        "{path}:{lang}:{}:{}",
        kind.unwrap_or("all"),
        category.unwrap_or("all")
    )
}

/// Key for assembled CV documents.
pub fn cv_key(profile_slug: &str, lang: &str) -> String {
    format!("cv:{profile_slug}:{lang}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_key_fills_missing_filters() {
        assert_eq!(
            lang_key("/api/projects", "en", None, Some("work")),
            "/api/projects:en:all:work"
        );
    }

    #[test]
    fn test_cv_key_format() {
        assert_eq!(cv_key("default", "es"), "cv:default:es");
    }

    #[tokio::test]
    async fn test_get_or_load_caches_success_only() {
        let cache = ResponseCache::in_memory();

        let first: Result<Vec<i32>, String> = cache
            .get_or_load("/api/x", CONTENT_TTL, || async { Ok(vec![1, 2]) })
            .await;
        assert_eq!(first.unwrap(), vec![1, 2]);

        // Loader is not consulted on a hit.
        let second: Result<Vec<i32>, String> = cache
            .get_or_load("/api/x", CONTENT_TTL, || async { Err("should not run".to_string()) })
            .await;
        assert_eq!(second.unwrap(), vec![1, 2]);

        let failed: Result<Vec<i32>, String> = cache
            .get_or_load("/api/y", CONTENT_TTL, || async { Err("boom".to_string()) })
            .await;
        assert!(failed.is_err());
        assert!(cache.get_json::<Vec<i32>>("/api/y").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_content_keeps_unrelated_keys() {
        let cache = ResponseCache::in_memory();
        cache.set_json("/api/projects:es:all:all", &1, CONTENT_TTL).await;
        cache.set_json("cv:default:es", &2, CV_TTL).await;
        cache.set_json("session-note", &3, CV_TTL).await;

        cache.invalidate_content().await;

        assert!(cache.get_json::<i32>("/api/projects:es:all:all").await.is_none());
        assert!(cache.get_json::<i32>("cv:default:es").await.is_none());
        assert_eq!(cache.get_json::<i32>("session-note").await, Some(3));
    }

    #[tokio::test]
    async fn test_in_memory_health_check() {
        assert!(ResponseCache::in_memory().is_healthy().await);
    }
}
