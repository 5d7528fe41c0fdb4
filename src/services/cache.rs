use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::DeploymentConfig;
use crate::services::repository::{ConfigSource, StoreError};

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// Implements L1 (in-memory) and L2 (Redis) caching strategy.
/// L1 is fastest but limited in size, L2 is shared across instances.
/// Without Redis the manager degrades to L1 only.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a new cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// Create an L1-only cache manager
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);

                // Populate L1 cache
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;

                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }
}

fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
    moka::future::CacheBuilder::new(l1_size)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a deployment configuration
    pub fn config(deployment_id: &str) -> String {
        format!("config:{}", deployment_id)
    }
}

/// Config source that serves lookups from the cache first
///
/// Only found configurations are cached. A cached configuration is served
/// until its TTL (`cache.ttl_secs`) expires, so edits made by the owning API
/// take effect on the first run after expiry. Cache failures are logged and
/// bypassed so they never fail a matching run.
pub struct CachedConfigSource {
    inner: Arc<dyn ConfigSource>,
    cache: Arc<CacheManager>,
}

impl CachedConfigSource {
    pub fn new(inner: Arc<dyn ConfigSource>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ConfigSource for CachedConfigSource {
    async fn get_config(&self, deployment_id: &str) -> Result<Option<DeploymentConfig>, StoreError> {
        let key = CacheKey::config(deployment_id);

        match self.cache.get::<DeploymentConfig>(&key).await {
            Ok(config) => return Ok(Some(config)),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Config cache lookup failed for {}: {}", deployment_id, e),
        }

        let config = self.inner.get_config(deployment_id).await?;

        if let Some(config) = &config {
            if let Err(e) = self.cache.set(&key, config).await {
                tracing::warn!("Failed to cache config for {}: {}", deployment_id, e);
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryStore;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: String = cache.get(key).await.unwrap();
        assert_eq!(result, value);
    }

    #[tokio::test]
    async fn test_l1_only_cache() {
        let cache = CacheManager::in_memory(10, 60);

        cache.set("k", &42u32).await.unwrap();
        assert_eq!(cache.get::<u32>("k").await.unwrap(), 42);
        assert!(matches!(cache.get::<u32>("missing").await, Err(CacheError::CacheMiss(_))));
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::config("team-a"), "config:team-a");
    }

    #[tokio::test]
    async fn test_cached_config_is_served_until_ttl_expires() {
        let store = Arc::new(InMemoryStore::new());
        store.set_config(DeploymentConfig::new("team-a", 2)).await;

        let cached = CachedConfigSource::new(store.clone(), Arc::new(CacheManager::in_memory(10, 1)));

        let first = cached.get_config("team-a").await.unwrap().unwrap();
        assert_eq!(first.meeting_size, 2);

        store.set_config(DeploymentConfig::new("team-a", 4)).await;
        let cached_value = cached.get_config("team-a").await.unwrap().unwrap();
        assert_eq!(cached_value.meeting_size, 2);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let fresh = cached.get_config("team-a").await.unwrap().unwrap();
        assert_eq!(fresh.meeting_size, 4);
    }

    #[tokio::test]
    async fn test_missing_config_is_not_cached() {
        let store = Arc::new(InMemoryStore::new());
        let cached = CachedConfigSource::new(store.clone(), Arc::new(CacheManager::in_memory(10, 60)));

        assert!(cached.get_config("team-b").await.unwrap().is_none());

        store.set_config(DeploymentConfig::new("team-b", 3)).await;
        assert_eq!(cached.get_config("team-b").await.unwrap().unwrap().meeting_size, 3);
    }
}
