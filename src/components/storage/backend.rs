use crate::error::{storage_error, AppResult};
use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Key-value store holding all persisted application data
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// List keys starting with the prefix, sorted
    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>>;
}

/// Redis-backed store
pub struct RedisBackend {
    client: RedisClient,
}

impl RedisBackend {
    /// Create a new Redis backend; the connection is opened lazily
    pub fn new(redis_url: &str) -> AppResult<Self> {
        info!("Using Redis storage at {}", redis_url);

        let client = RedisClient::open(redis_url)
            .map_err(|e| storage_error(&format!("Failed to create Redis client: {}", e)))?;

        Ok(Self { client })
    }

    /// Get a Redis connection from the client
    async fn get_connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| storage_error(&format!("Failed to connect to Redis: {}", e)))
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.get_connection().await?;

        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| storage_error(&format!("Redis GET error: {}", e)))
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut conn = self.get_connection().await?;

        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| storage_error(&format!("Redis SET error: {}", e)))
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.get_connection().await?;

        let removed: i64 = conn
            .del(key)
            .await
            .map_err(|e| storage_error(&format!("Redis DEL error: {}", e)))?;

        Ok(removed > 0)
    }

    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let mut conn = self.get_connection().await?;

        let mut keys: Vec<String> = conn
            .keys(format!("{}*", prefix))
            .await
            .map_err(|e| storage_error(&format!("Redis KEYS error: {}", e)))?;

        keys.sort();
        Ok(keys)
    }
}

/// In-process store, used when no Redis is available and in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    /// Create an empty memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.data
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.data.lock().await.remove(key).is_some())
    }

    async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let data = self.data.lock().await;
        Ok(data
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_roundtrip() {
        let backend = MemoryBackend::new();

        assert_eq!(backend.get("missing").await.unwrap(), None);

        backend.set("instance:a:memory", "{}").await.unwrap();
        backend.set("instance:a:chat", "[]").await.unwrap();
        backend.set("instance:b:chat", "[]").await.unwrap();

        assert_eq!(
            backend.get("instance:a:memory").await.unwrap(),
            Some("{}".to_string())
        );
        assert_eq!(
            backend.keys("instance:a:").await.unwrap(),
            vec!["instance:a:chat".to_string(), "instance:a:memory".to_string()]
        );

        assert!(backend.delete("instance:a:chat").await.unwrap());
        assert!(!backend.delete("instance:a:chat").await.unwrap());
        assert_eq!(backend.keys("instance:a:").await.unwrap().len(), 1);
    }
}
