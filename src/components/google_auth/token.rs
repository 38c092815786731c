use super::models::StoredToken;
use crate::components::storage::{keys, StorageHandle};
use crate::error::AppResult;
use chrono::Utc;
use tracing::debug;

/// Persists the Google session token and hides it once expired
#[derive(Clone, Debug)]
pub struct TokenStore {
    storage: StorageHandle,
    key: String,
}

impl TokenStore {
    pub fn new(storage: StorageHandle) -> Self {
        Self {
            storage,
            key: keys::GOOGLE_AUTH_TOKEN.to_string(),
        }
    }

    /// Get the token if its access token is still valid
    pub async fn get(&self) -> AppResult<Option<StoredToken>> {
        self.get_at(Utc::now().timestamp()).await
    }

    /// Get the token if it is valid at the given unix time
    pub async fn get_at(&self, now: i64) -> AppResult<Option<StoredToken>> {
        match self.get_raw().await? {
            Some(token) if token.is_valid_at(now) => Ok(Some(token)),
            Some(_) => {
                debug!("Stored access token has expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Get the stored token regardless of expiry
    pub async fn get_raw(&self) -> AppResult<Option<StoredToken>> {
        self.storage.load_json(&self.key).await
    }

    /// Refresh token, which outlives the access token
    pub async fn refresh_token(&self) -> AppResult<Option<String>> {
        Ok(self.get_raw().await?.and_then(|token| token.refresh_token))
    }

    /// Store a token, replacing the previous one
    pub async fn set(&self, token: &StoredToken) -> AppResult<()> {
        self.storage.save_json(&self.key, token).await
    }

    /// Forget the token entirely
    pub async fn clear(&self) -> AppResult<()> {
        self.storage.delete(&self.key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::storage::{MemoryBackend, StorageActor};

    fn token(expires_at: i64, refresh: Option<&str>) -> StoredToken {
        StoredToken {
            access_token: "access".to_string(),
            expires_at,
            refresh_token: refresh.map(str::to_string),
            scope: None,
        }
    }

    #[tokio::test]
    async fn test_get_respects_expiry() {
        let store = TokenStore::new(StorageActor::spawn(Box::new(MemoryBackend::new())));
        assert!(store.get_at(0).await.unwrap().is_none());

        store.set(&token(10_000, Some("refresh"))).await.unwrap();
        assert!(store.get_at(5_000).await.unwrap().is_some());
        assert!(store.get_at(10_000).await.unwrap().is_none());

        // The refresh token stays available after expiry
        assert!(store.get_raw().await.unwrap().is_some());
        assert_eq!(
            store.refresh_token().await.unwrap().as_deref(),
            Some("refresh")
        );
    }

    #[tokio::test]
    async fn test_clear_removes_token() {
        let store = TokenStore::new(StorageActor::spawn(Box::new(MemoryBackend::new())));
        store.set(&token(i64::MAX / 2, None)).await.unwrap();
        assert!(store.get().await.unwrap().is_some());

        store.clear().await.unwrap();
        assert!(store.get_raw().await.unwrap().is_none());
        assert!(store.refresh_token().await.unwrap().is_none());
    }
}
