use super::backend::KeyValueBackend;
use crate::error::{storage_error, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// The storage actor that processes messages
pub struct StorageActor {
    backend: Box<dyn KeyValueBackend>,
    command_rx: mpsc::Receiver<StorageCommand>,
}

/// Commands that can be sent to the storage actor
pub enum StorageCommand {
    Get(String, oneshot::Sender<AppResult<Option<String>>>),
    Set(String, String, oneshot::Sender<AppResult<()>>),
    Delete(String, oneshot::Sender<AppResult<bool>>),
    Keys(String, oneshot::Sender<AppResult<Vec<String>>>),
    Shutdown,
}

/// Handle for communicating with the storage actor
#[derive(Clone)]
pub struct StorageHandle {
    command_tx: mpsc::Sender<StorageCommand>,
}

impl std::fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageHandle")
            .field("closed", &self.command_tx.is_closed())
            .finish()
    }
}

impl StorageHandle {
    /// Create a handle with no actor behind it; every call fails
    pub fn empty() -> Self {
        let (command_tx, _) = mpsc::channel(1);
        Self { command_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<AppResult<T>>) -> StorageCommand,
    ) -> AppResult<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(build(response_tx))
            .await
            .map_err(|e| storage_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| storage_error("Response channel closed"))?
    }

    /// Read a raw value
    pub async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let key = key.to_string();
        self.request(|tx| StorageCommand::Get(key, tx)).await
    }

    /// Write a raw value
    pub async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let key = key.to_string();
        self.request(|tx| StorageCommand::Set(key, value, tx)).await
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> AppResult<bool> {
        let key = key.to_string();
        self.request(|tx| StorageCommand::Delete(key, tx)).await
    }

    /// List keys with a prefix
    pub async fn keys(&self, prefix: &str) -> AppResult<Vec<String>> {
        let prefix = prefix.to_string();
        self.request(|tx| StorageCommand::Keys(prefix, tx)).await
    }

    /// Read and deserialize a JSON value
    pub async fn load_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.get(key).await? {
            Some(json) => {
                let value = serde_json::from_str(&json).map_err(|e| {
                    storage_error(&format!("Failed to deserialize {}: {}", key, e))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Serialize and write a JSON value
    pub async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| storage_error(&format!("Failed to serialize {}: {}", key, e)))?;
        self.set(key, json).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(StorageCommand::Shutdown).await;
        Ok(())
    }
}

impl StorageActor {
    /// Create a new actor and return its handle
    pub fn new(backend: Box<dyn KeyValueBackend>) -> (Self, StorageHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            backend,
            command_rx,
        };

        let handle = StorageHandle { command_tx };

        (actor, handle)
    }

    /// Spawn the actor on the runtime and return its handle
    pub fn spawn(backend: Box<dyn KeyValueBackend>) -> StorageHandle {
        let (mut actor, handle) = Self::new(backend);
        tokio::spawn(async move {
            actor.run().await;
        });
        handle
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Storage actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                StorageCommand::Get(key, response_tx) => {
                    debug!("GET {}", key);
                    let _ = response_tx.send(self.backend.get(&key).await);
                }
                StorageCommand::Set(key, value, response_tx) => {
                    debug!("SET {}", key);
                    let _ = response_tx.send(self.backend.set(&key, &value).await);
                }
                StorageCommand::Delete(key, response_tx) => {
                    debug!("DEL {}", key);
                    let _ = response_tx.send(self.backend.delete(&key).await);
                }
                StorageCommand::Keys(prefix, response_tx) => {
                    let _ = response_tx.send(self.backend.keys(&prefix).await);
                }
                StorageCommand::Shutdown => {
                    info!("Storage actor shutting down");
                    break;
                }
            }
        }

        info!("Storage actor shut down");
    }
}
