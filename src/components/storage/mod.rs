mod actor;
mod backend;

pub use actor::{StorageActor, StorageCommand, StorageHandle};
pub use backend::{KeyValueBackend, MemoryBackend, RedisBackend};

use crate::config::{Config, StorageBackendKind};
use crate::error::AppResult;

/// Storage keys shared across components
pub mod keys {
    pub const GOOGLE_AUTH_TOKEN: &str = "google_auth:token";
    pub const INSTANCES: &str = "instances";
    pub const INSTANCE_PREFIX: &str = "instance:";
}

/// Build the backend selected in the configuration and spawn its actor
pub fn start_storage(config: &Config) -> AppResult<StorageHandle> {
    let backend: Box<dyn KeyValueBackend> = match config.storage_backend {
        StorageBackendKind::Redis => Box::new(RedisBackend::new(&config.redis_url)?),
        StorageBackendKind::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            Box::new(MemoryBackend::new())
        }
    };

    Ok(StorageActor::spawn(backend))
}
