#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use hovimestari::components::chat::{ChatModel, ChatModels, ChatReply, ChatRequest};
use hovimestari::components::google_auth::{AuthClient, StoredToken};
use hovimestari::components::storage::{MemoryBackend, StorageActor, StorageHandle};
use hovimestari::config::{Config, Endpoints, StorageBackendKind};
use hovimestari::error::{chat_error, AppResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Storage actor over an in-memory backend
pub fn memory_storage() -> StorageHandle {
    StorageActor::spawn(Box::new(MemoryBackend::new()))
}

/// Config pointing every remote API at a mock server
pub fn test_config(server_uri: &str) -> Config {
    Config {
        gemini_api_key: "test-gemini-key".to_string(),
        google_client_id: "test-client-id".to_string(),
        google_client_secret: "test-client-secret".to_string(),
        storage_backend: StorageBackendKind::Memory,
        timezone: "Europe/Helsinki".to_string(),
        endpoints: Endpoints {
            google_auth_url: format!("{}/o/oauth2/v2/auth", server_uri),
            google_token_url: format!("{}/token", server_uri),
            google_revoke_url: format!("{}/revoke", server_uri),
            google_userinfo_url: format!("{}/userinfo", server_uri),
            google_calendar_api: format!("{}/calendar/v3", server_uri),
            gemini_api: format!("{}/v1beta", server_uri),
        },
        ..Default::default()
    }
}

pub fn shared(config: Config) -> Arc<RwLock<Config>> {
    Arc::new(RwLock::new(config))
}

/// Auth client with a stored token that is valid for an hour
pub async fn signed_in_auth(config: Arc<RwLock<Config>>, storage: StorageHandle) -> AuthClient {
    let auth = AuthClient::new(config, storage);
    auth.tokens()
        .set(&StoredToken {
            access_token: "test-token".to_string(),
            expires_at: Utc::now().timestamp() + 3600,
            refresh_token: Some("test-refresh".to_string()),
            scope: None,
        })
        .await
        .unwrap();
    auth
}

/// Chat model answering from a script and recording what it was sent
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ChatReply>>,
    pub prompts: Mutex<Vec<String>>,
    pub preambles: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|text| ChatReply {
                        text: text.to_string(),
                        citations: Vec::new(),
                    })
                    .collect(),
            ),
            ..Default::default()
        })
    }

    pub fn last_preamble(&self) -> String {
        self.preambles.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest<'_>) -> AppResult<ChatReply> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        self.preambles.lock().unwrap().push(request.preamble.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| chat_error("script exhausted"))
    }
}

pub fn scripted_models(model: &Arc<ScriptedModel>) -> ChatModels {
    ChatModels {
        standard: model.clone(),
        grounded: None,
    }
}
