use super::{ChatModel, ChatReply, ChatRequest};
use crate::components::instances::ChatRole;
use crate::error::{chat_error, AppResult};
use async_trait::async_trait;
use rig::completion::{Chat, Message};
use rig::providers::gemini::Client as GeminiClient;
use tracing::{debug, info};

/// Gemini chat through rig's Gemini provider
pub struct GeminiChatModel {
    client: GeminiClient,
}

impl GeminiChatModel {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: GeminiClient::new(api_key),
        }
    }
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn complete(&self, request: ChatRequest<'_>) -> AppResult<ChatReply> {
        info!("Sending chat to Gemini model {}", request.model);

        let mut builder = self
            .client
            .agent(request.model)
            .preamble(request.preamble)
            .temperature(request.temperature);

        if let Some(max_tokens) = request.max_output_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        let agent = builder.build();

        let history: Vec<Message> = request
            .history
            .iter()
            .map(|message| match message.role {
                ChatRole::User => Message::user(message.content.clone()),
                ChatRole::Assistant => Message::assistant(message.content.clone()),
            })
            .collect();

        let text = agent
            .chat(request.prompt.to_string(), history)
            .await
            .map_err(|e| chat_error(&format!("Gemini request failed: {}", e)))?;

        debug!("Received {} chars from Gemini", text.len());

        Ok(ChatReply {
            text,
            citations: Vec::new(),
        })
    }
}
