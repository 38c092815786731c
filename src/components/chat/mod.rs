//! Conversation with the language model: model backends, prompt context,
//! the running session and calendar actions parsed from replies.

pub mod action;
mod gemini;
mod grounded;
pub mod prompt;
mod session;

pub use action::{parse_action, CalendarAction, EventDraft};
pub use gemini::GeminiChatModel;
pub use grounded::GroundedGeminiModel;
pub use prompt::{build_preamble, PromptContext};
pub use session::{ChatSession, ChatTurn};

use crate::components::instances::ChatMessage;
use crate::error::AppResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Settings that shape generation; changing any of them re-initializes the session
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub assistant_name: String,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: Option<u64>,
    pub system_prompt: String,
    pub search_grounding: bool,
}

/// One completion request
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub preamble: &'a str,
    pub history: &'a [ChatMessage],
    pub prompt: &'a str,
    pub temperature: f64,
    pub max_output_tokens: Option<u64>,
}

/// Model reply with any grounding citations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub citations: Vec<String>,
}

/// A chat-completion backend
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest<'_>) -> AppResult<ChatReply>;
}

/// The standard model and the optional search-grounded one
#[derive(Clone)]
pub struct ChatModels {
    pub standard: Arc<dyn ChatModel>,
    pub grounded: Option<Arc<dyn ChatModel>>,
}

impl ChatModels {
    /// Gemini backends for an API key
    pub fn gemini(api_key: &str, gemini_api: &str, with_grounding: bool) -> Self {
        Self {
            standard: Arc::new(GeminiChatModel::new(api_key)),
            grounded: with_grounding
                .then(|| Arc::new(GroundedGeminiModel::new(api_key, gemini_api)) as Arc<dyn ChatModel>),
        }
    }
}
