use super::action::{parse_action, CalendarAction};
use super::prompt::{build_preamble, PromptContext};
use super::{ChatModel, ChatModels, ChatRequest, GenerationSettings};
use crate::components::instances::{ChatMessage, MAX_CHAT_HISTORY};
use crate::error::{chat_error, AppResult};
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Most recent messages replayed to the model on each turn
pub const HISTORY_WINDOW: usize = 40;

/// Result of one exchange with the model
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// Reply text with any action block removed
    pub reply: String,
    pub citations: Vec<String>,
    pub action: Option<CalendarAction>,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
}

/// A running conversation with the model
pub struct ChatSession {
    models: ChatModels,
    settings: GenerationSettings,
    context: PromptContext,
    preamble: String,
    history: Vec<ChatMessage>,
    tz: Tz,
}

impl ChatSession {
    pub fn new(
        models: ChatModels,
        settings: GenerationSettings,
        context: PromptContext,
        history: Vec<ChatMessage>,
        tz: Tz,
    ) -> Self {
        let preamble = build_preamble(&settings, &context, Utc::now().with_timezone(&tz));
        info!(
            "Chat session started with model {} ({} messages of history)",
            settings.model,
            history.len()
        );

        Self {
            models,
            settings,
            context,
            preamble,
            history,
            tz,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    fn rebuild_preamble(&mut self) {
        self.preamble = build_preamble(
            &self.settings,
            &self.context,
            Utc::now().with_timezone(&self.tz),
        );
    }

    /// Apply new generation settings; returns whether the session was re-initialized
    pub fn update_settings(&mut self, settings: GenerationSettings) -> bool {
        if settings == self.settings {
            return false;
        }

        info!(
            "Re-initializing chat session: model {} -> {}, temperature {} -> {}, search grounding {}",
            self.settings.model,
            settings.model,
            self.settings.temperature,
            settings.temperature,
            settings.search_grounding
        );
        self.settings = settings;
        self.rebuild_preamble();
        true
    }

    /// Replace memory, documents and events in the prompt
    pub fn refresh_context(&mut self, context: PromptContext) {
        debug!(
            "Refreshing chat context: {} documents, {} events",
            context.documents.len(),
            context.events.len()
        );
        self.context = context;
        self.rebuild_preamble();
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn model(&self) -> Arc<dyn ChatModel> {
        match (&self.models.grounded, self.settings.search_grounding) {
            (Some(grounded), true) => grounded.clone(),
            (None, true) => {
                warn!("Search grounding requested but not available; using the standard model");
                self.models.standard.clone()
            }
            _ => self.models.standard.clone(),
        }
    }

    /// Send a user message and record both sides of the exchange
    pub async fn send(&mut self, text: &str) -> AppResult<ChatTurn> {
        let text = text.trim();
        if text.is_empty() {
            return Err(chat_error("Message cannot be empty"));
        }

        // The preamble carries the current time
        self.rebuild_preamble();

        let window_start = self.history.len().saturating_sub(HISTORY_WINDOW);
        let request = ChatRequest {
            model: &self.settings.model,
            preamble: &self.preamble,
            history: &self.history[window_start..],
            prompt: text,
            temperature: self.settings.temperature,
            max_output_tokens: self.settings.max_output_tokens,
        };

        let reply = self.model().complete(request).await?;
        let (visible, action) = parse_action(&reply.text);

        let user_message = ChatMessage::user(text);
        let assistant_message = ChatMessage::assistant(&visible, reply.citations.clone());
        self.history.push(user_message.clone());
        self.history.push(assistant_message.clone());
        if self.history.len() > MAX_CHAT_HISTORY {
            let excess = self.history.len() - MAX_CHAT_HISTORY;
            self.history.drain(..excess);
        }

        Ok(ChatTurn {
            reply: visible,
            citations: reply.citations,
            action,
            user_message,
            assistant_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::chat::ChatReply;
    use crate::components::instances::{ChatRole, InstanceSettings};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records requests and answers with a fixed reply
    struct FixedModel {
        reply: ChatReply,
        seen: Mutex<Vec<(String, String, usize)>>,
    }

    impl FixedModel {
        fn new(text: &str, citations: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                reply: ChatReply {
                    text: text.to_string(),
                    citations: citations.iter().map(|c| c.to_string()).collect(),
                },
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn complete(&self, request: ChatRequest<'_>) -> AppResult<ChatReply> {
            self.seen.lock().unwrap().push((
                request.model.to_string(),
                request.prompt.to_string(),
                request.history.len(),
            ));
            Ok(self.reply.clone())
        }
    }

    fn session(standard: Arc<FixedModel>, grounded: Option<Arc<FixedModel>>) -> ChatSession {
        ChatSession::new(
            ChatModels {
                standard,
                grounded: grounded.map(|g| g as Arc<dyn ChatModel>),
            },
            InstanceSettings::default().generation(),
            PromptContext::default(),
            Vec::new(),
            chrono_tz::UTC,
        )
    }

    #[tokio::test]
    async fn test_send_records_history_and_action() {
        let standard = FixedModel::new(
            "Added.\n```json\n{\"action\": \"delete_event\", \"title\": \"Gym\"}\n```",
            &[],
        );
        let mut session = session(standard.clone(), None);

        let turn = session.send("  remove gym  ").await.unwrap();
        assert_eq!(turn.reply, "Added.");
        assert!(matches!(turn.action, Some(CalendarAction::DeleteEvent { .. })));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].role, ChatRole::User);
        assert_eq!(session.history()[0].content, "remove gym");
        assert_eq!(session.history()[1].content, "Added.");

        session.send("again").await.unwrap();
        let seen = standard.seen.lock().unwrap();
        assert_eq!(seen[0].2, 0);
        assert_eq!(seen[1].2, 2);

        assert!(session.send("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_grounded_model_used_when_enabled() {
        let standard = FixedModel::new("plain", &[]);
        let grounded = FixedModel::new("searched", &["https://example.com"]);
        let mut session = session(standard.clone(), Some(grounded.clone()));

        assert_eq!(session.send("hi").await.unwrap().reply, "plain");

        let mut settings = session.settings().clone();
        settings.search_grounding = true;
        assert!(session.update_settings(settings.clone()));
        assert!(!session.update_settings(settings));

        let turn = session.send("weather?").await.unwrap();
        assert_eq!(turn.reply, "searched");
        assert_eq!(turn.citations, vec!["https://example.com".to_string()]);
        assert_eq!(turn.assistant_message.citations, turn.citations);
        assert_eq!(grounded.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_grounding_falls_back_without_grounded_model() {
        let standard = FixedModel::new("plain", &[]);
        let mut session = session(standard, None);

        let mut settings = session.settings().clone();
        settings.search_grounding = true;
        settings.assistant_name = "Jeeves".to_string();
        session.update_settings(settings);

        assert!(session.preamble().starts_with("Your name is Jeeves."));
        assert_eq!(session.send("hi").await.unwrap().reply, "plain");
    }

    #[tokio::test]
    async fn test_history_window_is_bounded() {
        let standard = FixedModel::new("ok", &[]);
        let history = (0..HISTORY_WINDOW + 10)
            .map(|i| ChatMessage::user(&format!("message {}", i)))
            .collect();
        let mut session = ChatSession::new(
            ChatModels {
                standard: standard.clone(),
                grounded: None,
            },
            InstanceSettings::default().generation(),
            PromptContext::default(),
            history,
            chrono_tz::UTC,
        );

        session.send("latest").await.unwrap();
        assert_eq!(standard.seen.lock().unwrap()[0].2, HISTORY_WINDOW);
    }

    #[tokio::test]
    async fn test_in_memory_history_is_capped() {
        let standard = FixedModel::new("ok", &[]);
        let history = (0..MAX_CHAT_HISTORY)
            .map(|i| ChatMessage::user(&format!("message {}", i)))
            .collect();
        let mut session = ChatSession::new(
            ChatModels {
                standard,
                grounded: None,
            },
            InstanceSettings::default().generation(),
            PromptContext::default(),
            history,
            chrono_tz::UTC,
        );

        session.send("one more").await.unwrap();
        session.send("and another").await.unwrap();

        assert_eq!(session.history().len(), MAX_CHAT_HISTORY);
        assert_eq!(session.history()[0].content, "message 4");
        assert_eq!(session.history()[MAX_CHAT_HISTORY - 1].content, "ok");
    }
}
