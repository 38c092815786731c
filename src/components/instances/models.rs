use crate::components::chat::GenerationSettings;
use crate::config::DEFAULT_GEMINI_MODEL;
use crate::error::{instance_error, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registry entry for one PIN-protected instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub name: String,
    pub pin_hash: String,
    pub salt: String,
    pub created_at: DateTime<Utc>,
}

/// Per-instance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceSettings {
    pub assistant_name: String,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: Option<u64>,
    pub system_prompt: String,
    pub search_grounding: bool,
    pub calendar_sync: bool,
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self {
            assistant_name: "Hovimestari".to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: 0.7,
            max_output_tokens: None,
            system_prompt: "You are a helpful personal assistant. Answer concisely and in the user's language.".to_string(),
            search_grounding: false,
            calendar_sync: true,
        }
    }
}

impl InstanceSettings {
    /// Settings that shape model output
    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            assistant_name: self.assistant_name.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            system_prompt: self.system_prompt.clone(),
            search_grounding: self.search_grounding,
        }
    }

    /// Set one setting from its textual form
    pub fn set(&mut self, key: &str, value: &str) -> AppResult<()> {
        let value = value.trim();
        match key {
            "name" | "assistant_name" => {
                if value.is_empty() {
                    return Err(instance_error("Assistant name cannot be empty"));
                }
                self.assistant_name = value.to_string();
            }
            "model" => {
                if value.is_empty() {
                    return Err(instance_error("Model cannot be empty"));
                }
                self.model = value.to_string();
            }
            "temperature" => {
                let temperature = value
                    .parse::<f64>()
                    .ok()
                    .filter(|t| (0.0..=2.0).contains(t))
                    .ok_or_else(|| instance_error("Temperature must be a number between 0 and 2"))?;
                self.temperature = temperature;
            }
            "max_tokens" | "max_output_tokens" => {
                self.max_output_tokens = match value {
                    "" | "none" | "default" => None,
                    other => Some(
                        other
                            .parse::<u64>()
                            .ok()
                            .filter(|n| *n > 0)
                            .ok_or_else(|| instance_error("max_tokens must be a positive number"))?,
                    ),
                };
            }
            "prompt" | "system_prompt" => self.system_prompt = value.to_string(),
            "search" | "search_grounding" => self.search_grounding = parse_bool(value)?,
            "calendar" | "calendar_sync" => self.calendar_sync = parse_bool(value)?,
            other => return Err(instance_error(&format!("Unknown setting: {}", other))),
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> AppResult<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(instance_error(&format!("Expected on/off, got '{}'", other))),
    }
}

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One persisted chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub citations: Vec<String>,
}

impl ChatMessage {
    pub fn user(content: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: content.to_string(),
            timestamp: Utc::now(),
            citations: Vec::new(),
        }
    }

    pub fn assistant(content: &str, citations: Vec<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.to_string(),
            timestamp: Utc::now(),
            citations,
        }
    }
}

/// A text document attached to an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub content: String,
    pub added_at: DateTime<Utc>,
}

impl Document {
    pub fn new(name: &str, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            content,
            added_at: Utc::now(),
        }
    }
}

/// Free-text memory injected into the prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStore {
    pub information: String,
    pub permanent_requests: String,
    pub temporary_requests: String,
}

/// One of the three memory fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryField {
    Information,
    PermanentRequests,
    TemporaryRequests,
}

impl MemoryStore {
    pub fn field(&self, field: MemoryField) -> &str {
        match field {
            MemoryField::Information => &self.information,
            MemoryField::PermanentRequests => &self.permanent_requests,
            MemoryField::TemporaryRequests => &self.temporary_requests,
        }
    }

    fn field_mut(&mut self, field: MemoryField) -> &mut String {
        match field {
            MemoryField::Information => &mut self.information,
            MemoryField::PermanentRequests => &mut self.permanent_requests,
            MemoryField::TemporaryRequests => &mut self.temporary_requests,
        }
    }

    /// Append a line to a field
    pub fn append(&mut self, field: MemoryField, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let target = self.field_mut(field);
        if !target.is_empty() && !target.ends_with('\n') {
            target.push('\n');
        }
        target.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.information.trim().is_empty()
            && self.permanent_requests.trim().is_empty()
            && self.temporary_requests.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_set_values() {
        let mut settings = InstanceSettings::default();

        settings.set("temperature", "0.2").unwrap();
        assert_eq!(settings.temperature, 0.2);
        assert!(settings.set("temperature", "3").is_err());

        settings.set("search", "on").unwrap();
        assert!(settings.search_grounding);

        settings.set("max_tokens", "512").unwrap();
        assert_eq!(settings.max_output_tokens, Some(512));
        settings.set("max_tokens", "none").unwrap();
        assert_eq!(settings.max_output_tokens, None);

        assert!(settings.set("colour", "blue").is_err());
        assert!(settings.set("name", "  ").is_err());
    }

    #[test]
    fn test_settings_deserialize_fills_defaults() {
        let settings: InstanceSettings = serde_json::from_str(r#"{"model":"gemini-pro"}"#).unwrap();
        assert_eq!(settings.model, "gemini-pro");
        assert_eq!(settings.assistant_name, "Hovimestari");
        assert!(settings.calendar_sync);
    }

    #[test]
    fn test_memory_append() {
        let mut memory = MemoryStore::default();
        assert!(memory.is_empty());

        memory.append(MemoryField::Information, "Likes coffee");
        memory.append(MemoryField::Information, " Has a cat ");
        memory.append(MemoryField::Information, "   ");

        assert_eq!(memory.information, "Likes coffee\nHas a cat");
        assert_eq!(memory.field(MemoryField::PermanentRequests), "");
        assert!(!memory.is_empty());
    }
}
