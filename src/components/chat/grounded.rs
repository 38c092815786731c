use super::{ChatModel, ChatReply, ChatRequest};
use crate::components::instances::ChatRole;
use crate::error::{chat_error, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

/// Gemini `generateContent` with Google Search grounding.
///
/// rig does not expose grounding metadata, so this talks to the REST API directly.
pub struct GroundedGeminiModel {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GroundedGeminiModel {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize, Default)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize, Default)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize, Default)]
struct WebSource {
    #[serde(default)]
    uri: Option<String>,
}

impl GenerateResponse {
    fn into_reply(self) -> AppResult<ChatReply> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| chat_error("Gemini returned no candidates"))?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let mut citations: Vec<String> = Vec::new();
        for uri in candidate
            .grounding_metadata
            .into_iter()
            .flat_map(|metadata| metadata.grounding_chunks)
            .filter_map(|chunk| chunk.web.and_then(|web| web.uri))
        {
            if !citations.contains(&uri) {
                citations.push(uri);
            }
        }

        Ok(ChatReply { text, citations })
    }
}

#[async_trait]
impl ChatModel for GroundedGeminiModel {
    async fn complete(&self, request: ChatRequest<'_>) -> AppResult<ChatReply> {
        info!("Sending search-grounded chat to Gemini model {}", request.model);

        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|message| Content {
                role: match message.role {
                    ChatRole::User => "user",
                    ChatRole::Assistant => "model",
                },
                parts: vec![Part {
                    text: &message.content,
                }],
            })
            .collect();
        contents.push(Content {
            role: "user",
            parts: vec![Part {
                text: request.prompt,
            }],
        });

        let mut generation_config = json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_output_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        let body = json!({
            "systemInstruction": { "parts": [{ "text": request.preamble }] },
            "contents": contents,
            "tools": [{ "google_search": {} }],
            "generationConfig": generation_config,
        });

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            urlencoding::encode(request.model)
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| chat_error(&format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(chat_error(&format!(
                "Gemini request failed: HTTP {} - {}",
                status, error_body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| chat_error(&format!("Failed to parse Gemini response: {}", e)))?;

        let reply = parsed.into_reply()?;
        debug!("Gemini reply cites {} sources", reply.citations.len());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_reply_joins_parts_and_dedups_citations() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://a.example", "title": "A" } },
                        { "web": { "uri": "https://b.example" } },
                        { "web": { "uri": "https://a.example" } },
                        { "retrievedContext": {} }
                    ]
                }
            }]
        }))
        .unwrap();

        let reply = response.into_reply().unwrap();
        assert_eq!(reply.text, "Hello world");
        assert_eq!(
            reply.citations,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_into_reply_without_candidates_fails() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.into_reply().is_err());
    }
}
