//! Ollama story producer (OpenAI-compatible API)

use async_trait::async_trait;
use regex_lite::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

use crate::infrastructure::ports::{ProducerError, StoryProducerPort, StoryPrompt};

/// Client for Ollama's OpenAI-compatible API
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

/// Default Ollama base URL.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Default model for Ollama.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        // Use 120 second timeout for LLM requests (they can be slow)
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create client from environment variables.
    ///
    /// Uses `OLLAMA_BASE_URL` and `OLLAMA_MODEL` environment variables,
    /// falling back to defaults if not set.
    pub fn from_env() -> Self {
        let base_url = std::env::var("OLLAMA_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OLLAMA_BASE_URL.to_string());
        let model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string());
        Self::new(&base_url, &model)
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_BASE_URL, DEFAULT_OLLAMA_MODEL)
    }
}

#[async_trait]
impl StoryProducerPort for OllamaClient {
    async fn produce(&self, prompt: &StoryPrompt) -> Result<serde_json::Value, ProducerError> {
        let api_request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            temperature: prompt.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ProducerError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| ProducerError::RequestFailed(e.to_string()))?;
            return Err(ProducerError::RequestFailed(error_text));
        }

        let api_response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| ProducerError::InvalidResponse(e.to_string()))?;

        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ProducerError::InvalidResponse("No completion choices".to_string()))?;

        extract_json_payload(content)
    }
}

// Matches a fenced block like ```json ... ``` (language tag optional)
static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid regex"));

/// Pull the first JSON object out of raw model output.
///
/// Models wrap payloads in code fences or surround them with prose; this
/// strips fences first, then falls back to the outermost brace span.
pub fn extract_json_payload(raw: &str) -> Result<serde_json::Value, ProducerError> {
    let candidate = match CODE_FENCE_RE.captures(raw) {
        Some(caps) => caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        None => raw.trim().to_string(),
    };

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&candidate) {
        if value.is_object() {
            return Ok(value);
        }
    }

    // Fallback: outermost brace span, the way tool-call payloads are fished
    // out of free-form completions.
    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&candidate[start..=end]) {
                if value.is_object() {
                    return Ok(value);
                }
            }
        }
    }

    Err(ProducerError::InvalidResponse(
        "No JSON object found in completion".to_string(),
    ))
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChatChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatChoice {
    message: OpenAIMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bare_json() {
        let raw = r#"{"storyText": "hello", "isEnding": false}"#;
        let value = extract_json_payload(raw).expect("extract");
        assert_eq!(value["storyText"], "hello");
    }

    #[test]
    fn test_extract_fenced_json() {
        let raw = "Here is your story:\n```json\n{\"storyText\": \"hello\"}\n```\nEnjoy!";
        let value = extract_json_payload(raw).expect("extract");
        assert_eq!(value["storyText"], "hello");
    }

    #[test]
    fn test_extract_json_surrounded_by_prose() {
        let raw = "Sure! {\"storyText\": \"hello\"} hope you like it";
        let value = extract_json_payload(raw).expect("extract");
        assert_eq!(value["storyText"], "hello");
    }

    #[test]
    fn test_extract_rejects_no_json() {
        let raw = "I'm sorry, I can't produce that.";
        assert!(extract_json_payload(raw).is_err());
    }

    #[test]
    fn test_extract_rejects_non_object() {
        let raw = "[1, 2, 3]";
        assert!(extract_json_payload(raw).is_err());
    }
}
