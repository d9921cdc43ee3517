//! Translation and summarization through an OpenAI-compatible chat-completions API.
//!
//! Works against hosted providers and local servers (Ollama, vLLM, llama.cpp)
//! alike; only `base_url`, `model` and an optional API key differ.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::enrich::{TextTransform, TransformError};
use crate::utils::HttpClient;

/// Settings for [`ChatCompletionsTransform`]
#[derive(Clone)]
pub struct TransformSettings {
    /// Base URL up to and including the API version, e.g. `http://localhost:11434/v1`
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    /// Upper bound on summary length given to the model
    pub summary_max_words: usize,
}

impl std::fmt::Debug for TransformSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("summary_max_words", &self.summary_max_words)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`TextTransform`] backed by a chat-completions endpoint
#[derive(Debug, Clone)]
pub struct ChatCompletionsTransform {
    client: HttpClient,
    settings: TransformSettings,
}

impl ChatCompletionsTransform {
    pub fn new(client: HttpClient, settings: TransformSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    async fn complete(&self, instruction: &str, text: &str) -> Result<String, TransformError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.2,
        };

        let mut builder = self
            .client
            .client()
            .post(self.endpoint())
            .timeout(self.settings.request_timeout)
            .json(&request);
        if let Some(key) = &self.settings.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(model = %self.settings.model, chars = text.len(), "Requesting completion");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(TransformError::Api {
                status: status.as_u16(),
                message: snippet,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| TransformError::Malformed(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TransformError::Malformed("no completion text returned".to_string()))
    }
}

#[async_trait]
impl TextTransform for ChatCompletionsTransform {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TransformError> {
        let instruction = format!(
            "Translate the following scientific text into {}. Reply with the translation only.",
            language_name(target_language)
        );
        self.complete(&instruction, text).await
    }

    async fn summarize(&self, text: &str) -> Result<String, TransformError> {
        let instruction = format!(
            "Summarize the following scientific abstract in English in at most {} words. Reply with the summary only.",
            self.settings.summary_max_words
        );
        self.complete(&instruction, text).await
    }
}

/// Human-readable name for a language code, for use in prompts
fn language_name(code: &str) -> &str {
    match code.to_ascii_lowercase().as_str() {
        "zh" | "zh-cn" | "zh-hans" => "Simplified Chinese",
        "zh-tw" | "zh-hant" => "Traditional Chinese",
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        _ => code,
    }
}
