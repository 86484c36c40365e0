//! OpenAI chat-completion client
//!
//! Sends the compiled prompt to the chat completions endpoint and returns
//! the first choice's text. The base URL is overridable for proxies and
//! OpenAI-compatible servers; tests point it at a local mock.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use versewright_common::prompt::GenerationInstruction;
use versewright_common::{Error, Result};

use super::PoemGenerator;

/// OpenAI API base URL
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// System message framing every completion request
const SYSTEM_PROMPT: &str = "You are a talented poet who creates beautiful, meaningful poems. \
     Always respond with just the poem text, no additional commentary.";

/// Upper bound on generated tokens per poem
const MAX_TOKENS: u32 = 500;

/// Sampling temperature
const TEMPERATURE: f64 = 0.8;

/// Chat-completion backed generator
pub struct OpenAiGenerator {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, base_url: Option<String>, model: String, timeout_secs: u64) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            base_url: base_url.unwrap_or_else(|| OPENAI_API_URL.to_string()),
            model,
        }
    }

    /// Execute one chat completion request
    ///
    /// # Errors
    /// Returns `Error::GenerationBackend` if:
    /// - Network request fails
    /// - API returns a non-success status
    /// - Response has no completion text
    async fn chat_completion(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::GenerationBackend(format!("OpenAI API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::GenerationBackend(format!(
                "OpenAI API returned error {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            Error::GenerationBackend(format!("Failed to parse OpenAI response: {}", e))
        })?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                Error::GenerationBackend("OpenAI response contained no poem text".to_string())
            })?;

        Ok(text)
    }
}

#[async_trait]
impl PoemGenerator for OpenAiGenerator {
    fn backend_id(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, instruction: &GenerationInstruction) -> Result<String> {
        debug!(
            poem_type = %instruction.poem_type,
            model = %self.model,
            "Requesting poem from OpenAI"
        );
        self.chat_completion(&instruction.prompt).await
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}
