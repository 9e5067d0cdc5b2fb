//! OpenAI-compatible chat-completions backend

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::generation::GenerationBackend;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for OpenAI-compatible chat-completion APIs
pub struct OpenAiBackend {
    client: Client,
    config: BackendConfig,
    /// Model override applied to every request; defaults to the debate model
    model: String,
}

impl OpenAiBackend {
    /// Create a new backend with the given configuration and timeout
    pub fn new(config: BackendConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let model = config.debate_model.clone();

        Ok(Self {
            client,
            config,
            model,
        })
    }

    /// Use the given model instead of the configured debate model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.as_str().trim_end_matches('/')
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: max_output_tokens,
            temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("openai request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::generation(format!(
                "openai request failed with status {status}: {error_text}"
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("openai response decode failed: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::generation("openai response had no choices"))?;

        Ok(content.trim().to_string())
    }

    fn backend_kind(&self) -> &str {
        "openai"
    }
}
