//! Anthropic messages-API backend

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::generation::GenerationBackend;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic messages API
pub struct AnthropicBackend {
    client: Client,
    config: BackendConfig,
    /// Model override applied to every request; defaults to the debate model
    model: String,
}

impl AnthropicBackend {
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
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<MessageParam<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let url = format!(
            "{}/v1/messages",
            self.config.base_url.as_str().trim_end_matches('/')
        );

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: max_output_tokens,
            temperature,
            messages: vec![MessageParam {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("anthropic request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::generation(format!(
                "anthropic request failed with status {status}: {error_text}"
            )));
        }

        let completion: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("anthropic response decode failed: {e}")))?;

        let content = completion
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| Error::generation("anthropic response had no text content"))?;

        Ok(content.trim().to_string())
    }

    fn backend_kind(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn backend_for(server: &mockito::ServerGuard) -> AnthropicBackend {
        let config = BackendConfig::new(
            "test-key",
            Url::parse(&server.url()).unwrap(),
            "debate-model",
            "officer-model",
        );
        AnthropicBackend::new(config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn generate_returns_first_text_block() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"chosen answer"}]}"#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let text = backend.generate("hi", 16, 0.3).await.unwrap();

        assert_eq!(text, "chosen answer");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_a_generation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body("overloaded")
            .create_async()
            .await;

        let backend = backend_for(&server);
        let err = backend.generate("hi", 16, 0.3).await.unwrap_err();

        assert!(matches!(err, Error::Generation(_)));
    }
}
