//! Generation capability boundary
//!
//! A backend is a single opaque operation: given a prompt, produce text.
//! Transport, quota, and timeout failures surface as
//! [`Error::Generation`](crate::error::Error::Generation); retry is the
//! task layer's responsibility, never the backend's.

use crate::anthropic::AnthropicBackend;
use crate::config::{CouncilConfig, ProviderKind};
use crate::error::{Error, Result};
use crate::openai::OpenAiBackend;
use async_trait::async_trait;
use std::sync::Arc;

/// Role an agent plays when the factory selects its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    /// Regular debate participant
    Debater,
    /// Distinguished decision-making participant
    Officer,
}

/// Unified trait for text-generation backends
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce text for the given prompt
    ///
    /// Implementations make exactly one call; they do not retry.
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String>;

    /// Backend kind for logging
    fn backend_kind(&self) -> &str;
}

/// Factory selecting a backend per agent role, keyed by configuration
///
/// Mixed mode routes debaters to OpenAI and the officer to Anthropic,
/// falling back to whichever vendor is actually configured.
#[derive(Clone)]
pub struct BackendFactory {
    provider: ProviderKind,
    openai: Option<Arc<dyn GenerationBackend>>,
    anthropic: Option<Arc<dyn GenerationBackend>>,
}

impl BackendFactory {
    /// Build the factory from configuration
    pub fn from_config(config: &CouncilConfig) -> Result<Self> {
        let openai = match &config.openai {
            Some(backend) => Some(Arc::new(OpenAiBackend::new(
                backend.clone(),
                config.request_timeout,
            )?) as Arc<dyn GenerationBackend>),
            None => None,
        };
        let anthropic = match &config.anthropic {
            Some(backend) => Some(Arc::new(AnthropicBackend::new(
                backend.clone(),
                config.request_timeout,
            )?) as Arc<dyn GenerationBackend>),
            None => None,
        };

        Ok(Self {
            provider: config.provider,
            openai,
            anthropic,
        })
    }

    /// Build a factory over caller-supplied backends
    ///
    /// Useful for custom backends and for tests; the debater backend
    /// serves debaters, the officer backend serves the officer.
    pub fn from_backends(
        debater: Arc<dyn GenerationBackend>,
        officer: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            provider: ProviderKind::Mixed,
            openai: Some(debater),
            anthropic: Some(officer),
        }
    }

    /// Names of the configured backends
    pub fn available(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if self.openai.is_some() {
            names.push("openai");
        }
        if self.anthropic.is_some() {
            names.push("anthropic");
        }
        names
    }

    /// Select the backend for the given role
    pub fn for_role(&self, role: AgentRole) -> Result<Arc<dyn GenerationBackend>> {
        let selected = match self.provider {
            ProviderKind::OpenAi => self.openai.clone().or_else(|| self.anthropic.clone()),
            ProviderKind::Anthropic => self.anthropic.clone().or_else(|| self.openai.clone()),
            ProviderKind::Mixed => match role {
                AgentRole::Debater => self.openai.clone().or_else(|| self.anthropic.clone()),
                AgentRole::Officer => self.anthropic.clone().or_else(|| self.openai.clone()),
            },
        };

        selected.ok_or_else(|| Error::config("no generation backends configured"))
    }
}

impl std::fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendFactory")
            .field("provider", &self.provider)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NamedBackend(&'static str);

    #[async_trait]
    impl GenerationBackend for NamedBackend {
        async fn generate(&self, _prompt: &str, _max: u32, _temp: f32) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn backend_kind(&self) -> &str {
            self.0
        }
    }

    #[tokio::test]
    async fn mixed_mode_splits_roles() {
        let factory = BackendFactory::from_backends(
            Arc::new(NamedBackend("debater")),
            Arc::new(NamedBackend("officer")),
        );

        let debater = factory.for_role(AgentRole::Debater).unwrap();
        let officer = factory.for_role(AgentRole::Officer).unwrap();
        assert_eq!(debater.generate("", 8, 0.0).await.unwrap(), "debater");
        assert_eq!(officer.generate("", 8, 0.0).await.unwrap(), "officer");
    }

    #[test]
    fn empty_factory_reports_config_error() {
        let factory = BackendFactory {
            provider: ProviderKind::Mixed,
            openai: None,
            anthropic: None,
        };
        assert!(matches!(
            factory.for_role(AgentRole::Debater),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn mixed_mode_falls_back_to_single_vendor() {
        let factory = BackendFactory {
            provider: ProviderKind::Mixed,
            openai: None,
            anthropic: Some(Arc::new(NamedBackend("anthropic"))),
        };
        let backend = factory.for_role(AgentRole::Debater).unwrap();
        assert_eq!(backend.backend_kind(), "anthropic");
    }
}
