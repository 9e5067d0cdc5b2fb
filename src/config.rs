//! Configuration types for the council engine

use crate::error::{Error, Result};
use dotenvy::dotenv;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Which vendor serves generation calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI-compatible backend for every role
    OpenAi,
    /// Anthropic backend for every role
    Anthropic,
    /// OpenAI for debaters, Anthropic for the officer (falling back to
    /// whichever is configured)
    Mixed,
}

impl ProviderKind {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "mixed" => Ok(Self::Mixed),
            other => Err(Error::config(format!("unknown provider: {other}"))),
        }
    }
}

/// Connection settings for one vendor backend
#[derive(Clone)]
pub struct BackendConfig {
    /// API key (loaded from environment, never logged)
    pub api_key: SecretString,
    /// Base URL of the vendor API
    pub base_url: Url,
    /// Model used for debate participants
    pub debate_model: String,
    /// Model used for the officer
    pub officer_model: String,
}

impl BackendConfig {
    /// Create a backend configuration with vendor defaults
    pub fn new(
        api_key: impl Into<String>,
        base_url: Url,
        debate_model: impl Into<String>,
        officer_model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url,
            debate_model: debate_model.into(),
            officer_model: officer_model.into(),
        }
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("debate_model", &self.debate_model)
            .field("officer_model", &self.officer_model)
            .finish()
    }
}

/// Retry/backoff policy applied around every generation call
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum attempts per generation call
    pub max_attempts: u32,
    /// Backoff base in seconds; the delay after failed attempt `n`
    /// (0-indexed) is `base^n`
    pub backoff_base: f64,
}

impl RetryConfig {
    /// Backoff delay after the given failed attempt (0-indexed)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.backoff_base.powi(attempt as i32))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: 2.0,
        }
    }
}

/// Pacing delays between emitted events
///
/// Not a correctness requirement: observers should perceive rounds
/// advancing incrementally rather than in a single burst.
#[derive(Debug, Clone, Copy)]
pub struct PacingConfig {
    /// Delay after announcing a round start
    pub round_start: Duration,
    /// Delay after appending each message
    pub message: Duration,
}

impl PacingConfig {
    /// Zero pacing, for tests and batch runs
    pub fn none() -> Self {
        Self {
            round_start: Duration::ZERO,
            message: Duration::ZERO,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            round_start: Duration::from_secs(1),
            message: Duration::from_millis(1500),
        }
    }
}

/// Which debater positions the officer probes in round 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficerQuestionPolicy {
    /// Question each debater whose latest stated choice is missing or
    /// disagrees with the current plurality leader
    LatestOpinionHolders,
    /// Question every debater
    EveryDebater,
    /// Skip round 4 questioning entirely
    Disabled,
}

impl Default for OfficerQuestionPolicy {
    fn default() -> Self {
        Self::LatestOpinionHolders
    }
}

/// Top-level configuration for the council engine
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    /// Vendor selection strategy
    pub provider: ProviderKind,
    /// OpenAI-compatible backend settings, if configured
    pub openai: Option<BackendConfig>,
    /// Anthropic backend settings, if configured
    pub anthropic: Option<BackendConfig>,
    /// Max output tokens for debate participants
    pub max_tokens_debate: u32,
    /// Max output tokens for the officer
    pub max_tokens_officer: u32,
    /// Sampling temperature for debate participants
    pub temperature_debate: f32,
    /// Sampling temperature for the officer
    pub temperature_officer: f32,
    /// Per-request timeout for generation calls
    pub request_timeout: Duration,
    /// Retry/backoff policy
    pub retry: RetryConfig,
    /// Event pacing
    pub pacing: PacingConfig,
    /// Admission limit on concurrently running sessions
    pub max_concurrent_sessions: usize,
    /// Confidence reported when the decision falls back to the tally
    pub fallback_confidence: f64,
    /// Round-4 questioning policy
    pub officer_questions: OfficerQuestionPolicy,
    /// Path to the persona roster file (built-in personas when absent)
    pub persona_file: Option<PathBuf>,
    /// Number of debate participants drawn from the roster
    pub roster_size: usize,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Mixed,
            openai: None,
            anthropic: None,
            max_tokens_debate: 128,
            max_tokens_officer: 256,
            temperature_debate: 0.7,
            temperature_officer: 0.3,
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            pacing: PacingConfig::default(),
            max_concurrent_sessions: 5,
            fallback_confidence: 0.3,
            officer_questions: OfficerQuestionPolicy::default(),
            persona_file: None,
            roster_size: 3,
        }
    }
}

impl CouncilConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `.env` if present. At least one of `OPENAI_API_KEY` /
    /// `ANTHROPIC_API_KEY` must be set for generation to work; the
    /// backend factory reports the miss at roster construction time.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        let mut config = Self::default();

        if let Ok(provider) = std::env::var("COUNCIL_PROVIDER") {
            config.provider = ProviderKind::parse(&provider)?;
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                config.openai = Some(BackendConfig::new(
                    key,
                    Url::parse("https://api.openai.com/v1").expect("valid OpenAI URL"),
                    env_or("OPENAI_MODEL_DEBATE", "gpt-4o-mini"),
                    env_or("OPENAI_MODEL_OFFICER", "gpt-4o"),
                ));
            }
        }

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.is_empty() {
                config.anthropic = Some(BackendConfig::new(
                    key,
                    Url::parse("https://api.anthropic.com").expect("valid Anthropic URL"),
                    env_or("ANTHROPIC_MODEL_DEBATE", "claude-3-5-haiku-20241022"),
                    env_or("ANTHROPIC_MODEL_OFFICER", "claude-sonnet-4-20250514"),
                ));
            }
        }

        if let Ok(limit) = std::env::var("COUNCIL_MAX_CONCURRENT_SESSIONS") {
            config.max_concurrent_sessions = limit
                .parse()
                .map_err(|_| Error::config(format!("invalid session limit: {limit}")))?;
        }

        if let Ok(path) = std::env::var("COUNCIL_PERSONA_FILE") {
            config.persona_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pacing delays
    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the admission limit
    pub fn with_max_concurrent_sessions(mut self, limit: usize) -> Self {
        self.max_concurrent_sessions = limit;
        self
    }

    /// Set the round-4 questioning policy
    pub fn with_officer_questions(mut self, policy: OfficerQuestionPolicy) -> Self {
        self.officer_questions = policy;
        self
    }

    /// Set the persona roster file
    pub fn with_persona_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.persona_file = Some(path.into());
        self
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delays_are_exponential() {
        let retry = RetryConfig {
            max_attempts: 3,
            backoff_base: 2.0,
        };
        assert_eq!(retry.delay_after(0), Duration::from_secs(1));
        assert_eq!(retry.delay_after(1), Duration::from_secs(2));
        assert_eq!(retry.delay_after(2), Duration::from_secs(4));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = BackendConfig::new(
            "sk-secret",
            Url::parse("https://api.openai.com/v1").unwrap(),
            "debate-model",
            "officer-model",
        );
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn provider_kind_parses() {
        assert_eq!(ProviderKind::parse("mixed").unwrap(), ProviderKind::Mixed);
        assert!(ProviderKind::parse("petting-zoo").is_err());
    }
}
