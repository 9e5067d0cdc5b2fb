//! Retry/backoff task layer around single generation calls
//!
//! One task is one generation call on behalf of one participant:
//! transient backend failures are retried with exponential backoff,
//! then the output is parsed into a phase-specific payload. Parse
//! failures are final for the call; retries cover the backend only.

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::roster::Participant;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

/// Opening or closing statement payload (rounds 1 and 5)
#[derive(Debug, Clone, Deserialize)]
pub struct OpinionPayload {
    /// Statement text
    pub message: String,
    /// Preferred option, when stated
    #[serde(default)]
    pub choice: Option<String>,
}

/// Peer or officer question payload (rounds 2 and 4)
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionPayload {
    /// Question text
    pub question: String,
    /// Declared addressee, validated by the router
    #[serde(default, alias = "targetParticipant")]
    pub target_participant: Option<String>,
}

/// Answer payload (rounds 3 and 4)
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerPayload {
    /// Answer text
    pub message: String,
    /// Preferred option, when restated
    #[serde(default)]
    pub choice: Option<String>,
}

/// Officer decision payload (round 6)
///
/// Every field is optional: the aggregator substitutes the tally
/// fallback for anything missing or invalid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionPayload {
    /// Chosen option as generated
    #[serde(default)]
    pub final_choice: Option<String>,
    /// Reasoning summary
    #[serde(default)]
    pub summary: Option<String>,
    /// Confidence as generated
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Extract the first balanced `{...}` span from generation output
///
/// Backends routinely wrap the structured payload in prose; the span
/// scan tolerates that. Returns `None` when no balanced span exists.
pub fn extract_payload_span(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in output[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&output[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse generation output into a structured payload
///
/// Parses the first balanced span when one exists, the whole output
/// otherwise. Failure is [`Error::MalformedOutput`] and is not retried.
pub fn parse_payload<T: DeserializeOwned>(output: &str) -> Result<T> {
    let candidate = extract_payload_span(output).unwrap_or_else(|| output.trim());
    serde_json::from_str(candidate)
        .map_err(|e| Error::malformed(format!("{e}: {}", truncate(output, 120))))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Retry/backoff wrapper around one generation call per participant
#[derive(Debug, Clone, Copy)]
pub struct TaskRunner {
    retry: RetryConfig,
}

impl TaskRunner {
    /// Create a runner with the given retry policy
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }

    /// Run one generation call to completion
    ///
    /// Empty or whitespace-only output counts as a failed attempt. After
    /// the last attempt the final error surfaces to the caller, which
    /// applies the phase policy (apology substitute, silent drop, or
    /// decision fallback).
    pub async fn generate(
        &self,
        participant: &Participant,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry.delay_after(attempt - 1)).await;
            }

            match participant
                .backend
                .generate(prompt, max_output_tokens, temperature)
                .await
            {
                Ok(output) if !output.trim().is_empty() => return Ok(output),
                Ok(_) => {
                    last_error = Some(Error::generation("empty output from backend"));
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }

            warn!(
                participant = %participant.id,
                attempt = attempt + 1,
                max = self.retry.max_attempts,
                "generation attempt failed"
            );
        }

        Err(last_error.unwrap_or_else(|| Error::generation("no attempts configured")))
    }

    /// Run one generation call and parse the payload
    pub async fn generate_payload<T: DeserializeOwned>(
        &self,
        participant: &Participant,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> Result<T> {
        let output = self
            .generate(participant, prompt, max_output_tokens, temperature)
            .await?;
        parse_payload(&output)
    }
}
