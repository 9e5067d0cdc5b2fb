//! Officer decision aggregation and the deterministic tally fallback
//!
//! Once round 6 begins a decision always exists: an invalid or missing
//! generated choice falls back to a transcript tally, and a failed
//! generation call falls back entirely.

use crate::prompts::FALLBACK_SUMMARY;
use crate::session::{Decision, Message};
use crate::task::DecisionPayload;
use tracing::warn;

/// Builds the terminal [`Decision`] for a session
#[derive(Debug, Clone, Copy)]
pub struct DecisionAggregator {
    fallback_confidence: f64,
}

impl DecisionAggregator {
    /// Create an aggregator reporting the given confidence on full fallback
    pub fn new(fallback_confidence: f64) -> Self {
        Self {
            fallback_confidence,
        }
    }

    /// Build a decision from a generated payload
    ///
    /// The generated summary and confidence are kept even when the
    /// choice itself has to fall back to the tally.
    pub fn from_payload(
        &self,
        payload: DecisionPayload,
        options: &[String],
        transcript: &[Message],
    ) -> Decision {
        let generated = payload
            .final_choice
            .filter(|choice| options.iter().any(|option| option == choice));

        let (choice, fallback) = match generated {
            Some(choice) => (choice, false),
            None => {
                warn!("generated decision choice missing or invalid, using tally fallback");
                (Self::tally_choice(options, transcript), true)
            }
        };

        Decision {
            choice,
            summary: payload.summary.unwrap_or_else(|| FALLBACK_SUMMARY.to_string()),
            confidence: payload
                .confidence
                .unwrap_or(self.fallback_confidence)
                .clamp(0.0, 1.0),
            fallback,
        }
    }

    /// Build a decision when the generation call failed entirely
    pub fn fallback(&self, options: &[String], transcript: &[Message]) -> Decision {
        Decision {
            choice: Self::tally_choice(options, transcript),
            summary: FALLBACK_SUMMARY.to_string(),
            confidence: self.fallback_confidence,
            fallback: true,
        }
    }

    /// Tally stated choices across the transcript
    ///
    /// Every option starts at zero, so ties break toward the option
    /// encountered first in `options` order.
    pub fn tally_choice(options: &[String], transcript: &[Message]) -> String {
        debug_assert!(!options.is_empty());

        let mut best = options[0].clone();
        let mut best_count = 0usize;
        for option in options {
            let count = transcript
                .iter()
                .filter(|message| message.choice.as_deref() == Some(option.as_str()))
                .count();
            if count > best_count {
                best = option.clone();
                best_count = count;
            }
        }
        best
    }
}
