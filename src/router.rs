//! Question addressing
//!
//! Resolves "question → target participant" against the eligible pool:
//! everyone who stated a round-1 opinion, minus the asker. A declared
//! target outside the pool falls back deterministically to the first
//! eligible participant in roster order.

use crate::error::{Error, Result};
use crate::roster::{Participant, Roster};
use crate::session::{Message, MessageKind};
use crate::types::ParticipantId;
use tracing::{debug, warn};

/// Outcome of resolving one question's addressing
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// The participant that must answer
    pub target: ParticipantId,
    /// Whether the declared target was unusable and the deterministic
    /// fallback was applied
    pub fallback_applied: bool,
}

/// Resolver for question addressing within one session
pub struct MessageRouter<'a> {
    roster: &'a Roster,
}

impl<'a> MessageRouter<'a> {
    /// Create a router over the session roster
    pub fn new(roster: &'a Roster) -> Self {
        Self { roster }
    }

    /// Participants addressable by `asker`: debaters with a round-1
    /// opinion in the transcript, in stable roster order, excluding the
    /// asker itself
    pub fn eligible_targets(
        &self,
        transcript: &[Message],
        asker: &ParticipantId,
    ) -> Vec<&'a Participant> {
        self.roster
            .debaters
            .iter()
            .filter(|debater| &debater.id != asker)
            .filter(|debater| {
                transcript.iter().any(|message| {
                    message.kind == MessageKind::InitialOpinion && message.participant == debater.id
                })
            })
            .collect()
    }

    /// Resolve the addressee for a question
    ///
    /// Questions with no eligible targets at all are unroutable and
    /// produce [`Error::NoEligibleTarget`]; the caller drops them.
    pub fn resolve_target(
        &self,
        transcript: &[Message],
        asker: &ParticipantId,
        declared: Option<&str>,
    ) -> Result<ResolvedTarget> {
        let eligible = self.eligible_targets(transcript, asker);
        if eligible.is_empty() {
            return Err(Error::NoEligibleTarget {
                asker: asker.to_string(),
            });
        }

        if let Some(declared) = declared {
            if let Some(target) = eligible.iter().find(|p| p.id.as_str() == declared) {
                debug!(asker = %asker, target = %target.id, "question target resolved");
                return Ok(ResolvedTarget {
                    target: target.id.clone(),
                    fallback_applied: false,
                });
            }
        }

        // Stable roster order makes the fallback deterministic.
        let fallback = eligible[0];
        warn!(
            asker = %asker,
            declared = declared.unwrap_or("<none>"),
            fallback = %fallback.id,
            "question target invalid, using first eligible participant"
        );

        Ok(ResolvedTarget {
            target: fallback.id.clone(),
            fallback_applied: true,
        })
    }
}
