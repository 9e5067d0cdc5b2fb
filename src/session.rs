//! Session data model: rounds, messages, and the final decision
//!
//! A session is owned exclusively by its orchestrator while it runs;
//! everyone else sees cloned read-only snapshots published to the store.

use crate::error::{Error, Result};
use crate::types::{ParticipantId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepted, background driver not yet started
    Created,
    /// Rounds are executing
    Running,
    /// Decision produced; terminal
    Completed,
    /// Unrecoverable orchestration error; terminal
    Failed,
}

/// Kind of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Round-1 opening statement
    InitialOpinion,
    /// Round-2 peer question
    Question,
    /// Answer to a peer or officer question
    Response,
    /// Round-5 closing statement
    FinalOpinion,
    /// Round-4 question from the officer
    OfficerQuestion,
    /// Round-6 terminal decision
    Decision,
}

impl MessageKind {
    /// Whether this kind carries a `target_participant`
    pub fn is_targeted(&self) -> bool {
        matches!(
            self,
            Self::Question | Self::Response | Self::OfficerQuestion
        )
    }
}

/// One immutable entry in a session transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message
    pub participant: ParticipantId,
    /// Author display name
    pub participant_name: String,
    /// Message kind
    pub kind: MessageKind,
    /// Message text
    pub text: String,
    /// Preferred option, when stated; always a member of the session options
    pub choice: Option<String>,
    /// Addressee, for question/response kinds only
    pub target_participant: Option<ParticipantId>,
    /// Round this message belongs to (1-6)
    pub round: u32,
    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(
        participant: ParticipantId,
        participant_name: impl Into<String>,
        kind: MessageKind,
        text: impl Into<String>,
        round: u32,
    ) -> Self {
        Self {
            participant,
            participant_name: participant_name.into(),
            kind,
            text: text.into(),
            choice: None,
            target_participant: None,
            round,
            timestamp: Utc::now(),
        }
    }

    /// Set the stated choice
    pub fn with_choice(mut self, choice: impl Into<String>) -> Self {
        self.choice = Some(choice.into());
        self
    }

    /// Set the addressee
    pub fn with_target(mut self, target: ParticipantId) -> Self {
        self.target_participant = Some(target);
        self
    }
}

/// Kind of a round, fixed by its position in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    /// Every debater states an opening opinion
    InitialOpinions,
    /// Every debater may pose one question to a peer
    PeerQuestions,
    /// Targets of round-2 questions respond
    QuestionResponses,
    /// The officer probes still-ambiguous positions
    OfficerQuestions,
    /// Every debater states a closing opinion
    FinalOpinions,
    /// The officer renders the terminal decision
    Decision,
}

impl RoundKind {
    /// Round kind for a 1-based round number
    pub fn for_round(number: u32) -> Option<Self> {
        match number {
            1 => Some(Self::InitialOpinions),
            2 => Some(Self::PeerQuestions),
            3 => Some(Self::QuestionResponses),
            4 => Some(Self::OfficerQuestions),
            5 => Some(Self::FinalOpinions),
            6 => Some(Self::Decision),
            _ => None,
        }
    }

    /// Human-readable description used in round-start events
    pub fn description(&self) -> &'static str {
        match self {
            Self::InitialOpinions => "Opening statements from every participant",
            Self::PeerQuestions => "Participants question each other",
            Self::QuestionResponses => "Answers to participant questions",
            Self::OfficerQuestions => "Clarifying questions from the officer",
            Self::FinalOpinions => "Closing statements from every participant",
            Self::Decision => "Final decision by the officer",
        }
    }
}

/// One round descriptor; generated at session start, never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    /// Round number (1-6)
    pub number: u32,
    /// Kind fixed by position
    pub kind: RoundKind,
    /// Human-readable description
    pub description: String,
}

impl Round {
    /// The full six-round schedule
    pub fn schedule() -> Vec<Round> {
        (1..=6)
            .map(|number| {
                let kind = RoundKind::for_round(number).expect("round number in schedule range");
                Round {
                    number,
                    kind,
                    description: kind.description().to_string(),
                }
            })
            .collect()
    }
}

/// Terminal decision for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Chosen option; always a member of the session options
    pub choice: String,
    /// Officer's reasoning summary
    pub summary: String,
    /// Confidence in [0.0, 1.0]
    pub confidence: f64,
    /// Whether the deterministic tally fallback produced the choice
    pub fallback: bool,
}

/// One complete run of the six-round debate protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: SessionId,
    /// Debate topic
    pub topic: String,
    /// Candidate options, ordered and distinct
    pub options: Vec<String>,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Completion timestamp, once terminal
    pub completed_at: Option<DateTime<Utc>>,
    /// Round currently executing (0 before round 1 starts)
    pub current_round: u32,
    /// The six round descriptors
    pub rounds: Vec<Round>,
    /// Append-only ordered transcript
    pub transcript: Vec<Message>,
    /// Terminal decision, present once round 6 completes
    pub decision: Option<Decision>,
    /// Failure reason for Failed sessions
    pub failure_reason: Option<String>,
    /// Whether option enrichment was requested at creation
    pub enrichment_enabled: bool,
}

impl Session {
    /// Create a new session after validating topic and options
    pub fn new(topic: impl Into<String>, options: Vec<String>, enrichment: bool) -> Result<Self> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(Error::invalid_input("topic cannot be empty"));
        }
        if options.len() < 2 {
            return Err(Error::invalid_input("at least 2 options required"));
        }
        if options.iter().any(|option| option.trim().is_empty()) {
            return Err(Error::invalid_input("options cannot be empty"));
        }
        let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
        if distinct.len() != options.len() {
            return Err(Error::invalid_input("options must be distinct"));
        }

        Ok(Self {
            id: SessionId::new(),
            topic,
            options,
            status: SessionStatus::Created,
            created_at: Utc::now(),
            completed_at: None,
            current_round: 0,
            rounds: Round::schedule(),
            transcript: Vec::new(),
            decision: None,
            failure_reason: None,
            enrichment_enabled: enrichment,
        })
    }

    /// Whether the session reached a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Append a message to the transcript
    ///
    /// The orchestrator is the only caller; round numbers must not run
    /// backwards and must not exceed the current round.
    pub(crate) fn append(&mut self, message: Message) {
        debug_assert!(message.round <= self.current_round);
        debug_assert!(self
            .transcript
            .last()
            .map(|last| last.round <= message.round)
            .unwrap_or(true));
        self.transcript.push(message);
    }
}
