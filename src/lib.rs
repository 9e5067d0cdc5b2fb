//! # Council
//!
//! A round-based multi-agent debate orchestration engine.
//!
//! A fixed roster of persona-backed agents debates a topic with N
//! candidate options across six sequential rounds, and a distinguished
//! officer agent renders the final decision. The engine owns the round
//! sequencing, the fan-out/fan-in barriers, question routing,
//! retry/backoff around every generation call, and the deterministic
//! fallbacks that guarantee a decision even when generation fails.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use council::{CouncilConfig, CouncilService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CouncilConfig::from_env()?;
//!     let service = CouncilService::new(config)?;
//!
//!     let id = service.create_session(
//!         "Where should we have lunch?",
//!         vec!["Sushi Bar".to_string(), "Ramen Shop".to_string()],
//!         false,
//!     )?;
//!
//!     // The debate runs in the background; read snapshots any time.
//!     let snapshot = service.get(id)?;
//!     println!("round {}", snapshot.current_round);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod anthropic;
pub mod config;
pub mod decision;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod generation;
pub mod openai;
pub mod orchestrator;
pub mod prompts;
pub mod roster;
pub mod router;
pub mod service;
pub mod session;
pub mod store;
pub mod task;
pub mod types;

// Re-exports for convenience
pub use anthropic::AnthropicBackend;
pub use config::{
    BackendConfig, CouncilConfig, OfficerQuestionPolicy, PacingConfig, ProviderKind, RetryConfig,
};
pub use decision::DecisionAggregator;
pub use enrichment::{Enrichment, FactSheet, WebLookup};
pub use error::{Error, Result};
pub use events::{BroadcastSink, EventSink, NullSink, SessionEvent};
pub use generation::{AgentRole, BackendFactory, GenerationBackend};
pub use openai::OpenAiBackend;
pub use orchestrator::RoundOrchestrator;
pub use roster::{Participant, Persona, Roster};
pub use router::MessageRouter;
pub use service::CouncilService;
pub use session::{
    Decision, Message, MessageKind, Round, RoundKind, Session, SessionStatus,
};
pub use store::SessionStore;
pub use task::TaskRunner;
pub use types::{ParticipantId, SessionId};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::CouncilConfig;
    pub use crate::error::{Error, Result};
    pub use crate::events::SessionEvent;
    pub use crate::generation::GenerationBackend;
    pub use crate::service::CouncilService;
    pub use crate::session::{Decision, Message, Session, SessionStatus};
    pub use crate::types::{ParticipantId, SessionId};
}
