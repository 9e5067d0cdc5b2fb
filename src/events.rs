//! Lifecycle events and the sink boundary
//!
//! The engine emits an ordered per-session event sequence; delivery is
//! at-most-once best-effort and the engine never depends on it.

use crate::enrichment::FactSheet;
use crate::session::{Decision, Message};
use crate::types::SessionId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle event for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A round began
    RoundStarted {
        /// Round number (1-6)
        number: u32,
        /// Human-readable round description
        description: String,
    },
    /// A message was appended to the transcript
    MessageAppended(Message),
    /// Pre-round enrichment lookups finished
    EnrichmentReady {
        /// Fact sheets for the options that produced one
        facts: Vec<FactSheet>,
    },
    /// The officer produced the terminal decision
    DecisionMade(Decision),
    /// The session failed before producing a decision
    SessionFailed {
        /// Failure reason
        reason: String,
    },
}

/// Consumer boundary for session events
pub trait EventSink: Send + Sync {
    /// Deliver one event; implementations must not block the caller
    fn emit(&self, session: SessionId, event: SessionEvent);
}

/// Sink discarding every event
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _session: SessionId, _event: SessionEvent) {}
}

/// Broadcast-channel sink for in-process subscribers
///
/// Lagging or absent subscribers lose events; sends never fail the
/// emitting session.
pub struct BroadcastSink {
    tx: broadcast::Sender<(SessionId, SessionEvent)>,
}

impl BroadcastSink {
    /// Create a sink with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all session events
    pub fn subscribe(&self) -> broadcast::Receiver<(SessionId, SessionEvent)> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastSink {
    fn emit(&self, session: SessionId, event: SessionEvent) {
        // No subscribers is fine; delivery is best-effort.
        let _ = self.tx.send((session, event));
    }
}
