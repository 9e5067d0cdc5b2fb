//! Council service facade: session creation, snapshots, and events
//!
//! The service owns the session store and the event channel. Creating a
//! session validates the request, admits it against the running-session
//! limit, and spawns the background driver; callers read progress
//! through snapshots without ever blocking on completion.

use crate::config::CouncilConfig;
use crate::enrichment::Enrichment;
use crate::error::Result;
use crate::events::{BroadcastSink, EventSink, SessionEvent};
use crate::generation::BackendFactory;
use crate::orchestrator::RoundOrchestrator;
use crate::roster::{load_personas, Persona, Roster};
use crate::session::Session;
use crate::store::SessionStore;
use crate::types::SessionId;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Entry point for running debates in one process
pub struct CouncilService {
    config: CouncilConfig,
    factory: BackendFactory,
    store: Arc<SessionStore>,
    events: Arc<BroadcastSink>,
    enrichment: Option<Arc<dyn Enrichment>>,
    personas: Vec<Persona>,
}

impl CouncilService {
    /// Create a service from configuration
    pub fn new(config: CouncilConfig) -> Result<Self> {
        let factory = BackendFactory::from_config(&config)?;
        Ok(Self::with_factory(config, factory))
    }

    /// Create a service over a caller-supplied backend factory
    pub fn with_factory(config: CouncilConfig, factory: BackendFactory) -> Self {
        let personas = load_personas(config.persona_file.as_deref(), config.roster_size);
        Self {
            store: Arc::new(SessionStore::new(config.max_concurrent_sessions)),
            events: Arc::new(BroadcastSink::default()),
            enrichment: None,
            personas,
            config,
            factory,
        }
    }

    /// Attach an enrichment service
    pub fn with_enrichment(mut self, enrichment: Arc<dyn Enrichment>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Subscribe to lifecycle events for every session
    pub fn subscribe(&self) -> broadcast::Receiver<(SessionId, SessionEvent)> {
        self.events.subscribe()
    }

    /// The session store backing this service
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Create a session and start its debate in the background
    ///
    /// Returns immediately with the session ID; the six rounds run on a
    /// spawned task tracked by that ID. Requests beyond the admission
    /// limit are rejected, not queued.
    pub fn create_session(
        &self,
        topic: impl Into<String>,
        options: Vec<String>,
        enrichment: bool,
    ) -> Result<SessionId> {
        let session = Session::new(topic, options, enrichment)?;
        let id = session.id;
        self.store.admit(session.clone())?;

        match Roster::build(&self.factory, self.personas.clone()) {
            Ok(roster) => {
                let sink: Arc<dyn EventSink> = self.events.clone();
                let orchestrator = RoundOrchestrator::new(
                    session,
                    roster,
                    self.config.clone(),
                    self.store.clone(),
                    sink,
                    self.enrichment.clone(),
                );
                tokio::spawn(async move {
                    orchestrator.run().await;
                });
                info!(session = %id, "session started");
            }
            Err(e) => {
                warn!(session = %id, error = %e, "roster construction failed");
                self.mark_failed(session, e.to_string());
            }
        }

        Ok(id)
    }

    /// Read the current snapshot of a session, or `None` when unknown
    pub fn snapshot(&self, id: SessionId) -> Option<Session> {
        self.store.snapshot(id)
    }

    /// Read the current snapshot of a session, failing when unknown
    pub fn get(&self, id: SessionId) -> Result<Session> {
        self.store.get(id)
    }

    /// Evict finished sessions older than the given age
    pub fn evict_finished(&self, older_than: chrono::Duration) -> usize {
        self.store.evict_finished(older_than)
    }

    fn mark_failed(&self, mut session: Session, reason: String) {
        session.status = crate::session::SessionStatus::Failed;
        session.failure_reason = Some(reason.clone());
        session.completed_at = Some(chrono::Utc::now());
        self.store.publish(&session);
        self.events
            .emit(session.id, SessionEvent::SessionFailed { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PacingConfig, RetryConfig};
    use crate::error::Error;
    use crate::generation::GenerationBackend;
    use crate::session::SessionStatus;
    use async_trait::async_trait;
    use std::time::Duration;

    struct CannedBackend(String);

    #[async_trait]
    impl GenerationBackend for CannedBackend {
        async fn generate(&self, _prompt: &str, _max: u32, _temp: f32) -> Result<String> {
            Ok(self.0.clone())
        }

        fn backend_kind(&self) -> &str {
            "canned"
        }
    }

    /// Backend that never answers within the test's lifetime
    struct StalledBackend;

    #[async_trait]
    impl GenerationBackend for StalledBackend {
        async fn generate(&self, _prompt: &str, _max: u32, _temp: f32) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(Error::generation("stalled"))
        }

        fn backend_kind(&self) -> &str {
            "stalled"
        }
    }

    fn test_config() -> CouncilConfig {
        CouncilConfig::default()
            .with_retry(RetryConfig {
                max_attempts: 1,
                backoff_base: 2.0,
            })
            .with_pacing(PacingConfig::none())
    }

    fn universal_backend() -> Arc<dyn GenerationBackend> {
        Arc::new(CannedBackend(
            r#"{"message":"fine","choice":"Sushi Bar","question":"why?","target_participant":"generalist","final_choice":"Sushi Bar","summary":"clear support","confidence":0.8}"#
                .to_string(),
        ))
    }

    fn options() -> Vec<String> {
        vec!["Sushi Bar".to_string(), "Ramen Shop".to_string()]
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_up_front() {
        let service = CouncilService::with_factory(
            test_config(),
            BackendFactory::from_backends(universal_backend(), universal_backend()),
        );

        assert!(service
            .create_session("", options(), false)
            .is_err());
        assert!(service
            .create_session("lunch", vec!["only one".to_string()], false)
            .is_err());
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn session_runs_to_completion_in_background() {
        let service = CouncilService::with_factory(
            test_config(),
            BackendFactory::from_backends(universal_backend(), universal_backend()),
        );
        let mut events = service.subscribe();

        let id = service
            .create_session("lunch", options(), false)
            .unwrap();

        // The call returned immediately; poll the snapshot until the
        // background driver finishes.
        let mut session = service.get(id).unwrap();
        for _ in 0..200 {
            if session.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            session = service.get(id).unwrap();
        }

        assert_eq!(session.status, SessionStatus::Completed);
        let decision = session.decision.unwrap();
        assert!(session.options.contains(&decision.choice));

        // The event stream saw the decision too.
        let mut saw_decision = false;
        while let Ok((event_id, event)) = events.try_recv() {
            if event_id == id && matches!(event, SessionEvent::DecisionMade(_)) {
                saw_decision = true;
            }
        }
        assert!(saw_decision);
    }

    #[tokio::test(start_paused = true)]
    async fn admission_limit_rejects_excess_sessions() {
        let config = test_config().with_max_concurrent_sessions(1);
        let service = CouncilService::with_factory(
            config,
            BackendFactory::from_backends(Arc::new(StalledBackend), Arc::new(StalledBackend)),
        );

        service.create_session("lunch", options(), false).unwrap();
        let err = service
            .create_session("dinner", options(), false)
            .unwrap_err();

        assert!(matches!(err, Error::CapacityExceeded { .. }));
    }

    #[tokio::test]
    async fn unknown_session_reads_as_not_found() {
        let service = CouncilService::with_factory(
            test_config(),
            BackendFactory::from_backends(universal_backend(), universal_backend()),
        );

        let unknown = SessionId::new();
        assert!(service.snapshot(unknown).is_none());
        assert!(matches!(
            service.get(unknown),
            Err(Error::SessionNotFound(_))
        ));
    }
}
