//! Round orchestration: the six-phase debate protocol
//!
//! The orchestrator owns its session exclusively, drives the six rounds
//! strictly in order, fans work out to concurrent participant tasks
//! inside a round, and waits for every task to reach a terminal outcome
//! before the next round starts. One participant's failure never blocks
//! or fails its siblings; per-phase policy decides whether a failure is
//! dropped, substituted with the apology statement, or absorbed by the
//! decision fallback.

use crate::config::{CouncilConfig, OfficerQuestionPolicy};
use crate::decision::DecisionAggregator;
use crate::enrichment::{detect_lookup_candidates, Enrichment, FactSheet};
use crate::error::{Error, Result};
use crate::events::{EventSink, SessionEvent};
use crate::prompts;
use crate::roster::{Participant, Roster};
use crate::router::MessageRouter;
use crate::session::{Message, MessageKind, Session, SessionStatus};
use crate::store::SessionStore;
use crate::task::{AnswerPayload, DecisionPayload, OpinionPayload, QuestionPayload, TaskRunner};
use crate::types::ParticipantId;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drives one session through the six-round protocol
pub struct RoundOrchestrator {
    session: Session,
    roster: Roster,
    runner: TaskRunner,
    aggregator: DecisionAggregator,
    store: Arc<SessionStore>,
    sink: Arc<dyn EventSink>,
    enrichment: Option<Arc<dyn Enrichment>>,
    config: CouncilConfig,
    facts: Vec<FactSheet>,
}

impl RoundOrchestrator {
    /// Create the orchestrator for one session
    pub fn new(
        session: Session,
        roster: Roster,
        config: CouncilConfig,
        store: Arc<SessionStore>,
        sink: Arc<dyn EventSink>,
        enrichment: Option<Arc<dyn Enrichment>>,
    ) -> Self {
        Self {
            runner: TaskRunner::new(config.retry),
            aggregator: DecisionAggregator::new(config.fallback_confidence),
            session,
            roster,
            store,
            sink,
            enrichment,
            config,
            facts: Vec::new(),
        }
    }

    /// Run the session to a terminal status and return the final state
    ///
    /// Never panics and never leaves the session non-terminal: every
    /// failure path ends in either Completed or Failed.
    pub async fn run(mut self) -> Session {
        info!(session = %self.session.id, topic = %self.session.topic, "session starting");
        self.session.status = SessionStatus::Running;
        self.publish();

        if self.session.enrichment_enabled {
            self.enrich_options().await;
        }

        match self.drive().await {
            Ok(()) => {
                info!(session = %self.session.id, "session completed");
            }
            Err(e) => {
                self.fail(e.to_string());
            }
        }

        self.session
    }

    async fn drive(&mut self) -> Result<()> {
        self.round_initial_opinions().await?;
        let questions = self.round_peer_questions().await;
        self.round_question_responses(questions).await;
        self.round_officer_questions().await;
        self.round_final_opinions().await;
        self.round_decision().await;
        Ok(())
    }

    /// Round 1: every debater states an opening opinion, in parallel.
    /// Failed participants are dropped; zero survivors is fatal.
    async fn round_initial_opinions(&mut self) -> Result<()> {
        self.start_round(1).await;

        let runner = self.runner;
        let max_tokens = self.config.max_tokens_debate;
        let temperature = self.config.temperature_debate;
        let facts = self.facts_context();

        let tasks: Vec<_> = self
            .roster
            .debaters
            .iter()
            .map(|debater| {
                let prompt = prompts::initial_opinion(
                    debater.persona.as_ref().expect("debaters carry a persona"),
                    &self.session.topic,
                    &self.session.options,
                    facts.as_deref(),
                );
                async move {
                    let result = runner
                        .generate_payload::<OpinionPayload>(debater, &prompt, max_tokens, temperature)
                        .await;
                    (debater.id.clone(), debater.name.clone(), result)
                }
            })
            .collect();

        let mut survivors = 0usize;
        for (id, name, result) in join_all(tasks).await {
            match result {
                Ok(payload) => {
                    survivors += 1;
                    let mut message =
                        Message::new(id, name, MessageKind::InitialOpinion, payload.message, 1);
                    message.choice = self.normalize_choice(payload.choice);
                    self.append(message).await;
                }
                Err(e) => {
                    warn!(participant = %id, error = %e, "dropping participant from round 1");
                }
            }
        }

        if survivors == 0 {
            return Err(Error::roster("no participant produced an opening opinion"));
        }
        Ok(())
    }

    /// Round 2: every debater may pose one question, in parallel.
    /// Failed or unroutable questions are dropped silently.
    async fn round_peer_questions(&mut self) -> Vec<Message> {
        self.start_round(2).await;

        let runner = self.runner;
        let max_tokens = self.config.max_tokens_debate;
        let temperature = self.config.temperature_debate;
        let transcript = self.session.transcript.clone();
        let view = prompts::transcript_view(&transcript);
        let router = MessageRouter::new(&self.roster);

        let tasks: Vec<_> = self
            .roster
            .debaters
            .iter()
            .map(|debater| {
                let peers = router.eligible_targets(&transcript, &debater.id);
                let prompt = prompts::peer_question(
                    debater.persona.as_ref().expect("debaters carry a persona"),
                    &self.session.topic,
                    &self.session.options,
                    &view,
                    &peers,
                );
                async move {
                    let result = runner
                        .generate_payload::<QuestionPayload>(debater, &prompt, max_tokens, temperature)
                        .await;
                    (debater.id.clone(), debater.name.clone(), result)
                }
            })
            .collect();

        let mut questions = Vec::new();
        for (id, name, result) in join_all(tasks).await {
            let payload = match result {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(participant = %id, error = %e, "dropping question");
                    continue;
                }
            };

            let resolved = match MessageRouter::new(&self.roster).resolve_target(
                &transcript,
                &id,
                payload.target_participant.as_deref(),
            ) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(participant = %id, error = %e, "question unroutable, dropping");
                    continue;
                }
            };

            let message = Message::new(id, name, MessageKind::Question, payload.question, 2)
                .with_target(resolved.target);
            questions.push(message.clone());
            self.append(message).await;
        }
        questions
    }

    /// Round 3: each question's target answers, sequentially, since every
    /// call depends on round 2's resolved addressing. A failed answer is
    /// substituted with the apology statement.
    async fn round_question_responses(&mut self, questions: Vec<Message>) {
        self.start_round(3).await;

        if questions.is_empty() {
            warn!(session = %self.session.id, "no valid questions, round 3 has no work");
        }

        for question in questions {
            let target_id = question
                .target_participant
                .clone()
                .expect("round-2 questions are resolved");
            let Some(target) = self.roster.debater(&target_id).cloned() else {
                continue;
            };
            self.answer_question(&target, &question, 3).await;
        }
    }

    /// Round 4: the officer probes still-ambiguous positions one at a
    /// time; each elicited answer feeds back into the transcript before
    /// the next question is generated.
    async fn round_officer_questions(&mut self) {
        self.start_round(4).await;

        let positions = self.ambiguous_positions();
        if positions.is_empty() {
            info!(session = %self.session.id, "no ambiguous positions, officer asks nothing");
        }

        for position in positions {
            let Some(debater) = self.roster.debater(&position).cloned() else {
                continue;
            };
            let latest = self.latest_position(&position);
            let officer = self.roster.officer.clone();
            let prompt = prompts::officer_question(
                &self.session.topic,
                &self.session.options,
                &debater,
                latest.as_ref(),
                &prompts::transcript_view(&self.session.transcript),
            );

            let payload = match self
                .runner
                .generate_payload::<QuestionPayload>(
                    &officer,
                    &prompt,
                    self.config.max_tokens_officer,
                    self.config.temperature_officer,
                )
                .await
            {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(position = %position, error = %e, "officer question failed, skipping position");
                    continue;
                }
            };

            // The probed position is fixed by construction; a stray
            // declared target does not redirect the question.
            if payload
                .target_participant
                .as_deref()
                .is_some_and(|declared| declared != position.as_str())
            {
                warn!(position = %position, "officer question declared a different target, overriding");
            }

            let question = Message::new(
                officer.id.clone(),
                officer.name.clone(),
                MessageKind::OfficerQuestion,
                payload.question,
                4,
            )
            .with_target(position.clone());
            self.append(question.clone()).await;

            self.answer_question(&debater, &question, 4).await;
        }
    }

    /// Round 5: every debater states a closing opinion, in parallel.
    /// Failures are substituted with the apology statement and the first
    /// option as default choice.
    async fn round_final_opinions(&mut self) {
        self.start_round(5).await;

        let runner = self.runner;
        let max_tokens = self.config.max_tokens_debate;
        let temperature = self.config.temperature_debate;
        let facts = self.facts_context();
        let view = prompts::transcript_view(&self.session.transcript);

        let tasks: Vec<_> = self
            .roster
            .debaters
            .iter()
            .map(|debater| {
                let prompt = prompts::final_opinion(
                    debater.persona.as_ref().expect("debaters carry a persona"),
                    &self.session.topic,
                    &self.session.options,
                    &view,
                    facts.as_deref(),
                );
                async move {
                    let result = runner
                        .generate_payload::<OpinionPayload>(debater, &prompt, max_tokens, temperature)
                        .await;
                    (debater.id.clone(), debater.name.clone(), result)
                }
            })
            .collect();

        for (id, name, result) in join_all(tasks).await {
            let message = match result {
                Ok(payload) => {
                    let mut message =
                        Message::new(id, name, MessageKind::FinalOpinion, payload.message, 5);
                    message.choice = self.normalize_choice(payload.choice);
                    message
                }
                Err(e) => {
                    warn!(participant = %id, error = %e, "substituting apology for final opinion");
                    Message::new(id, name, MessageKind::FinalOpinion, prompts::APOLOGY, 5)
                        .with_choice(self.session.options[0].clone())
                }
            };
            self.append(message).await;
        }
    }

    /// Round 6: the officer decides. Generation failure or an invalid
    /// choice degrades to the deterministic tally; a decision always
    /// exists once this round begins.
    async fn round_decision(&mut self) {
        self.start_round(6).await;

        let officer = self.roster.officer.clone();
        let prompt = prompts::decision(
            &self.session.topic,
            &self.session.options,
            &prompts::transcript_view(&self.session.transcript),
            self.facts_context().as_deref(),
        );

        let decision = match self
            .runner
            .generate_payload::<DecisionPayload>(
                &officer,
                &prompt,
                self.config.max_tokens_officer,
                self.config.temperature_officer,
            )
            .await
        {
            Ok(payload) => {
                self.aggregator
                    .from_payload(payload, &self.session.options, &self.session.transcript)
            }
            Err(e) => {
                warn!(session = %self.session.id, error = %e, "decision generation failed, using tally fallback");
                self.aggregator
                    .fallback(&self.session.options, &self.session.transcript)
            }
        };

        let message = Message::new(
            officer.id.clone(),
            officer.name.clone(),
            MessageKind::Decision,
            decision.summary.clone(),
            6,
        )
        .with_choice(decision.choice.clone());
        self.append(message).await;

        info!(
            session = %self.session.id,
            choice = %decision.choice,
            confidence = decision.confidence,
            fallback = decision.fallback,
            "decision made"
        );

        self.session.decision = Some(decision.clone());
        self.session.status = SessionStatus::Completed;
        self.session.completed_at = Some(Utc::now());
        self.publish();
        self.sink
            .emit(self.session.id, SessionEvent::DecisionMade(decision));
    }

    /// Generate and append one answer to a targeted question
    async fn answer_question(&mut self, target: &Participant, question: &Message, round: u32) {
        let prompt = prompts::question_response(
            target.persona.as_ref().expect("debaters carry a persona"),
            &self.session.topic,
            &self.session.options,
            question,
            &prompts::transcript_view(&self.session.transcript),
        );

        // An answer always goes back to whoever asked.
        let asker = question.participant.clone();
        let message = match self
            .runner
            .generate_payload::<AnswerPayload>(
                target,
                &prompt,
                self.config.max_tokens_debate,
                self.config.temperature_debate,
            )
            .await
        {
            Ok(payload) => {
                let mut message = Message::new(
                    target.id.clone(),
                    target.name.clone(),
                    MessageKind::Response,
                    payload.message,
                    round,
                )
                .with_target(asker);
                message.choice = self.normalize_choice(payload.choice);
                message
            }
            Err(e) => {
                warn!(participant = %target.id, error = %e, "substituting apology for answer");
                Message::new(
                    target.id.clone(),
                    target.name.clone(),
                    MessageKind::Response,
                    prompts::APOLOGY,
                    round,
                )
                .with_target(asker)
                .with_choice(self.session.options[0].clone())
            }
        };
        self.append(message).await;
    }

    /// Debater positions the officer still needs to probe in round 4
    fn ambiguous_positions(&self) -> Vec<ParticipantId> {
        match self.config.officer_questions {
            OfficerQuestionPolicy::Disabled => Vec::new(),
            OfficerQuestionPolicy::EveryDebater => self
                .roster
                .debaters
                .iter()
                .map(|debater| debater.id.clone())
                .collect(),
            OfficerQuestionPolicy::LatestOpinionHolders => {
                let leader = DecisionAggregator::tally_choice(
                    &self.session.options,
                    &self.session.transcript,
                );
                self.roster
                    .debaters
                    .iter()
                    .filter(|debater| {
                        let latest_choice = self
                            .session
                            .transcript
                            .iter()
                            .rev()
                            .find(|message| {
                                message.participant == debater.id && message.choice.is_some()
                            })
                            .and_then(|message| message.choice.clone());
                        match latest_choice {
                            None => true,
                            Some(choice) => choice != leader,
                        }
                    })
                    .map(|debater| debater.id.clone())
                    .collect()
            }
        }
    }

    /// Latest opinion-bearing message from one participant
    fn latest_position(&self, id: &ParticipantId) -> Option<Message> {
        self.session
            .transcript
            .iter()
            .rev()
            .find(|message| {
                &message.participant == id
                    && matches!(
                        message.kind,
                        MessageKind::InitialOpinion | MessageKind::Response
                    )
            })
            .cloned()
    }

    /// Best-effort pre-round enrichment; never blocks the debate
    async fn enrich_options(&mut self) {
        let Some(service) = self.enrichment.clone() else {
            return;
        };

        for option in detect_lookup_candidates(&self.session.options) {
            match service.lookup(&option).await {
                Ok(Some(sheet)) => {
                    info!(option = %option, "enrichment facts collected");
                    self.facts.push(sheet);
                }
                Ok(None) => {
                    info!(option = %option, "no enrichment facts found");
                }
                Err(e) => {
                    warn!(option = %option, error = %e, "enrichment lookup failed");
                }
            }
        }

        if !self.facts.is_empty() {
            self.sink.emit(
                self.session.id,
                SessionEvent::EnrichmentReady {
                    facts: self.facts.clone(),
                },
            );
        }
    }

    fn facts_context(&self) -> Option<String> {
        if self.facts.is_empty() {
            return None;
        }
        Some(
            self.facts
                .iter()
                .map(FactSheet::as_context)
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Keep only choices that name a real option
    fn normalize_choice(&self, choice: Option<String>) -> Option<String> {
        match choice {
            Some(choice) if self.session.options.contains(&choice) => Some(choice),
            Some(other) => {
                warn!(choice = %other, "stated choice is not an option, discarding");
                None
            }
            None => None,
        }
    }

    async fn start_round(&mut self, number: u32) {
        let round = &self.session.rounds[(number - 1) as usize];
        info!(session = %self.session.id, round = number, kind = ?round.kind, "round starting");

        let description = round.description.clone();
        self.session.current_round = number;
        self.sink.emit(
            self.session.id,
            SessionEvent::RoundStarted {
                number,
                description,
            },
        );
        self.publish();
        tokio::time::sleep(self.config.pacing.round_start).await;
    }

    async fn append(&mut self, message: Message) {
        self.sink
            .emit(self.session.id, SessionEvent::MessageAppended(message.clone()));
        self.session.append(message);
        self.publish();
        tokio::time::sleep(self.config.pacing.message).await;
    }

    fn publish(&self) {
        self.store.publish(&self.session);
    }

    fn fail(&mut self, reason: String) {
        error!(session = %self.session.id, reason = %reason, "session failed");
        self.session.status = SessionStatus::Failed;
        self.session.failure_reason = Some(reason.clone());
        self.session.completed_at = Some(Utc::now());
        self.publish();
        self.sink
            .emit(self.session.id, SessionEvent::SessionFailed { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PacingConfig, RetryConfig};
    use crate::events::NullSink;
    use crate::generation::GenerationBackend;
    use crate::roster::Persona;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Backend returning a fixed script of responses, then failing
    struct ScriptedBackend {
        script: parking_lot::Mutex<VecDeque<Result<String>>>,
        default: Option<String>,
        calls: AtomicU32,
    }

    impl ScriptedBackend {
        fn with_script(script: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                script: parking_lot::Mutex::new(script.into_iter().collect()),
                default: None,
                calls: AtomicU32::new(0),
            })
        }

        fn always(response: &str) -> Arc<Self> {
            Arc::new(Self {
                script: parking_lot::Mutex::new(VecDeque::new()),
                default: Some(response.to_string()),
                calls: AtomicU32::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                script: parking_lot::Mutex::new(VecDeque::new()),
                default: None,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(&self, _prompt: &str, _max: u32, _temp: f32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(next) = self.script.lock().pop_front() {
                return next;
            }
            match &self.default {
                Some(default) => Ok(default.clone()),
                None => Err(Error::generation("simulated backend outage")),
            }
        }

        fn backend_kind(&self) -> &str {
            "scripted"
        }
    }

    fn persona(id: &str) -> Persona {
        Persona {
            id: id.to_string(),
            name: id.to_uppercase(),
            persona: "test persona".to_string(),
            speech_style: "test".to_string(),
            weights: HashMap::new(),
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

    fn options() -> Vec<String> {
        vec!["Sushi Bar".to_string(), "Ramen Shop".to_string()]
    }

    fn roster_from(
        debaters: Vec<(&str, Arc<ScriptedBackend>)>,
        officer: Arc<ScriptedBackend>,
    ) -> Roster {
        Roster {
            debaters: debaters
                .into_iter()
                .map(|(id, backend)| {
                    Participant::debater(persona(id), backend as Arc<dyn GenerationBackend>)
                })
                .collect(),
            officer: Participant::officer(officer as Arc<dyn GenerationBackend>),
        }
    }

    fn orchestrator(session: Session, roster: Roster, config: CouncilConfig) -> RoundOrchestrator {
        RoundOrchestrator::new(
            session,
            roster,
            config,
            Arc::new(SessionStore::new(4)),
            Arc::new(NullSink),
            None,
        )
    }

    /// One response that parses as every phase payload at once
    fn universal(choice: &str, target: &str) -> String {
        format!(
            r#"{{"message":"my view","choice":"{choice}","question":"why that one?","target_participant":"{target}","final_choice":"{choice}","summary":"weighed the room","confidence":0.8}}"#
        )
    }

    #[tokio::test]
    async fn happy_path_completes_with_valid_decision() {
        let session = Session::new("lunch", options(), false).unwrap();
        let roster = roster_from(
            vec![
                ("p1", ScriptedBackend::always(&universal("Sushi Bar", "p2"))),
                ("p2", ScriptedBackend::always(&universal("Ramen Shop", "p1"))),
                ("p3", ScriptedBackend::always(&universal("Sushi Bar", "p1"))),
            ],
            ScriptedBackend::always(&universal("Sushi Bar", "p1")),
        );

        let done = orchestrator(session, roster, test_config()).run().await;

        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.current_round, 6);
        let decision = done.decision.unwrap();
        assert!(done.options.contains(&decision.choice));
        assert!(!decision.fallback);
        assert!(done.completed_at.is_some());

        // All six rounds left messages, ending with the decision.
        assert_eq!(
            done.transcript.last().unwrap().kind,
            MessageKind::Decision
        );
        let opinions = done
            .transcript
            .iter()
            .filter(|m| m.kind == MessageKind::InitialOpinion)
            .count();
        assert_eq!(opinions, 3);
    }

    #[tokio::test]
    async fn transcript_rounds_are_monotone_and_bounded() {
        let session = Session::new("lunch", options(), false).unwrap();
        let roster = roster_from(
            vec![
                ("p1", ScriptedBackend::always(&universal("Sushi Bar", "p2"))),
                ("p2", ScriptedBackend::always(&universal("Ramen Shop", "p1"))),
            ],
            ScriptedBackend::always(&universal("Sushi Bar", "p1")),
        );

        let done = orchestrator(session, roster, test_config()).run().await;

        let rounds: Vec<u32> = done.transcript.iter().map(|m| m.round).collect();
        assert!(rounds.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(rounds.iter().all(|round| *round <= done.current_round));
    }

    #[tokio::test]
    async fn questions_never_target_their_author() {
        let session = Session::new("lunch", options(), false).unwrap();
        // p1 tries to target itself; the router must redirect.
        let roster = roster_from(
            vec![
                ("p1", ScriptedBackend::always(&universal("Sushi Bar", "p1"))),
                ("p2", ScriptedBackend::always(&universal("Ramen Shop", "p1"))),
                ("p3", ScriptedBackend::always(&universal("Sushi Bar", "p2"))),
            ],
            ScriptedBackend::always(&universal("Sushi Bar", "p1")),
        );

        let done = orchestrator(session, roster, test_config()).run().await;

        for message in done
            .transcript
            .iter()
            .filter(|m| m.kind == MessageKind::Question)
        {
            assert_ne!(
                message.target_participant.as_ref().unwrap(),
                &message.participant
            );
        }
        // p1's invalid self-target fell back to the first eligible peer.
        let p1_question = done
            .transcript
            .iter()
            .find(|m| m.kind == MessageKind::Question && m.participant.as_str() == "p1")
            .unwrap();
        assert_eq!(
            p1_question.target_participant.as_ref().unwrap().as_str(),
            "p2"
        );
    }

    #[tokio::test]
    async fn total_round1_failure_fails_session_without_round2_work() {
        let session = Session::new("lunch", options(), false).unwrap();
        let p1 = ScriptedBackend::failing();
        let p2 = ScriptedBackend::failing();
        let officer = ScriptedBackend::always(&universal("Sushi Bar", "p1"));
        let roster = roster_from(vec![("p1", p1.clone()), ("p2", p2.clone())], officer.clone());

        let done = orchestrator(session, roster, test_config()).run().await;

        assert_eq!(done.status, SessionStatus::Failed);
        assert!(done.failure_reason.is_some());
        assert!(done.decision.is_none());
        assert!(done.transcript.is_empty());
        assert_eq!(done.current_round, 1);
        // One attempt each in round 1, then nothing else was scheduled.
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
        assert_eq!(officer.calls(), 0);
    }

    #[tokio::test]
    async fn failed_final_opinion_is_substituted_with_apology() {
        let session = Session::new("lunch", options(), false).unwrap();
        let opinion = r#"{"message":"ok","choice":"Ramen Shop"}"#;
        let question = r#"{"question":"why?","target_participant":"p1"}"#;
        let answer = r#"{"message":"because","choice":"Ramen Shop"}"#;
        // p2: opening, question, answer to p1's question, then dies in round 5.
        let p2 = ScriptedBackend::with_script(vec![
            Ok(opinion.to_string()),
            Ok(question.to_string()),
            Ok(answer.to_string()),
        ]);
        let roster = roster_from(
            vec![
                ("p1", ScriptedBackend::always(&universal("Sushi Bar", "p2"))),
                ("p2", p2),
            ],
            ScriptedBackend::always(&universal("Sushi Bar", "p1")),
        );
        let config = test_config().with_officer_questions(OfficerQuestionPolicy::Disabled);

        let done = orchestrator(session, roster, config).run().await;

        assert_eq!(done.status, SessionStatus::Completed);
        let substituted = done
            .transcript
            .iter()
            .find(|m| m.kind == MessageKind::FinalOpinion && m.participant.as_str() == "p2")
            .unwrap();
        assert_eq!(substituted.text, prompts::APOLOGY);
        assert_eq!(substituted.choice.as_deref(), Some("Sushi Bar"));
    }

    #[tokio::test]
    async fn officer_outage_still_produces_fallback_decision() {
        let session = Session::new("lunch", options(), false).unwrap();
        let roster = roster_from(
            vec![
                ("p1", ScriptedBackend::always(&universal("Sushi Bar", "p2"))),
                ("p2", ScriptedBackend::always(&universal("Sushi Bar", "p1"))),
                ("p3", ScriptedBackend::always(&universal("Ramen Shop", "p1"))),
            ],
            ScriptedBackend::failing(),
        );

        let done = orchestrator(session, roster, test_config()).run().await;

        assert_eq!(done.status, SessionStatus::Completed);
        let decision = done.decision.unwrap();
        assert!(decision.fallback);
        assert_eq!(decision.choice, "Sushi Bar");
        assert_eq!(decision.confidence, 0.3);
        assert_eq!(
            done.transcript.last().unwrap().kind,
            MessageKind::Decision
        );
    }

    #[tokio::test]
    async fn officer_questions_probe_dissenting_positions() {
        let session = Session::new("lunch", options(), false).unwrap();
        // p1 and p2 back the leader; p3 dissents and gets probed.
        let roster = roster_from(
            vec![
                ("p1", ScriptedBackend::always(&universal("Sushi Bar", "p2"))),
                ("p2", ScriptedBackend::always(&universal("Sushi Bar", "p1"))),
                ("p3", ScriptedBackend::always(&universal("Ramen Shop", "p1"))),
            ],
            ScriptedBackend::always(&universal("Sushi Bar", "p3")),
        );

        let done = orchestrator(session, roster, test_config()).run().await;

        let officer_questions: Vec<_> = done
            .transcript
            .iter()
            .filter(|m| m.kind == MessageKind::OfficerQuestion)
            .collect();
        assert_eq!(officer_questions.len(), 1);
        assert_eq!(
            officer_questions[0]
                .target_participant
                .as_ref()
                .unwrap()
                .as_str(),
            "p3"
        );
        // The probed debater answered back to the officer, in round 4.
        assert!(done.transcript.iter().any(|m| {
            m.kind == MessageKind::Response
                && m.round == 4
                && m.participant.as_str() == "p3"
                && m.target_participant.as_ref().unwrap().as_str() == "officer"
        }));
    }
}
