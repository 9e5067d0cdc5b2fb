//! Personas and the fixed debate roster
//!
//! The roster is sized at session start and immutable for the session's
//! lifetime: a handful of persona-backed debaters plus the officer.

use crate::error::{Error, Result};
use crate::generation::{AgentRole, BackendFactory, GenerationBackend};
use crate::types::ParticipantId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Reserved participant ID of the officer
pub const OFFICER_ID: &str = "officer";

/// Character definition backing one debate participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Unique persona ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Personality description
    pub persona: String,
    /// How the persona speaks
    pub speech_style: String,
    /// Decision-factor weights
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

/// Load personas from a JSON file, falling back to the built-in set
///
/// A missing or malformed file is not fatal; the built-in personas keep
/// the debate running. At most `count` personas are returned.
pub fn load_personas(path: Option<&Path>, count: usize) -> Vec<Persona> {
    let mut personas = match path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Vec<Persona>>(&raw) {
                Ok(personas) if !personas.is_empty() => personas,
                Ok(_) => {
                    warn!(path = %path.display(), "persona file is empty, using built-ins");
                    fallback_personas()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "persona file malformed, using built-ins");
                    fallback_personas()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "persona file unreadable, using built-ins");
                fallback_personas()
            }
        },
        None => fallback_personas(),
    };

    personas.truncate(count);
    personas
}

fn fallback_personas() -> Vec<Persona> {
    vec![
        Persona {
            id: "generalist".to_string(),
            name: "Everyday Voter".to_string(),
            persona: "Weighs every option evenly and looks for balance".to_string(),
            speech_style: "plain and measured".to_string(),
            weights: HashMap::new(),
        },
        Persona {
            id: "pragmatist".to_string(),
            name: "Practical Voter".to_string(),
            persona: "Cares about convenience and what works today".to_string(),
            speech_style: "direct and concrete".to_string(),
            weights: HashMap::new(),
        },
        Persona {
            id: "economist".to_string(),
            name: "Value Voter".to_string(),
            persona: "Optimizes for the best value per unit of cost".to_string(),
            speech_style: "numbers-first".to_string(),
            weights: HashMap::new(),
        },
    ]
}

/// One participant: a stable identity bound to a generation backend
#[derive(Clone)]
pub struct Participant {
    /// Stable identity
    pub id: ParticipantId,
    /// Display name
    pub name: String,
    /// Persona, absent for the officer
    pub persona: Option<Persona>,
    /// Generation capability serving this participant
    pub backend: Arc<dyn GenerationBackend>,
}

impl Participant {
    /// Create a persona-backed debater
    pub fn debater(persona: Persona, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            id: ParticipantId::new(&persona.id),
            name: persona.name.clone(),
            persona: Some(persona),
            backend,
        }
    }

    /// Create the officer
    pub fn officer(backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            id: ParticipantId::new(OFFICER_ID),
            name: "Officer".to_string(),
            persona: None,
            backend,
        }
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("backend", &self.backend.backend_kind())
            .finish()
    }
}

/// The fixed session roster: debaters in stable order plus the officer
#[derive(Debug, Clone)]
pub struct Roster {
    /// Debate participants in stable order
    pub debaters: Vec<Participant>,
    /// The distinguished decision maker
    pub officer: Participant,
}

impl Roster {
    /// Build the roster for one session
    ///
    /// A persona whose backend cannot be constructed is skipped with a
    /// warning; zero usable debaters is fatal.
    pub fn build(factory: &BackendFactory, personas: Vec<Persona>) -> Result<Self> {
        let mut debaters = Vec::with_capacity(personas.len());
        for persona in personas {
            match factory.for_role(AgentRole::Debater) {
                Ok(backend) => debaters.push(Participant::debater(persona, backend)),
                Err(e) => {
                    warn!(persona = %persona.id, error = %e, "skipping debater, no backend");
                }
            }
        }

        if debaters.is_empty() {
            return Err(Error::roster("no debate participants could be constructed"));
        }

        let officer = Participant::officer(factory.for_role(AgentRole::Officer)?);

        Ok(Self { debaters, officer })
    }

    /// Find a debater by ID
    pub fn debater(&self, id: &ParticipantId) -> Option<&Participant> {
        self.debaters.iter().find(|debater| &debater.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;

    struct StubBackend;

    #[async_trait]
    impl GenerationBackend for StubBackend {
        async fn generate(&self, _prompt: &str, _max: u32, _temp: f32) -> Result<String> {
            Ok("{}".to_string())
        }

        fn backend_kind(&self) -> &str {
            "stub"
        }
    }

    #[test]
    fn missing_file_falls_back_to_builtins() {
        let personas = load_personas(Some(Path::new("/nonexistent/personas.json")), 3);
        assert_eq!(personas.len(), 3);
        assert_eq!(personas[0].id, "generalist");
    }

    #[test]
    fn persona_file_is_loaded_and_truncated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "a", "name": "A", "persona": "p", "speech_style": "s"}},
                {{"id": "b", "name": "B", "persona": "p", "speech_style": "s"}},
                {{"id": "c", "name": "C", "persona": "p", "speech_style": "s"}}
            ]"#
        )
        .unwrap();

        let personas = load_personas(Some(file.path()), 2);
        assert_eq!(personas.len(), 2);
        assert_eq!(personas[0].id, "a");
        assert_eq!(personas[1].id, "b");
    }

    #[test]
    fn malformed_file_falls_back_to_builtins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "this is not json").unwrap();

        let personas = load_personas(Some(file.path()), 3);
        assert_eq!(personas[0].id, "generalist");
    }

    #[test]
    fn roster_preserves_persona_order() {
        let factory = BackendFactory::from_backends(Arc::new(StubBackend), Arc::new(StubBackend));
        let roster = Roster::build(&factory, load_personas(None, 3)).unwrap();

        assert_eq!(roster.debaters.len(), 3);
        assert_eq!(roster.debaters[0].id.as_str(), "generalist");
        assert_eq!(roster.officer.id.as_str(), OFFICER_ID);
        assert!(roster.debater(&ParticipantId::new("pragmatist")).is_some());
        assert!(roster.debater(&ParticipantId::new("officer")).is_none());
    }
}
