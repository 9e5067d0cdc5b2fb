//! Prompt construction for each debate phase
//!
//! Every prompt asks for a small JSON payload so the task layer can
//! extract it from surrounding prose.

use crate::roster::{Participant, Persona};
use crate::session::Message;

/// Fixed substitute statement used when a participant's generation
/// attempts are exhausted
pub const APOLOGY: &str =
    "I apologize, a technical problem is keeping me from sharing my opinion right now.";

/// Summary attached to a decision produced entirely by the tally fallback
pub const FALLBACK_SUMMARY: &str =
    "A technical problem interrupted deliberation; the decision reflects a simple tally of stated preferences.";

fn persona_header(persona: &Persona) -> String {
    format!(
        "You are debating as \"{}\".\n\
         Character:\n\
         - Name: {}\n\
         - Personality: {}\n\
         - Speaking style: {}\n",
        persona.name, persona.name, persona.persona, persona.speech_style
    )
}

fn context_block(facts: Option<&str>) -> String {
    match facts {
        Some(facts) if !facts.is_empty() => format!("Background facts:\n{facts}\n\n"),
        _ => String::new(),
    }
}

/// Render the transcript the way prompts consume it
pub fn transcript_view(messages: &[Message]) -> String {
    let mut view = String::new();
    for message in messages {
        view.push_str(&format!("- {}: {}", message.participant_name, message.text));
        if let Some(choice) = &message.choice {
            view.push_str(&format!(" (choice: {choice})"));
        }
        view.push('\n');
    }
    view
}

/// Round-1 opening statement prompt
pub fn initial_opinion(
    persona: &Persona,
    topic: &str,
    options: &[String],
    facts: Option<&str>,
) -> String {
    format!(
        "{header}\n{context}Topic: {topic}\nOptions: {options}\n\n\
         Respond with JSON only:\n\
         {{\n\
             \"message\": \"your opinion and reasoning in about 100 words, in character\",\n\
             \"choice\": \"exactly one of the options\"\n\
         }}\n\n\
         Stay in character and keep the answer natural.",
        header = persona_header(persona),
        context = context_block(facts),
        options = options.join(", "),
    )
}

/// Round-2 peer question prompt
pub fn peer_question(
    persona: &Persona,
    topic: &str,
    options: &[String],
    transcript: &str,
    peers: &[&Participant],
) -> String {
    let peer_list = peers
        .iter()
        .map(|peer| format!("{} (id: {})", peer.name, peer.id))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{header}\nTopic: {topic}\nOptions: {options}\n\n\
         Opening statements so far:\n{transcript}\n\
         Pick one other participant whose reasoning you want to probe.\n\
         You may question: {peer_list}\n\n\
         Respond with JSON only:\n\
         {{\n\
             \"question\": \"one pointed question for that participant\",\n\
             \"target_participant\": \"their id\"\n\
         }}",
        header = persona_header(persona),
        options = options.join(", "),
    )
}

/// Round-3/4 answer prompt
pub fn question_response(
    persona: &Persona,
    topic: &str,
    options: &[String],
    question: &Message,
    transcript: &str,
) -> String {
    format!(
        "{header}\nTopic: {topic}\nOptions: {options}\n\n\
         Discussion so far:\n{transcript}\n\
         {asker} asked you: {question}\n\n\
         Respond with JSON only:\n\
         {{\n\
             \"message\": \"your answer in about 80 words, in character\",\n\
             \"choice\": \"the option you currently prefer\"\n\
         }}",
        header = persona_header(persona),
        options = options.join(", "),
        asker = question.participant_name,
        question = question.text,
    )
}

/// Round-4 officer question prompt, one ambiguous position at a time
pub fn officer_question(
    topic: &str,
    options: &[String],
    target: &Participant,
    latest_position: Option<&Message>,
    transcript: &str,
) -> String {
    let position = match latest_position {
        Some(message) => format!(
            "Their latest position: {}{}",
            message.text,
            message
                .choice
                .as_ref()
                .map(|choice| format!(" (choice: {choice})"))
                .unwrap_or_default()
        ),
        None => "They have not stated a clear position yet.".to_string(),
    };

    format!(
        "You chair this debate and must reach a decision.\n\n\
         Topic: {topic}\nOptions: {options}\n\n\
         Discussion so far:\n{transcript}\n\
         You need clarity from {name} (id: {id}). {position}\n\n\
         Respond with JSON only:\n\
         {{\n\
             \"question\": \"one clarifying question for them\",\n\
             \"target_participant\": \"{id}\"\n\
         }}",
        options = options.join(", "),
        name = target.name,
        id = target.id,
    )
}

/// Round-5 closing statement prompt
pub fn final_opinion(
    persona: &Persona,
    topic: &str,
    options: &[String],
    transcript: &str,
    facts: Option<&str>,
) -> String {
    format!(
        "{header}\n{context}Topic: {topic}\nOptions: {options}\n\n\
         The full discussion:\n{transcript}\n\
         Give your final position, taking the discussion into account.\n\n\
         Respond with JSON only:\n\
         {{\n\
             \"message\": \"your closing statement in about 100 words, in character\",\n\
             \"choice\": \"exactly one of the options\"\n\
         }}",
        header = persona_header(persona),
        context = context_block(facts),
        options = options.join(", "),
    )
}

/// Round-6 decision prompt
pub fn decision(topic: &str, options: &[String], transcript: &str, facts: Option<&str>) -> String {
    format!(
        "You chair this debate. Weigh every participant's arguments fairly and decide.\n\n\
         {context}Topic: {topic}\nOptions: {options}\n\n\
         The full discussion:\n{transcript}\n\
         Respond with JSON only:\n\
         {{\n\
             \"final_choice\": \"exactly one of the options\",\n\
             \"summary\": \"why, in about 150 words, covering how you weighed each participant\",\n\
             \"confidence\": 0.8\n\
         }}\n\n\
         confidence is your certainty in this decision between 0.0 and 1.0.",
        context = context_block(facts),
        options = options.join(", "),
    )
}
