//! CLI proof of concept: run one debate session to completion
//!
//! ```bash
//! council --topic "Where should we have lunch?" \
//!     --options "Sushi Bar,Ramen Shop,Blue Bottle Cafe"
//! ```

use anyhow::Context;
use clap::Parser;
use council::{CouncilConfig, CouncilService, SessionEvent, SessionStatus, WebLookup};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "council", about = "Run a six-round debate and print the decision")]
struct Args {
    /// Topic to debate
    #[arg(long)]
    topic: String,

    /// Comma-separated candidate options (at least 2)
    #[arg(long)]
    options: String,

    /// Look up background facts for the options before the debate
    #[arg(long)]
    enrich: bool,

    /// Persona roster file (JSON); built-in personas when omitted
    #[arg(long)]
    personas: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let options: Vec<String> = args
        .options
        .split(',')
        .map(|option| option.trim().to_string())
        .filter(|option| !option.is_empty())
        .collect();

    let mut config = CouncilConfig::from_env().context("loading configuration")?;
    if let Some(personas) = args.personas {
        config = config.with_persona_file(personas);
    }

    let mut service = CouncilService::new(config).context("constructing service")?;
    if args.enrich {
        let lookup = WebLookup::new(Duration::from_secs(10)).context("constructing web lookup")?;
        service = service.with_enrichment(Arc::new(lookup));
    }

    let mut events = service.subscribe();
    let id = service
        .create_session(&args.topic, options, args.enrich)
        .context("creating session")?;
    println!("session {id}");

    // Stream lifecycle events until the session reaches a terminal state.
    loop {
        match events.recv().await {
            Ok((event_id, event)) if event_id == id => match event {
                SessionEvent::RoundStarted {
                    number,
                    description,
                } => {
                    println!("\n== round {number}: {description}");
                }
                SessionEvent::MessageAppended(message) => {
                    print!("  {}: {}", message.participant_name, message.text);
                    if let Some(choice) = &message.choice {
                        print!("  -> {choice}");
                    }
                    println!();
                }
                SessionEvent::EnrichmentReady { facts } => {
                    println!("  gathered facts for {} option(s)", facts.len());
                }
                SessionEvent::DecisionMade(_) | SessionEvent::SessionFailed { .. } => break,
            },
            Ok(_) => {}
            Err(_) => break,
        }
    }

    let session = service.get(id).context("reading final session")?;
    match session.status {
        SessionStatus::Completed => {
            let decision = session
                .decision
                .context("completed session carries a decision")?;
            println!("\n{}", serde_json::to_string_pretty(&decision)?);
            Ok(())
        }
        SessionStatus::Failed => {
            anyhow::bail!(
                "session failed: {}",
                session
                    .failure_reason
                    .unwrap_or_else(|| "unknown reason".to_string())
            )
        }
        status => anyhow::bail!("session ended in unexpected status {status:?}"),
    }
}
