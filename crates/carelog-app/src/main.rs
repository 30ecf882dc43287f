//! Carelog application binary: composition root and terminal front end.
//!
//! 1. Load configuration from TOML
//! 2. Build the model gateway (falls back to the mock when unconfigured)
//! 3. Run the interactive feedback loop on stdin/stdout

mod cli;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use carelog_chat::{
    ChatError, FeedbackOrchestrator, InMemoryFeedbackStore, SpeechBridge, SubmitOutcome,
};
use carelog_core::config::CarelogConfig;
use carelog_gateway::ModelGateway;
use clap::Parser;

use cli::CliArgs;

const HELP: &str = "Commands: start (begin a feedback session), history (list saved feedback), exit";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing is installed so the file's log level applies.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match CarelogConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (CarelogConfig::default(), Some(e)),
    };

    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    config.model.provider = args.resolve_provider(&config.model.provider);
    let gateway = ModelGateway::from_config(&config.model);
    let store = Arc::new(InMemoryFeedbackStore::new());
    let orchestrator = FeedbackOrchestrator::new(&config, gateway, store);
    let mut speech = SpeechBridge::text_only();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Carelog patient feedback ({} model)", orchestrator.gateway().kind());
    println!("{HELP}");

    loop {
        prompt("carelog> ")?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        match line.trim().to_lowercase().as_str() {
            "" => continue,
            "start" => run_session(&orchestrator, &mut speech, &mut lines)?,
            "history" => print_history(&orchestrator),
            "exit" | "quit" => break,
            "help" => println!("{HELP}"),
            other => println!("Unknown command '{other}'. {HELP}"),
        }
    }

    tracing::info!("Carelog stopped");
    Ok(())
}

/// Converse until the patient ends the session (or input closes), then
/// analyze and display the result.
fn run_session<I>(
    orchestrator: &FeedbackOrchestrator,
    speech: &mut SpeechBridge,
    lines: &mut I,
) -> Result<(), Box<dyn std::error::Error>>
where
    I: Iterator<Item = io::Result<String>>,
{
    let start = orchestrator.start()?;
    let session_id = start.session_id;
    say(speech, &start.greeting);
    println!("(Type 'end' when you are finished.)");

    loop {
        prompt("You: ")?;
        let Some(text) = speech.read_turn(|| lines.next().and_then(Result::ok)) else {
            // Input closed mid-conversation; close the session normally.
            let end = orchestrator.end(session_id)?;
            say(speech, &end.closing);
            break;
        };

        match orchestrator.submit(session_id, &text) {
            Ok(SubmitOutcome::Reply { message, .. }) => say(speech, &message),
            Ok(SubmitOutcome::Ended(end)) => {
                say(speech, &end.closing);
                break;
            }
            Err(ChatError::EmptyMessage) => continue,
            Err(ChatError::MessageTooLong(max)) => {
                println!("That message is too long; please keep it under {max} characters.");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let outcome = orchestrator.analyze(Some(session_id), None)?;
    println!("\n{}", outcome.display);
    if outcome.degraded {
        println!("(The analysis could not be completed; a neutral placeholder was recorded.)");
    }
    Ok(())
}

fn print_history(orchestrator: &FeedbackOrchestrator) {
    let entries = match orchestrator.feedback_history() {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read feedback history");
            println!("Feedback history is unavailable.");
            return;
        }
    };

    if entries.is_empty() {
        println!("No feedback recorded yet.");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        let record = &entry.record;
        println!(
            "{}. {}  score {}/5  confidence {}  {}",
            i + 1,
            entry.recorded_at.format("%Y-%m-%d %H:%M"),
            record.satisfaction_score,
            record.confidence_in_treatment,
            record.summary_bullets.first().map(String::as_str).unwrap_or_default(),
        );
    }
}

fn say(speech: &mut SpeechBridge, text: &str) {
    println!("Assistant: {text}");
    speech.announce(text);
}

fn prompt(label: &str) -> io::Result<()> {
    print!("{label}");
    io::stdout().flush()
}
