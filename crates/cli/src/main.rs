//! Dadu voice assistant CLI
//!
//! A thin wrapper around dadu-core: argument parsing, logging, collaborator
//! wiring and the foreground listen loop.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dadu_core::speech::{ConsoleSpeaker, SpeechOutput, StdinListener};
use dadu_core::{Assistant, AssistantConfig, Collaborators, CredentialChain, Outcome};

/// Let timers and alarms set during this run announce before the process ends
fn wait_for_timers(assistant: &Assistant) {
    let pending = assistant.pending_timers();
    if pending > 0 {
        info!(pending, "waiting for timers to finish");
        assistant.wait_for_timers();
    }
}

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "dadu")]
#[command(about = "Keyword-driven voice assistant")]
struct Args {
    /// Utterance to handle once, e.g. "what's the weather in paris"
    utterance: Option<String>,

    /// Read utterances from stdin, one per line, until "exit"
    #[arg(long)]
    listen: bool,

    /// Skip the wake-word gate in listen mode
    #[arg(long = "no-wake")]
    no_wake: bool,

    /// Print the classified payload and decision as JSON
    #[arg(long)]
    json: bool,

    /// Record browser and volume actions instead of performing them
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Path to a config file (TOML, or the flat JSON key format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never prompt on the terminal for credentials or location
    #[arg(long = "no-prompt")]
    no_prompt: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_outcome(outcome: &Outcome, args: &Args) -> Result<()> {
    if args.json {
        println!("Intent JSON:");
        println!("{}", serde_json::to_string_pretty(&outcome.payload)?);
        println!("\nDecision:");
        println!("{}", serde_json::to_string_pretty(&outcome.decision)?);
    }
    if args.dry_run {
        for target in &outcome.opened {
            println!("[dry-run] open {}", target);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    if args.utterance.is_none() && !args.listen {
        bail!("Nothing to do: pass an utterance or --listen");
    }

    let config = AssistantConfig::load(args.config.as_deref())?;
    match config.source {
        Some(ref path) => info!(path = %path.display(), "loaded config"),
        None => debug!("no config file found, using defaults"),
    }

    let interactive = !args.no_prompt;
    let credentials = Arc::new(CredentialChain::standard(&config, interactive));

    let speaker: Arc<dyn SpeechOutput> = match config.tts_command_line() {
        Some(cmd) => Arc::new(ConsoleSpeaker::with_tts(&cmd)),
        None => Arc::new(ConsoleSpeaker::new()),
    };

    let collab = Collaborators::system(
        speaker,
        &config,
        credentials,
        interactive,
        args.dry_run,
    )?;
    let assistant = Assistant::new(collab, &config)?;

    if let Some(ref utterance) = args.utterance {
        let outcome = assistant.handle(utterance);
        print_outcome(&outcome, &args)?;
        if outcome.exit || !args.listen {
            wait_for_timers(&assistant);
            return Ok(());
        }
    }

    let wake_word = if args.no_wake {
        None
    } else {
        Some(config.wake_word.as_str())
    };

    let mut input = StdinListener;
    let mut print_error = None;
    let exited = assistant.run_session(&mut input, wake_word, |outcome| {
        if print_error.is_none() {
            print_error = print_outcome(outcome, &args).err();
        }
    });
    if let Some(e) = print_error {
        return Err(e);
    }

    debug!(exited, "listen loop finished");
    wait_for_timers(&assistant);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_shot() {
        let args = Args::parse_from(["dadu", "what time is it", "--json", "--dry-run"]);
        assert_eq!(args.utterance.as_deref(), Some("what time is it"));
        assert!(args.json);
        assert!(args.dry_run);
        assert!(!args.listen);
    }

    #[test]
    fn test_parse_listen_flags() {
        let args = Args::parse_from(["dadu", "--listen", "--no-wake", "--no-prompt", "-v"]);
        assert!(args.utterance.is_none());
        assert!(args.listen && args.no_wake && args.no_prompt && args.verbose);
    }

    #[test]
    fn test_parse_config_path() {
        let args = Args::parse_from(["dadu", "--config", "/tmp/dadu.toml", "joke"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/dadu.toml")));
    }
}
