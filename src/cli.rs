//! Command-Line Interface
//!
//! Subcommands for recording, analysis, replies, history, and devices.

use crate::assistant::{AssistantError, AssistantService, InteractionOutcome};
use crate::audio::{CaptureConfig, MicCapture};
use crate::config::Settings;
use crate::history::{self, InteractionEntry};
use crate::utils::{metrics, MetricsSummary};
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Voice-driven music mood assistant
#[derive(Debug, Parser)]
#[command(name = "flowvoice", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON instead of styled output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record from the microphone and get a music flow recommendation
    Listen {
        /// Stop after this many seconds instead of waiting for Enter
        #[arg(short, long)]
        duration: Option<u64>,

        /// Input device name (see `devices`)
        #[arg(long, env = "FLOWVOICE_DEVICE")]
        device: Option<String>,
    },

    /// Analyze typed text as if it had been spoken
    Analyze {
        /// The text to analyze
        text: String,
    },

    /// Get a short conversational reply to typed text
    Reply {
        /// The text to reply to
        text: String,

        /// Stream the reply as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// Inspect past interactions
    History(HistoryArgs),

    /// List available audio input devices
    Devices,

    /// Show aggregate statistics over stored interactions
    Stats,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: HistoryAction,
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// Show the most recent interactions
    List {
        /// How many entries to show (defaults to the configured
        /// history.recent_shown)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one interaction in full
    Show {
        /// Entry identifier (as printed by `list`)
        id: String,
    },

    /// Delete all stored interactions
    Clear,
}

/// Dispatch a parsed invocation
pub async fn run(cli: Cli, settings: Settings) -> anyhow::Result<()> {
    match cli.command {
        Commands::Listen { duration, device } => listen(settings, duration, device, cli.json).await,
        Commands::Analyze { text } => analyze(settings, &text, cli.json).await,
        Commands::Reply { text, stream } => reply(settings, &text, stream).await,
        Commands::History(args) => history_command(args.action, &settings, cli.json),
        Commands::Devices => devices(cli.json),
        Commands::Stats => stats(cli.json),
    }
}

async fn listen(
    settings: Settings,
    duration: Option<u64>,
    device: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let assistant = AssistantService::new(settings.clone());
    if !assistant.is_available() {
        anyhow::bail!(
            "No API key configured. Set GEMINI_API (or GOOGLE_API_KEY) in the environment or a .env file."
        );
    }

    let capture = MicCapture::open(CaptureConfig {
        device: device.or(settings.recording.input_device.clone()),
        max_duration_secs: settings.recording.max_duration_secs,
    })?;

    capture.start()?;

    match duration {
        Some(secs) => {
            if !json {
                eprintln!(
                    "{} Registrazione in corso ({} s)...",
                    style("●").red().bold(),
                    secs
                );
            }
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
        None => {
            eprintln!(
                "{} Registrazione in corso, premi Invio per terminare...",
                style("●").red().bold()
            );
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
        }
    }

    if let Some(fault) = capture.last_fault() {
        tracing::warn!("Stream fault during capture: {}", fault.message);
    }

    let (samples, device_rate) = capture.stop()?;

    let spinner = progress_spinner(json, "Trascrizione e analisi in corso...");
    let result = assistant.process(&samples, device_rate).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => print_outcome(&outcome, json),
        Err(e @ (AssistantError::TooShort | AssistantError::NoSpeech)) => {
            eprintln!("{} {}", style("!").yellow().bold(), e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn analyze(settings: Settings, text: &str, json: bool) -> anyhow::Result<()> {
    let assistant = AssistantService::new(settings);
    if !assistant.is_available() {
        anyhow::bail!(
            "No API key configured. Set GEMINI_API (or GOOGLE_API_KEY) in the environment or a .env file."
        );
    }

    let spinner = progress_spinner(json, "Analisi in corso...");
    let outcome = assistant.process_text(text).await;
    spinner.finish_and_clear();

    print_outcome(&outcome, json)
}

async fn reply(settings: Settings, text: &str, stream: bool) -> anyhow::Result<()> {
    let assistant = AssistantService::new(settings);
    if !assistant.is_available() {
        anyhow::bail!(
            "No API key configured. Set GEMINI_API (or GOOGLE_API_KEY) in the environment or a .env file."
        );
    }

    if stream {
        let mut printed = false;
        let reply = assistant
            .reply_streaming(text, &mut |chunk| {
                printed = true;
                print!("{}", chunk);
                use std::io::Write;
                let _ = std::io::stdout().flush();
            })
            .await;
        // The canned apology is returned without passing through on_chunk
        if !printed {
            print!("{}", reply);
        }
        println!();
    } else {
        let spinner = progress_spinner(false, "Risposta in corso...");
        let reply = assistant.reply(text).await;
        spinner.finish_and_clear();
        println!("{}", reply);
    }

    Ok(())
}

fn history_command(action: HistoryAction, settings: &Settings, json: bool) -> anyhow::Result<()> {
    match action {
        HistoryAction::List { limit } => {
            let limit = limit.unwrap_or(settings.history.recent_shown);
            let entries = history::history().read().recent(limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("Nessuna interazione registrata.");
                return Ok(());
            }
            for entry in &entries {
                print_entry_line(entry);
            }
            Ok(())
        }
        HistoryAction::Show { id } => {
            let entry = history::history()
                .read()
                .get(&id)
                .ok_or_else(|| anyhow::anyhow!("No history entry with id {}", id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                print_entry_full(&entry);
            }
            Ok(())
        }
        HistoryAction::Clear => {
            let mut history = history::history().write();
            let removed = history.len();
            history.clear();
            history.save()?;
            println!("Rimosse {} interazioni.", removed);
            Ok(())
        }
    }
}

fn devices(json: bool) -> anyhow::Result<()> {
    let devices = MicCapture::list_devices()?;

    if json {
        let names: Vec<serde_json::Value> = devices
            .iter()
            .map(|d| serde_json::json!({"name": d.name, "default": d.is_default}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("Nessun dispositivo di input trovato.");
        return Ok(());
    }

    for device in &devices {
        if device.is_default {
            println!("{} {} (default)", style("*").green().bold(), device.name);
        } else {
            println!("  {}", device.name);
        }
    }
    Ok(())
}

fn stats(json: bool) -> anyhow::Result<()> {
    let entries = history::history().read().entries();
    let session = metrics().read().summary();
    let payload = stats_payload(&entries, &session);

    if json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("Interazioni registrate: {}", payload["interactions"]);
    println!("Risposte di fallback:   {}", payload["fallbacks"]);
    println!("Latenza media STT:      {} ms", payload["avg_speech_ms"]);
    println!("Latenza media analisi:  {} ms", payload["avg_analysis_ms"]);

    if session.interaction_count > 0 {
        println!();
        println!(
            "Sessione corrente: {} interazioni, STT {} ms, analisi {} ms (p95 {} ms)",
            session.interaction_count,
            session.avg_speech_ms,
            session.avg_analysis_ms,
            session.p95_ms
        );
    }
    Ok(())
}

/// Aggregate stored history with the in-process session metrics
fn stats_payload(entries: &[InteractionEntry], session: &MetricsSummary) -> serde_json::Value {
    let count = entries.len();
    let fallback_count = entries
        .iter()
        .filter(|e| e.recommendation.is_fallback())
        .count();
    let avg_speech_ms = if count > 0 {
        entries.iter().map(|e| e.speech_ms).sum::<u64>() / count as u64
    } else {
        0
    };
    let avg_analysis_ms = if count > 0 {
        entries.iter().map(|e| e.recommendation.latency_ms).sum::<u64>() / count as u64
    } else {
        0
    };

    serde_json::json!({
        "interactions": count,
        "fallbacks": fallback_count,
        "avg_speech_ms": avg_speech_ms,
        "avg_analysis_ms": avg_analysis_ms,
        "session": session,
    })
}

fn print_outcome(outcome: &InteractionOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let rec = &outcome.recommendation;

    println!(
        "{} {}",
        style("Hai detto:").dim(),
        style(&outcome.transcript).italic()
    );
    println!();
    println!(
        "{} {} ({})",
        style("Flow consigliato:").bold(),
        style(&rec.flow).cyan().bold(),
        rec.bpm_range
    );
    if !rec.characteristics.is_empty() {
        println!("  Caratteristiche: {}", rec.characteristics.join(", "));
    }
    if !rec.genre_examples.is_empty() {
        println!("  Generi: {}", rec.genre_examples.join(", "));
    }
    println!("  Emozione percepita: {}", rec.perceived_emotion);
    println!("  Motivazione: {}", rec.reasoning);
    if rec.is_fallback() {
        println!(
            "  {}",
            style("Risposta di fallback (errore durante l'analisi)").yellow()
        );
    }
    println!();
    println!(
        "{}",
        style(format!(
            "STT {} ms, analisi {} ms",
            outcome.speech_ms, outcome.analysis_ms
        ))
        .dim()
    );

    Ok(())
}

fn print_entry_line(entry: &InteractionEntry) {
    println!(
        "{}  {}  {}  {}",
        style(&entry.id[..8.min(entry.id.len())]).dim(),
        entry.timestamp,
        style(&entry.recommendation.flow).cyan(),
        entry.transcript
    );
}

fn print_entry_full(entry: &InteractionEntry) {
    println!("{} {}", style("Id:").bold(), entry.id);
    println!("{} {}", style("Quando:").bold(), entry.timestamp);
    println!("{} {}", style("Trascrizione:").bold(), entry.transcript);
    println!(
        "{} {} ({})",
        style("Flow:").bold(),
        entry.recommendation.flow,
        entry.recommendation.bpm_range
    );
    println!(
        "{} {}",
        style("Emozione:").bold(),
        entry.recommendation.perceived_emotion
    );
    println!(
        "{} {}",
        style("Motivazione:").bold(),
        entry.recommendation.reasoning
    );
    println!(
        "{} {} ms (STT) + {} ms (analisi)",
        style("Latenza:").bold(),
        entry.speech_ms,
        entry.recommendation.latency_ms
    );
    if let Some(path) = &entry.audio_path {
        println!("{} {}", style("Audio:").bold(), path);
    }
}

fn progress_spinner(hidden: bool, message: &str) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
