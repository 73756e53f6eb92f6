//! OMIFI CLI — run the voice assistant, or poke at it from the terminal.

use anyhow::Context;
use clap::Parser;
use omifi_core::assistant::Assistant;
use omifi_core::config::{load_config, AssistantConfig, VoiceConfig};
use omifi_core::dashboard::{self, DashboardState};
use omifi_core::storage::Storage;
use omifi_core::voice::{AudioSource, OpenAiSttProvider, SttProvider};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// OMIFI: a wake-phrase voice assistant for your desktop
#[derive(Parser, Debug)]
#[command(name = "omifi", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (default: ~/.omifi/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the assistant: voice session plus dashboard (the default)
    Run,
    /// Dispatch one command as if it had been spoken
    Dispatch {
        /// Command text, e.g. "take a screenshot"
        text: Vec<String>,
    },
    /// List recent screenshots
    Screenshots {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// List recent clipboard artifacts
    Clipboard {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        );
    tracing_subscriber::registry().with(stderr_layer).init();

    let config = load_config(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        None | Some(Commands::Run) => run(config).await,
        Some(Commands::Dispatch { text }) => dispatch(config, text.join(" ")).await,
        Some(Commands::Screenshots { limit }) => list_screenshots(config, limit),
        Some(Commands::Clipboard { limit }) => list_clipboard(config, limit),
    }
}

async fn run(config: AssistantConfig) -> anyhow::Result<()> {
    let assistant = Arc::new(Assistant::with_defaults(config.clone())?);

    if config.voice.enabled {
        match (build_audio_source(&config.voice), build_stt(&config.voice)) {
            (Some(source), Some(stt)) => assistant.start_voice(source, stt),
            _ => warn!("voice session not started, dashboard remains usable"),
        }
    } else {
        info!("voice disabled in configuration");
    }

    let dashboard_task = if config.dashboard.enabled {
        let commands = assistant
            .command_sender()
            .context("command queue unavailable")?;
        let state = DashboardState {
            storage: assistant.storage(),
            commands,
            session_state: assistant.session_state_receiver(),
            speech_available: assistant.speech_available(),
        };
        let bind_addr = config.dashboard.bind_addr.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = dashboard::serve(state, &bind_addr).await {
                warn!(error = %e, "dashboard stopped");
            }
        }))
    } else {
        None
    };

    info!(wake = %config.wake_phrase, "omifi running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.context("signal handler")?;
    info!("shutting down");

    // The dashboard holds a command sender; stop it before draining.
    if let Some(task) = dashboard_task {
        task.abort();
        let _ = task.await;
    }
    assistant.shutdown().await;
    Ok(())
}

async fn dispatch(config: AssistantConfig, text: String) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("no command text given");
    }
    let assistant = Assistant::with_defaults(config)?;
    let handled = assistant.dispatch_now(&text).await;
    assistant.shutdown().await;
    if !handled {
        anyhow::bail!("command was not understood or did not complete");
    }
    Ok(())
}

fn list_screenshots(config: AssistantConfig, limit: usize) -> anyhow::Result<()> {
    let storage = Storage::new(config.storage_dir()?)?;
    for record in storage.recent_screenshots(limit) {
        println!(
            "{}  {:>9}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.size,
            record.filename
        );
    }
    Ok(())
}

fn list_clipboard(config: AssistantConfig, limit: usize) -> anyhow::Result<()> {
    let storage = Storage::new(config.storage_dir()?)?;
    for record in storage.recent_clipboard(limit) {
        let kind = record
            .kind
            .map(|k| format!("{k:?}").to_lowercase())
            .unwrap_or_else(|| "text".to_string());
        println!(
            "{}  {:>9}  {:<5}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.size,
            kind,
            record.filename
        );
    }
    Ok(())
}

#[cfg(feature = "audio")]
fn build_audio_source(voice: &VoiceConfig) -> Option<Arc<dyn AudioSource>> {
    Some(Arc::new(omifi_core::voice::CpalAudioSource::new(
        voice.input_device.clone(),
        voice.sample_rate,
    )))
}

#[cfg(not(feature = "audio"))]
fn build_audio_source(_voice: &VoiceConfig) -> Option<Arc<dyn AudioSource>> {
    warn!("built without the `audio` feature, microphone capture is unavailable");
    None
}

fn build_stt(voice: &VoiceConfig) -> Option<Arc<dyn SttProvider>> {
    match voice.stt_provider.as_str() {
        "mock" => Some(Arc::new(omifi_core::voice::MockSttProvider::new())),
        "openai" => match std::env::var("OPENAI_API_KEY") {
            Ok(key) => Some(Arc::new(
                OpenAiSttProvider::new(key).with_language(voice.stt_language.clone()),
            )),
            Err(_) => {
                warn!("OPENAI_API_KEY not set, transcription is unavailable");
                None
            }
        },
        other => {
            warn!(provider = other, "unknown STT provider");
            None
        }
    }
}
