//! Hark - wake-word voice command agent
//!
//! Listens to a frame source, waits for the wake word, runs the matching
//! command and answers out loud.

use anyhow::{Context, Result};
use clap::Parser;
use hark::asr;
use hark::audio::{FrameQueue, UdpFrameSource};
use hark::audit::AuditLog;
use hark::commands::CommandRegistry;
use hark::config::Config;
use hark::core::OllamaChat;
use hark::ipc::ControlServer;
use hark::playback::PlaybackController;
use hark::players::ProcessPlayer;
use hark::processor::Processor;
use hark::tts::{PiperEngine, Synthesizer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to <config_dir>/hark/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Frame source: "udp" or "mic"
    #[arg(short, long)]
    source: Option<String>,

    /// Audio input device index (mic source)
    #[arg(short, long)]
    device: Option<usize>,

    /// Disable the remote control channel
    #[arg(long)]
    no_control: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging first so config loading can report problems; the
    // configured level is applied once the config is known
    let env_filter = EnvFilter::try_from_default_env().ok();
    let pinned = env_filter.is_some() || args.verbose;
    let initial = env_filter.unwrap_or_else(|| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(source) = &args.source {
        config.audio_source = source.clone();
    }
    if args.device.is_some() {
        config.audio_device = args.device;
    }
    if args.no_control {
        config.control_enabled = false;
    }
    if !pinned {
        if let Err(e) = filter_handle.modify(|f| *f = EnvFilter::new(config.log_level.as_str())) {
            warn!("⚠️ Could not apply log level '{}': {}", config.log_level, e);
        }
    }

    config.validate()?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("🐧 {} (hark v{}) starting...", config.agent_name, env!("CARGO_PKG_VERSION"));

    // Recognizer is mandatory
    let recognizer = match asr::create_engine(&config).await {
        Ok(recognizer) => recognizer,
        Err(e) if e.is_fatal() => {
            error!("❌ {}", e);
            return Err(e).context("Cannot start without a recognizer");
        }
        Err(e) => return Err(e.into()),
    };

    let cancel = CancellationToken::new();
    let frames = Arc::new(FrameQueue::new(
        config.frame_queue_capacity,
        config.frame_overflow,
    ));

    // Frame source
    #[cfg(feature = "mic")]
    let mut _mic = None;
    let mut tasks = Vec::new();
    match config.audio_source.as_str() {
        "udp" => {
            let source = UdpFrameSource::bind(config.audio_udp_bind.as_str())
                .await
                .with_context(|| format!("Failed to bind audio stream on {}", config.audio_udp_bind))?;
            tasks.push(source.spawn(frames.clone(), cancel.clone()));
        }
        #[cfg(feature = "mic")]
        "mic" => {
            _mic = Some(hark::audio::mic::start_capture(
                config.audio_device,
                config.sample_rate,
                config.mic_block_size,
                frames.clone(),
            )?);
            info!("🎙️ Audio capture started");
        }
        other => anyhow::bail!("Unknown or disabled audio source '{}'", other),
    }

    // Control channel
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    if config.control_enabled {
        let mut server = ControlServer::bind(config.control_bind.as_str())
            .await
            .with_context(|| format!("Failed to bind control channel on {}", config.control_bind))?;
        if let Some(path) = &config.audit_log_path {
            server = server.with_audit(Arc::new(AuditLog::new(path)));
        }
        tasks.push(server.spawn(control_tx, cancel.clone()));
    } else {
        drop(control_tx);
    }

    // Speech is best-effort: without Piper the agent runs mute
    let mut piper = PiperEngine::new(&config);
    let synthesizer: Option<Box<dyn Synthesizer>> = match piper.start().await {
        Ok(()) => Some(Box::new(piper)),
        Err(e) => {
            warn!("⚠️ Speech disabled: {}", e);
            None
        }
    };
    let player = ProcessPlayer::new(config.player_program.clone(), config.player_args.clone());
    let voice = Arc::new(PlaybackController::new(synthesizer, Box::new(player)));

    let registry = CommandRegistry::from_config(&config.commands);
    let mut processor = Processor::new(&config, recognizer, registry, voice);

    if config.ollama_enabled {
        let chat = OllamaChat::new(&config)?;
        if !chat.health_check().await {
            warn!("⚠️ Ollama not reachable at {}, replies may fail", config.ollama_url);
        }
        processor = processor.with_conversation(Arc::new(chat));
    }

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    processor.greet(&config.greeting).await;
    processor.run(frames, control_rx, cancel.clone()).await?;

    cancel.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Listener task failed: {}", e);
        }
    }

    info!("👋 Goodbye");
    Ok(())
}
