//! Audio Player (playd-ap) - Main entry point
//!
//! Background playback service for the playd UI. Claims the audio device and
//! the MP3 library for the process lifetime and serves transport commands on
//! a local socket until told to exit.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use playd_ap::audio::{
    pcm_ring, ring_capacity, AudioOutput, AudioRenderer, DeviceFormat, OutputControl,
};
use playd_ap::config::{LoggingConfig, TomlConfig};
use playd_ap::service::headset::{self, SysfsGpioPad};
use playd_ap::service::server::CommandServer;
use playd_ap::service::threads::ThreadSet;
use playd_ap::service::{MainService, ServiceSettings};
use playd_ap::sources::{EqualizerBands, Mp3Library, SourceFactory};
use playd_ap::store::{self, SqliteTrackStore};
use playd_common::config::{resolve_config_path, CONFIG_ENV_VAR};

/// Command-line arguments for playd-ap
#[derive(Parser, Debug)]
#[command(name = "playd-ap")]
#[command(about = "Background audio playback service for playd")]
#[command(version)]
struct Args {
    /// Configuration file (overrides PLAYD_CONFIG and the default locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for the command socket
    #[arg(short, long, env = "PLAYD_PORT")]
    port: Option<u16>,

    /// Track metadata database
    #[arg(short, long, env = "PLAYD_DATABASE")]
    database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration comes first: it decides where logging goes
    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let mut config =
        TomlConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging)?;

    info!(
        "Starting playd-ap {} ({}, built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    // Resources in acquisition order; released in reverse at shutdown
    let pool = store::open_pool(&config.database_path)
        .await
        .context("Failed to open track database")?;
    let track_store = Arc::new(SqliteTrackStore::new(
        pool.clone(),
        tokio::runtime::Handle::current(),
    ));

    let equalizer = Arc::new(EqualizerBands::new());
    let mp3 = Mp3Library::acquire(config.mp3.accurate_seek, Arc::clone(&equalizer))
        .context("Failed to initialize MP3 library")?;

    match AudioOutput::list_devices() {
        Ok(devices) => debug!("Output devices: {:?}", devices),
        Err(e) => warn!("Could not list output devices: {}", e),
    }
    let mut output =
        AudioOutput::open(&config.audio.device).context("Failed to open audio device")?;
    let device = DeviceFormat {
        sample_rate: output.sample_rate(),
        channels: output.channels(),
    };
    let control = Arc::new(OutputControl::new(config.playback.initial_volume));
    let capacity = ring_capacity(config.audio.buffer_ms, device, config.audio.decode_chunk_frames);
    let (writer, reader) = pcm_ring(capacity, Arc::clone(&control));
    output.start(reader).context("Failed to start audio stream")?;
    info!(
        "Audio output on {} ({} Hz, {} channels, {} sample ring)",
        output.device_name(),
        device.sample_rate,
        device.channels,
        capacity
    );

    let server = CommandServer::bind(&config.bind_addr(), config.server.max_payload_bytes)
        .context("Failed to bind command socket")?;

    let service = Arc::new(MainService::new(
        Arc::new(SourceFactory::new(Arc::clone(&mp3))),
        track_store,
        Arc::clone(&control),
        equalizer,
        ServiceSettings {
            poll_interval: config.playback.poll_interval(),
            previous_threshold: config.playback.previous_threshold(),
        },
    ));

    let renderer = AudioRenderer::new(
        Arc::clone(service.slot()),
        Arc::clone(&control),
        writer,
        device,
        config.audio.decode_chunk_frames,
    );
    let intent = Arc::clone(service.intent());
    let headset_path = config.headset.gpio_value_path.clone();
    let headset_interval =
        std::time::Duration::from_millis(config.headset.poll_interval_ms.max(1));

    let threads = ThreadSet::new().start_or_unwind(
        |threads: &mut ThreadSet| -> Result<()> {
            threads
                .spawn("renderer", move || renderer.run(intent))
                .context("Failed to spawn renderer thread")?;

            let playback = Arc::clone(&service);
            threads
                .spawn("playback", move || playback.run_playback())
                .context("Failed to spawn playback thread")?;

            let command = Arc::clone(&service);
            threads
                .spawn("command", move || server.run(command))
                .context("Failed to spawn command thread")?;

            if let Some(path) = headset_path {
                let watched = Arc::clone(&service);
                threads
                    .spawn("headset", move || {
                        headset::run(Box::new(SysfsGpioPad::new(path)), watched, headset_interval)
                    })
                    .context("Failed to spawn headset thread")?;
            } else {
                info!("Headset monitoring disabled");
            }
            Ok(())
        },
        || service.request_exit(),
    )?;

    info!("playd-ap ready");

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = service.exited() => {
            info!("Exit requested by client, shutting down");
        }
    }

    service.request_exit();
    let panicked = tokio::task::spawn_blocking(move || threads.join_all())
        .await
        .context("Failed to join service threads")?;
    if panicked > 0 {
        warn!("{} service threads panicked", panicked);
    }

    if output.has_error() {
        warn!("Audio stream reported {} errors", output.error_count());
    }
    output.stop().context("Failed to stop audio stream")?;
    drop(output);
    debug!("Output underruns during session: {}", control.underruns());
    mp3.release();
    pool.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Install the global subscriber: `RUST_LOG` wins over the configured level;
/// output goes to the configured file when set, else stderr
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("playd_ap={0},playd_common={0}", logging.level)));

    let (file_layer, stderr_layer) = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (
                Some(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(std::sync::Mutex::new(file)),
                ),
                None,
            )
        }
        None => (None, Some(fmt::layer().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
