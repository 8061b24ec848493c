//! Jive Stick playback daemon - Main entry point
//!
//! Wires the configuration, audio output, playback controller, alarm
//! scheduler and HTTP command surface together and serves until shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jive_stick::api::{self, AppContext};
use jive_stick::audio::CpalOutput;
use jive_stick::config::Config;
use jive_stick::events::EventBus;
use jive_stick::playback::{PlaybackController, SUPPORTED_SAMPLE_RATE};
use jive_stick::tracks::TrackTable;
use jive_stick::{alarm, audio::AudioSink};

/// Command-line arguments for jive-stick
#[derive(Parser, Debug)]
#[command(name = "jive-stick")]
#[command(about = "Playback daemon for the Jive Stick handheld")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "JIVE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "JIVE_PORT")]
    port: Option<u16>,

    /// Root folder containing audio files (overrides the config file)
    #[arg(short, long, env = "JIVE_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jive_stick=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = match args.config.as_deref() {
        Some(path) => Config::load(path).context("Failed to load configuration")?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(root) = args.root_folder {
        config.root_folder = root;
    }

    // Apply the configured timezone before any time arithmetic happens,
    // the same way the device applies its stored TZ setting at boot.
    if let Some(tz) = &config.timezone {
        std::env::set_var("TZ", tz);
        info!("Timezone set to {}", tz);
    }

    info!("Starting Jive Stick playback daemon on port {}", config.port);
    info!("Root folder: {}", config.root_folder.display());

    // Audio output, prepared at the device's validated rate.
    let sink = CpalOutput::new(config.device.clone(), SUPPORTED_SAMPLE_RATE)
        .context("Failed to initialize audio output")?;

    let events = EventBus::new();
    let sink: Box<dyn AudioSink> = Box::new(sink);
    let controller = PlaybackController::new(sink, events.clone(), config.silence_flush_ms);
    let tracks = Arc::new(TrackTable::new(config.root_folder.clone(), &config.tracks));
    info!("Playback controller initialized ({} tracks)", tracks.len());

    // Alarm scheduler runs beside the HTTP surface and issues play
    // commands through the same controller entry points.
    tokio::spawn(alarm::run(
        config.alarms.clone(),
        Arc::clone(&tracks),
        Arc::clone(&controller),
        events.clone(),
    ));

    let ctx = AppContext {
        controller,
        tracks,
        events,
    };
    let app = api::create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
