//! Moodplay Player - Main entry point
//!
//! Wires the capture device, emotion classifier, music library index,
//! audio engine and history log into a session coordinator task, then
//! serves the HTTP/SSE control interface until shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moodplay_common::config::Paths;
use moodplay_common::events::EventBus;

use moodplay_player::api;
use moodplay_player::capture::{CaptureSession, EmotionModel, SpoolDevice};
use moodplay_player::history::HistoryLog;
use moodplay_player::library::PlaylistIndex;
use moodplay_player::playback::{PlaybackController, RodioEngine};
use moodplay_player::session::{SessionConfig, SessionCoordinator};

/// Command-line arguments for moodplay-player
#[derive(Parser, Debug)]
#[command(name = "moodplay-player")]
#[command(about = "Emotion-triggered music playback controller")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5870", env = "MOODPLAY_PORT")]
    port: u16,

    /// Root folder of the emotion/language partitioned music library
    #[arg(short, long, env = "MOODPLAY_LIBRARY_ROOT")]
    library_root: Option<PathBuf>,

    /// Emotion classifier model file (JSON)
    #[arg(short, long, env = "MOODPLAY_MODEL")]
    model: Option<PathBuf>,

    /// Per-user detection history file (JSON)
    #[arg(long, env = "MOODPLAY_HISTORY")]
    history: Option<PathBuf>,

    /// Directory the frame grabber spools captured frames into
    #[arg(long, env = "MOODPLAY_SPOOL")]
    spool: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodplay_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let paths = Paths::resolve(
        args.library_root.as_deref(),
        args.model.as_deref(),
        args.history.as_deref(),
        args.spool.as_deref(),
    );

    info!("Starting Moodplay Player on port {}", args.port);
    info!("Library root: {}", paths.library_root.display());
    info!("Model: {}", paths.model_path.display());
    info!("History: {}", paths.history_path.display());
    info!("Frame spool: {}", paths.spool_dir.display());

    // An unloadable model is fatal: nothing downstream works without it
    let model =
        EmotionModel::load(&paths.model_path).context("Failed to load emotion classifier model")?;
    info!("Emotion model loaded");

    let index = Arc::new(PlaylistIndex::scan(&paths.library_root));
    info!("Music library indexed: {} tracks", index.track_count());

    let engine = RodioEngine::new().context("Failed to open audio output")?;

    let bus = Arc::new(EventBus::default());
    let config = SessionConfig::default();

    let capture = CaptureSession::new(
        Box::new(SpoolDevice::new(paths.spool_dir.clone())),
        Box::new(model),
        config.classify_stride,
        config.capture_budget,
    );
    let playback = PlaybackController::new(Box::new(engine), Arc::clone(&bus));
    let history = HistoryLog::load(paths.history_path.clone());

    let session = SessionCoordinator::new(
        config,
        Arc::clone(&bus),
        index,
        capture,
        playback,
        history,
    )
    .spawn();

    let app_state = api::AppState {
        session: session.clone(),
        bus,
        port: args.port,
    };
    let app = api::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Flush history and release the capture device before exiting
    session.shutdown().await;

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
