//! REST API for the playback controller
//!
//! Thin HTTP boundary over the session coordinator: every mutating
//! endpoint forwards a command to the coordinator task and relays its
//! reply; state queries return a snapshot. Real-time updates flow over
//! the SSE stream at /api/v1/events.

pub mod handlers;
pub mod sse;

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use moodplay_common::events::EventBus;

use crate::session::SessionHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Command channel into the session coordinator
    pub session: SessionHandle,
    /// Event broadcast for SSE subscribers
    pub bus: Arc<EventBus>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Session endpoints
                .route("/session/login", post(handlers::login))
                .route("/session/logout", post(handlers::logout))
                .route("/session/state", get(handlers::get_state))
                // Capture endpoints
                .route("/capture/start", post(handlers::start_capture))
                .route("/capture/stop", post(handlers::stop_capture))
                // Playlist query and track selection
                .route("/playlist", get(handlers::get_playlist))
                .route("/playback/track", post(handlers::play_track))
                // Playback transport endpoints
                .route("/playback/play", post(handlers::play))
                .route("/playback/pause", post(handlers::pause))
                .route("/playback/resume", post(handlers::resume))
                .route("/playback/stop", post(handlers::stop))
                .route("/playback/next", post(handlers::next_track))
                .route("/playback/previous", post(handlers::prev_track))
                .route("/playback/seek", post(handlers::seek))
                .route("/playback/volume", get(handlers::get_volume))
                .route("/playback/volume", post(handlers::set_volume))
                .route("/playback/shuffle", post(handlers::toggle_shuffle))
                .route("/playback/repeat", post(handlers::toggle_repeat))
                // Language selection
                .route("/language", post(handlers::set_language))
                // History endpoints
                .route("/history", get(handlers::get_history))
                .route("/history", delete(handlers::clear_history))
                // SSE events
                .route("/events", get(sse::event_stream)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "moodplay-player",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
    }))
}
