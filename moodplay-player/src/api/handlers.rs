//! HTTP request handlers
//!
//! Each handler forwards to the session coordinator and maps its
//! typed errors onto HTTP status codes.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use moodplay_common::types::HistoryEntry;
use moodplay_common::Language;

use crate::api::AppState;
use crate::error::Error;
use crate::session::{PlaylistView, StateSnapshot};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    username: String,
}

#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    volume: u8, // 0-100 user-facing scale
}

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    volume: u8,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    position_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PlayTrackRequest {
    index: usize,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    language: Language,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    entries: Vec<HistoryEntry>,
}

type ApiError = (StatusCode, Json<StatusResponse>);

fn error_response(e: Error) -> ApiError {
    let code = match &e {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::InvalidState(_) | Error::NoTracksAvailable(_) => StatusCode::CONFLICT,
        Error::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

fn ok_response() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

// ============================================================================
// Session Endpoints
// ============================================================================

/// POST /session/login - Begin a session for a named user
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    info!("Login request for user: {}", req.username);
    state
        .session
        .login(req.username)
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}

/// POST /session/logout - End the session, flushing history
pub async fn logout(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.logout().await.map_err(error_response)?;
    Ok(ok_response())
}

/// GET /session/state - Full session snapshot
pub async fn get_state(State(state): State<AppState>) -> Result<Json<StateSnapshot>, ApiError> {
    let snapshot = state.session.snapshot().await.map_err(error_response)?;
    Ok(Json(snapshot))
}

// ============================================================================
// Capture Endpoints
// ============================================================================

/// POST /capture/start - Open the camera and begin emotion sensing
pub async fn start_capture(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .session
        .start_detection()
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}

/// POST /capture/stop - Close the capture window and resolve
pub async fn stop_capture(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state
        .session
        .stop_detection()
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}

// ============================================================================
// Playlist Endpoints
// ============================================================================

/// GET /playlist - Resolved track list with the cursor position
pub async fn get_playlist(
    State(state): State<AppState>,
) -> Result<Json<PlaylistView>, ApiError> {
    let view = state.session.playlist().await.map_err(error_response)?;
    Ok(Json(view))
}

/// POST /playback/track - Play a specific track from the resolved list
pub async fn play_track(
    State(state): State<AppState>,
    Json(req): Json<PlayTrackRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .session
        .play_index(req.index)
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}

// ============================================================================
// Playback Transport Endpoints
// ============================================================================

/// POST /playback/play - Start playback of the resolved playlist
pub async fn play(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.play().await.map_err(error_response)?;
    Ok(ok_response())
}

/// POST /playback/pause
pub async fn pause(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.pause().await.map_err(error_response)?;
    Ok(ok_response())
}

/// POST /playback/resume
pub async fn resume(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.resume().await.map_err(error_response)?;
    Ok(ok_response())
}

/// POST /playback/stop
pub async fn stop(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.stop().await.map_err(error_response)?;
    Ok(ok_response())
}

/// POST /playback/next - Advance with wraparound
pub async fn next_track(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.next().await.map_err(error_response)?;
    Ok(ok_response())
}

/// POST /playback/previous - Step back with wraparound
pub async fn prev_track(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.session.prev().await.map_err(error_response)?;
    Ok(ok_response())
}

/// POST /playback/seek - Jump to a position in the current track
pub async fn seek(
    State(state): State<AppState>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .session
        .seek(req.position_ms)
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}

/// GET /playback/volume - Current volume (0-100)
pub async fn get_volume(State(state): State<AppState>) -> Result<Json<VolumeResponse>, ApiError> {
    let snapshot = state.session.snapshot().await.map_err(error_response)?;
    Ok(Json(VolumeResponse {
        volume: snapshot.volume,
    }))
}

/// POST /playback/volume - Set volume level, clamped to 0-100
pub async fn set_volume(
    State(state): State<AppState>,
    Json(req): Json<VolumeRequest>,
) -> Result<Json<VolumeResponse>, ApiError> {
    let volume = req.volume.min(100);
    state
        .session
        .set_volume(volume)
        .await
        .map_err(error_response)?;
    Ok(Json(VolumeResponse { volume }))
}

/// POST /playback/shuffle - Toggle shuffle mode
pub async fn toggle_shuffle(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .session
        .toggle_shuffle()
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}

/// POST /playback/repeat - Toggle repeat mode
pub async fn toggle_repeat(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .session
        .toggle_repeat()
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}

// ============================================================================
// Language Endpoint
// ============================================================================

/// POST /language - Change the song language preference
pub async fn set_language(
    State(state): State<AppState>,
    Json(req): Json<LanguageRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    info!("Language change request: {}", req.language);
    state
        .session
        .set_language(req.language)
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}

// ============================================================================
// History Endpoints
// ============================================================================

/// GET /history - Detection history for the active user
pub async fn get_history(
    State(state): State<AppState>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let entries = state.session.history().await.map_err(error_response)?;
    Ok(Json(HistoryResponse { entries }))
}

/// DELETE /history - Clear the active user's history
pub async fn clear_history(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .session
        .clear_history()
        .await
        .map_err(error_response)?;
    Ok(ok_response())
}
