//! HTTP request handlers
//!
//! Play and stop are fire-and-forget: they enqueue the command with the
//! controller and return immediately. Playback failures are observable
//! through `/playback/state` and the event stream only, matching the
//! device's button-and-notify control model.

use crate::api::server::AppContext;
use crate::playback::PlaybackState;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

/// Play request: either a track index from the configured table or a
/// path relative to the library root.
#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    #[serde(default)]
    pub track_index: Option<usize>,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaybackStateResponse {
    state: PlaybackState,
    file_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrackListResponse {
    tracks: Vec<TrackInfo>,
}

#[derive(Debug, Serialize)]
pub struct TrackInfo {
    index: usize,
    file_path: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "jive-stick".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /playback/play - Start playback (or toggle-stop when playing)
pub async fn play(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    let path = match (&req.track_index, &req.file_path) {
        (Some(index), _) => ctx.tracks.resolve(*index),
        (None, Some(rel)) => ctx.tracks.resolve_path(rel),
        (None, None) => None,
    };

    let Some(path) = path else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(StatusResponse {
                status: "error: no resolvable track_index or file_path".to_string(),
            }),
        ));
    };

    info!("Play command received for {}", path.display());
    ctx.controller.play(path);
    Ok(Json(StatusResponse { status: "ok".to_string() }))
}

/// POST /playback/stop - Request cancellation of the active stream
pub async fn stop(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    info!("Stop command received");
    ctx.controller.stop();
    Json(StatusResponse { status: "ok".to_string() })
}

/// GET /playback/state - Current controller state
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<PlaybackStateResponse> {
    Json(PlaybackStateResponse {
        state: ctx.controller.state(),
        file_path: ctx
            .controller
            .active_path()
            .map(|p| p.display().to_string()),
    })
}

/// GET /tracks - Configured track table
pub async fn list_tracks(State(ctx): State<AppContext>) -> Json<TrackListResponse> {
    Json(TrackListResponse {
        tracks: ctx
            .tracks
            .entries()
            .map(|(index, path)| TrackInfo {
                index,
                file_path: path.display().to_string(),
            })
            .collect(),
    })
}
