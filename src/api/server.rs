//! HTTP router setup
//!
//! Builds the Axum router for the command surface and event stream. This
//! is the host-side adapter for the device's remote command transport:
//! external triggers POST play/stop and observe outcomes via state and
//! SSE, never via command return values.

use crate::events::EventBus;
use crate::playback::PlaybackController;
use crate::tracks::TrackTable;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers.
#[derive(Clone)]
pub struct AppContext {
    pub controller: Arc<PlaybackController>,
    pub tracks: Arc<TrackTable>,
    pub events: EventBus,
}

/// Build the application router with all routes.
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Playback control
        .route("/playback/play", post(super::handlers::play))
        .route("/playback/stop", post(super::handlers::stop))
        .route("/playback/state", get(super::handlers::get_playback_state))
        // Track table
        .route("/tracks", get(super::handlers::list_tracks))
        // SSE event stream
        .route("/events", get(super::sse::event_stream))
        // Attach application context
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}
