//! Event types and broadcast bus
//!
//! Components publish playback and alarm events to a broadcast channel;
//! the SSE endpoint and tests subscribe to observe outcomes. The command
//! surface is fire-and-forget, so events are the only feedback path.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why a playback episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    /// End of stream reached (short read).
    Completed,
    /// Stop requested by a command or play-while-playing toggle.
    Cancelled,
    /// File, format, resource or output failure.
    Failed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Failed => write!(f, "failed"),
        }
    }
}

/// Jive Stick event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Streaming actually began (header validated, sink reconfigured)
    PlaybackStarted {
        path: String,
        sample_rate: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A playback episode ended and the controller returned to idle
    PlaybackStopped {
        path: String,
        reason: StopReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The alarm scheduler armed the next alarm
    AlarmScheduled {
        track_index: usize,
        fires_at: chrono::DateTime<chrono::Utc>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An alarm fired and issued its play command
    AlarmFired {
        track_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event type string used as the SSE event field.
    pub fn type_str(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStarted { .. } => "PlaybackStarted",
            PlayerEvent::PlaybackStopped { .. } => "PlaybackStopped",
            PlayerEvent::AlarmScheduled { .. } => "AlarmScheduled",
            PlayerEvent::AlarmFired { .. } => "AlarmFired",
        }
    }
}

/// Broadcast bus shared by the controller, the alarm scheduler and the
/// HTTP surface.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Publish an event. Send errors (no receivers) are ignored.
    pub fn broadcast(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
