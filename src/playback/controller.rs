//! Playback controller
//!
//! Owns the single playback state machine and the output-sink handle.
//! `play` and `stop` are the whole command surface: fire-and-forget,
//! non-blocking and safe to call from any number of concurrent triggers
//! (HTTP handler, alarm scheduler). At most one streaming thread is alive
//! at a time; the Idle→Playing claim is a single compare-and-set performed
//! before the thread is spawned, and the thread's own completion is the
//! only path back to Idle.

use crate::audio::AudioSink;
use crate::events::EventBus;
use crate::playback::session;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

const STATE_IDLE: u8 = 0;
const STATE_PLAYING: u8 = 1;

/// Externally visible playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// Playback controller singleton.
pub struct PlaybackController {
    /// Idle/Playing, claimed atomically before the thread spawn.
    state: AtomicU8,
    /// Cooperative cancellation flag, polled by the session per block.
    stop_requested: AtomicBool,
    /// Sink slot; taken by the streaming thread for the episode's lifetime
    /// and restored before the state returns to Idle.
    sink: Mutex<Option<Box<dyn AudioSink>>>,
    active_path: Mutex<Option<PathBuf>>,
    events: EventBus,
    silence_flush_ms: u64,
}

impl PlaybackController {
    pub fn new(sink: Box<dyn AudioSink>, events: EventBus, silence_flush_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(STATE_IDLE),
            stop_requested: AtomicBool::new(false),
            sink: Mutex::new(Some(sink)),
            active_path: Mutex::new(None),
            events,
            silence_flush_ms,
        })
    }

    /// Handle a play command.
    ///
    /// From Idle this claims the session and spawns the streaming thread.
    /// While already playing it is interpreted as a stop request instead,
    /// regardless of whether `path` matches the active file, preserving
    /// the device's one-button toggle semantics.
    pub fn play(self: &Arc<Self>, path: impl Into<PathBuf>) {
        let path = path.into();

        if self
            .state
            .compare_exchange(STATE_IDLE, STATE_PLAYING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Play command while playing, treating as stop");
            self.stop_requested.store(true, Ordering::Release);
            return;
        }

        // Session claimed; reset the flag left over from any previous stop.
        self.stop_requested.store(false, Ordering::Release);

        let Some(mut sink) = self.sink.lock().unwrap().take() else {
            // Unreachable while the sink-restore invariant holds.
            error!("Output sink unavailable, dropping play command");
            self.state.store(STATE_IDLE, Ordering::Release);
            return;
        };
        *self.active_path.lock().unwrap() = Some(path.clone());

        info!("Starting playback thread for {}", path.display());
        let controller = Arc::clone(self);
        std::thread::spawn(move || {
            let reason = session::run(
                sink.as_mut(),
                &path,
                &controller.stop_requested,
                &controller.events,
                controller.silence_flush_ms,
            );
            debug!("Playback thread for {} finished: {}", path.display(), reason);

            // Restore the sink before reopening the state machine so the
            // next play always finds it present.
            *controller.sink.lock().unwrap() = Some(sink);
            *controller.active_path.lock().unwrap() = None;
            controller.stop_requested.store(false, Ordering::Release);
            controller.state.store(STATE_IDLE, Ordering::Release);
        });
    }

    /// Handle a stop command. Sets the cancellation flag and returns
    /// immediately; the streaming thread notices at its next block
    /// boundary.
    pub fn stop(&self) {
        if self.state.load(Ordering::Acquire) == STATE_PLAYING {
            info!("Stop requested");
            self.stop_requested.store(true, Ordering::Release);
        }
    }

    pub fn state(&self) -> PlaybackState {
        match self.state.load(Ordering::Acquire) {
            STATE_PLAYING => PlaybackState::Playing,
            _ => PlaybackState::Idle,
        }
    }

    /// Path of the file currently being played, if any.
    pub fn active_path(&self) -> Option<PathBuf> {
        self.active_path.lock().unwrap().clone()
    }
}
