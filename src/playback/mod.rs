//! Playback subsystem: controller state machine and streaming session.

pub mod controller;
mod session;

pub use controller::{PlaybackController, PlaybackState};
pub use session::SUPPORTED_SAMPLE_RATE;
