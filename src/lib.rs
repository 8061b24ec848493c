//! # Jive Stick playback daemon
//!
//! Playback service for the Jive Stick handheld: decodes the device's
//! IMA ADPCM WAV containers in real time to the audio output under a
//! play/stop control protocol driven by concurrent external triggers
//! (remote commands, alarm timer).
//!
//! **Architecture:** container parser → block decoder → playback
//! controller streaming to a backpressured audio sink, with an HTTP/SSE
//! command adapter and an alarm scheduler issuing commands alongside it.

pub mod alarm;
pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod playback;
pub mod tracks;

pub use error::{Error, Result};
