//! Shared test helpers: in-memory audio sink and container builders.
#![allow(dead_code)]

use jive_stick::audio::AudioSink;
use jive_stick::error::Result;
use jive_stick::playback::{PlaybackController, PlaybackState};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// Recording sink shared between the test and the streaming thread.
#[derive(Default)]
pub struct SinkState {
    pub writes: Mutex<Vec<Vec<i16>>>,
    pub rates: Mutex<Vec<u32>>,
    pub enables: AtomicUsize,
    pub disables: AtomicUsize,
}

impl SinkState {
    /// All samples written, in order.
    pub fn samples(&self) -> Vec<i16> {
        self.writes.lock().unwrap().iter().flatten().copied().collect()
    }

    /// Number of write calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// True if every write so far carried only zero samples.
    pub fn all_silence(&self) -> bool {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .all(|w| w.iter().all(|&s| s == 0))
    }

    /// True if the write sequence ends with at least `samples` zeros.
    pub fn ends_with_silence(&self, samples: usize) -> bool {
        let all = self.samples();
        all.len() >= samples && all[all.len() - samples..].iter().all(|&s| s == 0)
    }
}

/// In-memory [`AudioSink`] with an optional per-write delay to imitate a
/// real-time device's blocking acceptance rate.
pub struct MockSink {
    pub state: Arc<SinkState>,
    pub write_delay: Duration,
}

impl MockSink {
    pub fn new() -> (Self, Arc<SinkState>) {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(write_delay: Duration) -> (Self, Arc<SinkState>) {
        let state = Arc::new(SinkState::default());
        (
            Self {
                state: Arc::clone(&state),
                write_delay,
            },
            state,
        )
    }
}

impl AudioSink for MockSink {
    fn reconfigure_rate(&mut self, rate: u32) -> Result<()> {
        self.state.rates.lock().unwrap().push(rate);
        Ok(())
    }

    fn enable(&mut self) -> Result<()> {
        self.state.enables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.state.disables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<()> {
        if !self.write_delay.is_zero() {
            std::thread::sleep(self.write_delay);
        }
        self.state.writes.lock().unwrap().push(samples.to_vec());
        Ok(())
    }
}

/// Build one RIFF sub-chunk with its pad byte.
pub fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(id);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    out
}

/// Standard 16-byte fmt payload.
pub fn fmt_payload(tag: u16, channels: u16, rate: u32, align: u16, bits: u16) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&tag.to_le_bytes());
    p.extend_from_slice(&channels.to_le_bytes());
    p.extend_from_slice(&rate.to_le_bytes());
    p.extend_from_slice(&(rate * align as u32).to_le_bytes());
    p.extend_from_slice(&align.to_le_bytes());
    p.extend_from_slice(&bits.to_le_bytes());
    p
}

/// Wrap chunks in a RIFF/WAVE container.
pub fn container(chunks: &[Vec<u8>]) -> Vec<u8> {
    let body_len: usize = chunks.iter().map(Vec::len).sum();
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((body_len + 4) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    for c in chunks {
        out.extend_from_slice(c);
    }
    out
}

/// Compressed data region: `blocks` blocks of `block_align` bytes, each
/// seeded with `predictor` and packed zero codes.
pub fn adpcm_blocks(blocks: usize, block_align: u16, predictor: i16) -> Vec<u8> {
    let mut data = Vec::new();
    for _ in 0..blocks {
        data.extend_from_slice(&predictor.to_le_bytes());
        data.push(0); // step index
        data.push(0); // reserved
        data.extend(std::iter::repeat(0u8).take(block_align as usize - 4));
    }
    data
}

/// A complete, valid IMA ADPCM container.
pub fn adpcm_container(block_align: u16, data: &[u8]) -> Vec<u8> {
    container(&[
        chunk(b"fmt ", &fmt_payload(0x0011, 1, 16000, block_align, 4)),
        chunk(b"data", data),
    ])
}

/// Write container bytes to a temp file and return its guard.
pub fn write_temp_wav(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Poll the controller until it reaches `state` or the timeout elapses.
pub async fn wait_for_state(
    controller: &PlaybackController,
    state: PlaybackState,
    timeout: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if controller.state() == state {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
