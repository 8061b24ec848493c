//! Streaming session
//!
//! The body of one playback episode: parse and validate the container,
//! point the sink at the container's sample rate, then stream blocks until
//! end of stream, cancellation or error. Runs on the dedicated playback
//! thread; the blocking sink write paces the loop to real time.

use crate::audio::wav::{self, ContainerHeader, FORMAT_IMA_ADPCM};
use crate::audio::{adpcm, AudioSink};
use crate::error::{Error, Result};
use crate::events::{EventBus, PlayerEvent, StopReason};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// The one sample rate the device output path is validated for.
pub const SUPPORTED_SAMPLE_RATE: u32 = 16000;

/// Chunk size for the silence flush writes.
const SILENCE_CHUNK_SAMPLES: usize = 256;

/// Run one playback episode to completion.
///
/// Every exit path (end of stream, cancellation, any error) flushes a
/// short burst of silence through the sink to mask FIFO residue before the
/// controller returns to idle. Errors never propagate past here; they are
/// logged and reported as a `Failed` stop event.
pub(crate) fn run(
    sink: &mut dyn AudioSink,
    path: &Path,
    cancel: &AtomicBool,
    events: &EventBus,
    silence_flush_ms: u64,
) -> StopReason {
    let reason = match stream_file(sink, path, cancel, events) {
        Ok(reason) => reason,
        Err(e) => {
            error!("Playback of {} aborted: {}", path.display(), e);
            StopReason::Failed
        }
    };

    if reason != StopReason::Completed {
        // Drop whatever was queued so the stop is heard promptly.
        let _ = sink.disable();
        let _ = sink.enable();
    }
    flush_silence(sink, silence_flush_ms);

    info!("Playback of {} ended: {}", path.display(), reason);
    events.broadcast(PlayerEvent::PlaybackStopped {
        path: path.display().to_string(),
        reason,
        timestamp: chrono::Utc::now(),
    });
    reason
}

/// Stream one file's blocks to the sink.
///
/// The file handle and decode buffers live in this scope and are released
/// on every return path.
fn stream_file(
    sink: &mut dyn AudioSink,
    path: &Path,
    cancel: &AtomicBool,
    events: &EventBus,
) -> Result<StopReason> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let header = wav::parse(&mut reader)?;
    validate_header(&header)?;
    debug!(
        "Container: fmt={:#06x} ch={} rate={} bps={} align={} data={}+{}",
        header.format_tag,
        header.channel_count,
        header.sample_rate,
        header.bits_per_sample,
        header.block_align,
        header.data_offset,
        header.data_size
    );

    // Both buffers are sized once for the whole stream.
    let mut pcm = adpcm::alloc_sample_buffer(header.block_align)?;
    let mut block = alloc_block_buffer(header.block_align)?;

    sink.reconfigure_rate(header.sample_rate)?;
    sink.enable()?;
    reader.seek(SeekFrom::Start(header.data_offset))?;

    info!(
        "Playing {} ({} samples per block)",
        path.display(),
        pcm.len()
    );
    events.broadcast(PlayerEvent::PlaybackStarted {
        path: path.display().to_string(),
        sample_rate: header.sample_rate,
        timestamp: chrono::Utc::now(),
    });

    loop {
        // Cancellation is polled once per block, bounding stop latency to
        // one block of decode and output time.
        if cancel.load(Ordering::Acquire) {
            return Ok(StopReason::Cancelled);
        }

        let got = read_block(&mut reader, &mut block)?;
        if got < block.len() {
            // A short read is the defined end-of-stream signal.
            debug!("Short read ({} of {} bytes), end of stream", got, block.len());
            return Ok(StopReason::Completed);
        }

        adpcm::decode_block(&block, &mut pcm);
        sink.write(&pcm)?;
    }
}

/// Check the header against the one format the device plays.
fn validate_header(header: &ContainerHeader) -> Result<()> {
    if header.format_tag != FORMAT_IMA_ADPCM {
        return Err(Error::Format(format!(
            "Unsupported format tag {:#06x} (need IMA ADPCM)",
            header.format_tag
        )));
    }
    if header.channel_count != 1 {
        return Err(Error::Format(format!(
            "Unsupported channel count {} (need mono)",
            header.channel_count
        )));
    }
    if header.bits_per_sample != 4 {
        return Err(Error::Format(format!(
            "Unsupported bit depth {} (need 4)",
            header.bits_per_sample
        )));
    }
    if header.sample_rate != SUPPORTED_SAMPLE_RATE {
        return Err(Error::Format(format!(
            "Unsupported sample rate {} (need {})",
            header.sample_rate, SUPPORTED_SAMPLE_RATE
        )));
    }
    if (header.block_align as usize) < adpcm::BLOCK_HEADER_BYTES {
        return Err(Error::Format(format!(
            "Block alignment {} smaller than block header",
            header.block_align
        )));
    }
    Ok(())
}

fn alloc_block_buffer(block_align: u16) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(block_align as usize)
        .map_err(|e| Error::Resource(format!("Failed to allocate block buffer: {}", e)))?;
    buf.resize(block_align as usize, 0);
    Ok(buf)
}

/// Fill `buf` from the reader, returning the number of bytes read.
/// Anything less than a full buffer means end of stream.
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::File(e)),
        }
    }
    Ok(filled)
}

/// Feed zero samples to the sink to mask any hardware FIFO residue.
fn flush_silence(sink: &mut dyn AudioSink, silence_flush_ms: u64) {
    let zeros = [0i16; SILENCE_CHUNK_SAMPLES];
    let total = (silence_flush_ms * SUPPORTED_SAMPLE_RATE as u64 / 1000) as usize;

    let mut written = 0;
    while written < total {
        let n = (total - written).min(SILENCE_CHUNK_SAMPLES);
        if sink.write(&zeros[..n]).is_err() {
            break;
        }
        written += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(
        format_tag: u16,
        channel_count: u16,
        sample_rate: u32,
        bits_per_sample: u16,
    ) -> ContainerHeader {
        ContainerHeader {
            format_tag,
            channel_count,
            sample_rate,
            block_align: 256,
            bits_per_sample,
            data_offset: 44,
            data_size: 512,
        }
    }

    #[test]
    fn test_valid_header_accepted() {
        assert!(validate_header(&header(FORMAT_IMA_ADPCM, 1, 16000, 4)).is_ok());
    }

    #[test]
    fn test_invalid_headers_rejected() {
        assert!(validate_header(&header(0x0001, 1, 16000, 4)).is_err());
        assert!(validate_header(&header(FORMAT_IMA_ADPCM, 2, 16000, 4)).is_err());
        assert!(validate_header(&header(FORMAT_IMA_ADPCM, 1, 44100, 4)).is_err());
        assert!(validate_header(&header(FORMAT_IMA_ADPCM, 1, 16000, 16)).is_err());
    }

    #[test]
    fn test_read_block_short_read() {
        let data = [1u8, 2, 3];
        let mut buf = [0u8; 8];
        let got = read_block(&mut &data[..], &mut buf).unwrap();
        assert_eq!(got, 3);
        assert_eq!(&buf[..3], &data);
    }
}
