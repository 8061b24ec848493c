//! Audio output sink
//!
//! Defines the [`AudioSink`] boundary consumed by the playback session and
//! its cpal-backed implementation. The cpal stream is owned by a dedicated
//! audio thread (cpal streams are not `Send`); the handle communicates with
//! it through a command channel and feeds samples through a lock-free ring
//! buffer. The blocking `write` waits for ring-buffer vacancy, which is the
//! backpressure that paces the decode loop to real time.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default ring buffer capacity in samples (~half a second at 16 kHz).
pub const DEFAULT_BUFFER_SAMPLES: usize = 8192;

/// Interval the blocking write sleeps while waiting for vacancy.
const WRITE_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Output boundary for mono 16-bit PCM.
///
/// `write` blocks until the sink has accepted all samples; the playback
/// session relies on that for pacing. Implementations must be safe to hand
/// to the streaming task for exclusive ownership.
pub trait AudioSink: Send {
    /// Reconfigure the sink clock to a new sample rate.
    fn reconfigure_rate(&mut self, rate: u32) -> Result<()>;

    /// Start (or resume) consuming queued samples.
    fn enable(&mut self) -> Result<()>;

    /// Stop output and drop any queued samples.
    fn disable(&mut self) -> Result<()>;

    /// Blocking write of mono 16-bit samples.
    fn write(&mut self, samples: &[i16]) -> Result<()>;
}

/// Commands sent from the handle to the audio thread.
enum SinkCommand {
    Reconfigure(u32, mpsc::Sender<std::result::Result<(), String>>),
    Enable(mpsc::Sender<std::result::Result<(), String>>),
    Disable(mpsc::Sender<std::result::Result<(), String>>),
    Shutdown,
}

/// cpal-backed audio output.
///
/// Construction spawns the audio thread, opens the requested device (with
/// fallback to the default device) and builds a paused stream at the
/// initial rate.
pub struct CpalOutput {
    producer: ringbuf::HeapProd<i16>,
    cmd_tx: mpsc::Sender<SinkCommand>,
    stream_error: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CpalOutput {
    /// Open an output device and prepare a (disabled) stream.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `initial_rate`: Sample rate the stream is first built at
    pub fn new(device_name: Option<String>, initial_rate: u32) -> Result<Self> {
        let rb = HeapRb::<i16>::new(DEFAULT_BUFFER_SAMPLES);
        let (producer, consumer) = rb.split();
        let consumer = Arc::new(Mutex::new(consumer));

        let stream_error = Arc::new(AtomicBool::new(false));
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_error = Arc::clone(&stream_error);
        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                audio_thread(device_name, initial_rate, consumer, thread_error, cmd_rx, ready_tx);
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn audio thread: {}", e)))?;

        // Wait for the thread to report device/stream setup.
        ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Audio thread exited during setup".to_string()))?
            .map_err(Error::AudioOutput)?;

        Ok(Self {
            producer,
            cmd_tx,
            stream_error,
            thread: Some(thread),
        })
    }

    fn roundtrip(
        &self,
        make: impl FnOnce(mpsc::Sender<std::result::Result<(), String>>) -> SinkCommand,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.cmd_tx
            .send(make(reply_tx))
            .map_err(|_| Error::AudioOutput("Audio thread is gone".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Audio thread is gone".to_string()))?
            .map_err(Error::AudioOutput)
    }
}

impl AudioSink for CpalOutput {
    fn reconfigure_rate(&mut self, rate: u32) -> Result<()> {
        self.roundtrip(|tx| SinkCommand::Reconfigure(rate, tx))
    }

    fn enable(&mut self) -> Result<()> {
        self.roundtrip(SinkCommand::Enable)
    }

    fn disable(&mut self) -> Result<()> {
        self.roundtrip(SinkCommand::Disable)
    }

    fn write(&mut self, samples: &[i16]) -> Result<()> {
        let mut remaining = samples;
        while !remaining.is_empty() {
            if self.stream_error.load(Ordering::Acquire) {
                return Err(Error::AudioOutput("Audio stream error".to_string()));
            }
            let pushed = self.producer.push_slice(remaining);
            remaining = &remaining[pushed..];
            if !remaining.is_empty() {
                // Ring buffer full: the device is still draining. This wait
                // is what paces the decode loop to real time.
                std::thread::sleep(WRITE_POLL_INTERVAL);
            }
        }
        Ok(())
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(SinkCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Body of the dedicated audio thread: owns the cpal device and stream,
/// rebuilding the stream on reconfiguration.
fn audio_thread(
    device_name: Option<String>,
    initial_rate: u32,
    consumer: Arc<Mutex<ringbuf::HeapCons<i16>>>,
    stream_error: Arc<AtomicBool>,
    cmd_rx: mpsc::Receiver<SinkCommand>,
    ready_tx: mpsc::Sender<std::result::Result<(), String>>,
) {
    let device = match open_device(device_name.as_deref()) {
        Ok(d) => d,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Held in an Option so the old stream can be dropped before a rebuild.
    let mut stream = match build_stream(&device, initial_rate, &consumer, &stream_error) {
        Ok(s) => Some(s),
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            SinkCommand::Reconfigure(rate, reply) => {
                debug!("Reconfiguring output stream to {} Hz", rate);
                stream = None;
                match build_stream(&device, rate, &consumer, &stream_error) {
                    Ok(s) => {
                        stream = Some(s);
                        stream_error.store(false, Ordering::Release);
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                        return;
                    }
                }
            }
            SinkCommand::Enable(reply) => {
                let result = match &stream {
                    Some(s) => s.play().map_err(|e| e.to_string()),
                    None => Err("No output stream".to_string()),
                };
                let _ = reply.send(result);
            }
            SinkCommand::Disable(reply) => {
                let result = match &stream {
                    Some(s) => s.pause().map_err(|e| e.to_string()),
                    None => Err("No output stream".to_string()),
                };
                // Drop whatever the stream had not consumed yet.
                consumer.lock().unwrap().clear();
                let _ = reply.send(result);
            }
            SinkCommand::Shutdown => break,
        }
    }
}

/// Open the requested device, falling back to the default output device.
fn open_device(name: Option<&str>) -> std::result::Result<Device, String> {
    let host = cpal::default_host();

    if let Some(name) = name {
        let mut devices = host
            .output_devices()
            .map_err(|e| format!("Failed to enumerate devices: {}", e))?;
        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Using audio device: {}", name);
            return Ok(device);
        }
        warn!("Audio device '{}' not found, falling back to default", name);
    }

    let device = host
        .default_output_device()
        .ok_or_else(|| "No default output device".to_string())?;
    info!(
        "Using default audio device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );
    Ok(device)
}

/// Build an output stream at `rate`, left paused.
fn build_stream(
    device: &Device,
    rate: u32,
    consumer: &Arc<Mutex<ringbuf::HeapCons<i16>>>,
    stream_error: &Arc<AtomicBool>,
) -> std::result::Result<Stream, String> {
    let supported = device
        .supported_output_configs()
        .map_err(|e| format!("Failed to get device configs: {}", e))?
        .filter(|c| {
            c.min_sample_rate().0 <= rate
                && c.max_sample_rate().0 >= rate
                && matches!(c.sample_format(), SampleFormat::F32 | SampleFormat::I16)
        })
        .min_by_key(|c| c.channels())
        .ok_or_else(|| format!("Device does not support {} Hz output", rate))?;

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.with_sample_rate(cpal::SampleRate(rate)).config();

    debug!(
        "Output stream config: rate={}, channels={}, format={:?}",
        config.sample_rate.0, config.channels, sample_format
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream_f32(device, &config, consumer, stream_error)?,
        SampleFormat::I16 => build_stream_i16(device, &config, consumer, stream_error)?,
        other => return Err(format!("Unsupported sample format: {:?}", other)),
    };

    stream
        .pause()
        .map_err(|e| format!("Failed to pause new stream: {}", e))?;
    Ok(stream)
}

fn build_stream_f32(
    device: &Device,
    config: &StreamConfig,
    consumer: &Arc<Mutex<ringbuf::HeapCons<i16>>>,
    stream_error: &Arc<AtomicBool>,
) -> std::result::Result<Stream, String> {
    let channels = config.channels as usize;
    let consumer = Arc::clone(consumer);
    let error_flag = Arc::clone(stream_error);
    let mut mono = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0);
                let got = consumer.lock().unwrap().pop_slice(&mut mono);

                for (i, frame) in data.chunks_mut(channels).enumerate() {
                    // Underruns play out as silence.
                    let sample = if i < got { sample_to_f32(mono[i]) } else { 0.0 };
                    frame.fill(sample);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_flag.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| format!("Failed to build stream: {}", e))
}

fn build_stream_i16(
    device: &Device,
    config: &StreamConfig,
    consumer: &Arc<Mutex<ringbuf::HeapCons<i16>>>,
    stream_error: &Arc<AtomicBool>,
) -> std::result::Result<Stream, String> {
    let channels = config.channels as usize;
    let consumer = Arc::clone(consumer);
    let error_flag = Arc::clone(stream_error);
    let mut mono = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0);
                let got = consumer.lock().unwrap().pop_slice(&mut mono);

                for (i, frame) in data.chunks_mut(channels).enumerate() {
                    let sample = if i < got { mono[i] } else { 0 };
                    frame.fill(sample);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_flag.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| format!("Failed to build stream: {}", e))
}

fn sample_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}
